//! HTTP client for a Drive-v3-shaped REST API

use super::{DriveFile, DriveService, FOLDER_MIME};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

/// Environment variable holding the bearer token for drive requests.
/// Token acquisition itself happens outside the pipeline.
pub const TOKEN_ENV: &str = "DRIVE_ACCESS_TOKEN";

const MULTIPART_BOUNDARY: &str = "exapp_pipeline_upload";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Drive REST client.
///
/// The base URL is configurable so tests can point it at a mock server;
/// production uses the Google APIs endpoint.
pub struct DriveClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl DriveClient {
    /// Create a client for the given base URL, reading the bearer token
    /// from the environment if present.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("exapp-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: std::env::var(TOKEN_ENV).ok(),
        }
    }

    /// Set the bearer token explicitly
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::drive(status.as_u16(), body))
    }
}

#[async_trait]
impl DriveService for DriveClient {
    async fn list(&self, parent: &str, name: &str, folders_only: bool) -> Result<Vec<DriveFile>> {
        let mut query = format!("'{parent}' in parents and name='{name}' and trashed=false");
        if folders_only {
            query.push_str(&format!(" and mimeType='{FOLDER_MIME}'"));
        }

        let request = self
            .http
            .get(format!("{}/drive/v3/files", self.base_url))
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);

        let response = self.check(self.authorize(request).send().await?).await?;
        let list: FileList = response.json().await?;
        Ok(list.files)
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String> {
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent],
        });

        let request = self
            .http
            .post(format!("{}/drive/v3/files", self.base_url))
            .query(&[("fields", "id")])
            .json(&metadata);

        let response = self.check(self.authorize(request).send().await?).await?;
        let created: CreatedFile = response.json().await?;
        Ok(created.id)
    }

    async fn upload_file(&self, parent: &str, name: &str, content: Bytes) -> Result<String> {
        let metadata = json!({
            "name": name,
            "parents": [parent],
        });

        // multipart/related body: JSON metadata part, then the media part
        let mut body: Vec<u8> = Vec::with_capacity(content.len() + 512);
        write!(
            body,
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )?;
        body.extend_from_slice(&content);
        write!(body, "\r\n--{MULTIPART_BOUNDARY}--")?;

        let request = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.base_url))
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body);

        let response = self.check(self.authorize(request).send().await?).await?;
        let created: CreatedFile = response.json().await?;
        Ok(created.id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self
            .http
            .delete(format!("{}/drive/v3/files/{id}", self.base_url));
        self.check(self.authorize(request).send().await?).await?;
        Ok(())
    }
}
