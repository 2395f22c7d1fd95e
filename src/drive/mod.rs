//! Drive destination support
//!
//! The shared-drive API does not key files by path: folders and files are
//! addressed by id, and names are only searchable. This module provides the
//! service trait, the idempotent folder provisioner, and the replace-upload
//! used to distribute output files into the year/month/department hierarchy.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

mod client;
mod memory;

pub use client::DriveClient;
pub use memory::MemoryDrive;

/// MIME type marking a drive folder
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// A file or folder entry in the drive
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

/// Operations against a drive-like file service
#[async_trait]
pub trait DriveService: Send + Sync {
    /// List non-trashed entries with an exact name under a parent.
    /// With `folders_only`, restrict the match to folders.
    async fn list(&self, parent: &str, name: &str, folders_only: bool) -> Result<Vec<DriveFile>>;

    /// Create a folder under a parent, returning its id
    async fn create_folder(&self, parent: &str, name: &str) -> Result<String>;

    /// Create a file with content under a parent, returning its id
    async fn upload_file(&self, parent: &str, name: &str, content: Bytes) -> Result<String>;

    /// Delete an entry by id
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Ensure a child folder exists under a parent, creating it if missing.
///
/// Returns the existing folder's id when one is found, so repeated calls
/// with the same (parent, name) never create duplicates. The check and the
/// create are not atomic: this is only safe for a single caller at a time,
/// which holds for single-instance scheduled runs.
pub async fn ensure_folder(
    service: &dyn DriveService,
    parent: &str,
    name: &str,
) -> Result<String> {
    let existing = service.list(parent, name, true).await?;
    if let Some(folder) = existing.first() {
        return Ok(folder.id.clone());
    }

    let id = service.create_folder(parent, name).await?;
    tracing::debug!(parent, name, id = %id, "Created drive folder");
    Ok(id)
}

/// Provision a chain of nested folders under a root, returning the id of
/// the innermost folder.
pub async fn provision_chain(
    service: &dyn DriveService,
    root: &str,
    segments: &[String],
) -> Result<String> {
    let mut parent = root.to_string();
    for segment in segments {
        parent = ensure_folder(service, &parent, segment).await?;
    }
    Ok(parent)
}

/// Upload a file with replace semantics: any existing files with the exact
/// name under the parent are deleted first, so exactly one file with that
/// name exists afterwards.
pub async fn replace_file(
    service: &dyn DriveService,
    parent: &str,
    name: &str,
    content: Bytes,
) -> Result<String> {
    let duplicates = service.list(parent, name, false).await?;
    for dup in &duplicates {
        tracing::debug!(name, id = %dup.id, "Deleting duplicate drive file");
        service.delete(&dup.id).await?;
    }

    service.upload_file(parent, name, content).await
}
