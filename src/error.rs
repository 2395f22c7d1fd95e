//! Error types for the extract pipeline
//!
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! The taxonomy follows the pipeline stages: configuration, querying,
//! slicing, routing, distribution, cleanup.

use thiserror::Error;

/// The main error type for the pipeline
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Warehouse Errors
    // ============================================================================
    #[error("Query failed for script '{script}': {message}")]
    Query { script: String, message: String },

    #[error("No SQL scripts found in {dir}")]
    NoScripts { dir: String },

    // ============================================================================
    // Routing Errors
    // ============================================================================
    #[error("Unknown department code '{code}' in file name '{file}'")]
    UnknownDepartment { code: String, file: String },

    #[error("File name '{file}' does not match the expected naming convention")]
    UnroutableFile { file: String },

    // ============================================================================
    // Slicing Errors
    // ============================================================================
    #[error("Slice error: {message}")]
    Slice { message: String },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    // ============================================================================
    // Distribution Errors
    // ============================================================================
    #[error("Bucket upload failed: {message}")]
    Bucket { message: String },

    #[error("Drive request failed with HTTP {status}: {message}")]
    Drive { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Stage Errors
    // ============================================================================
    #[error("Stage '{stage}' finished with {failed} failure(s): {summary}")]
    StageFailed {
        stage: String,
        failed: usize,
        summary: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a query error
    pub fn query(script: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            script: script.into(),
            message: message.into(),
        }
    }

    /// Create a slice error
    pub fn slice(message: impl Into<String>) -> Self {
        Self::Slice {
            message: message.into(),
        }
    }

    /// Create a bucket upload error
    pub fn bucket(message: impl Into<String>) -> Self {
        Self::Bucket {
            message: message.into(),
        }
    }

    /// Create a drive error
    pub fn drive(status: u16, message: impl Into<String>) -> Self {
        Self::Drive {
            status,
            message: message.into(),
        }
    }

    /// Create an unknown department error
    pub fn unknown_department(code: impl Into<String>, file: impl Into<String>) -> Self {
        Self::UnknownDepartment {
            code: code.into(),
            file: file.into(),
        }
    }
}

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, Error>;
