//! Pipeline configuration
//!
//! The whole configuration surface is loaded from a single YAML file and
//! validated before any stage runs, so a bad path or delimiter fails fast
//! instead of surfacing as a mid-run filesystem error.

use crate::department::DepartmentTable;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory containing the `.sql` query-definition scripts
    pub sql_scripts_dir: PathBuf,

    /// Directory where sliced output files are written before distribution
    pub output_dir: PathBuf,

    /// Bucket destination URL, e.g. `gs://gch_extract_drive_01`.
    /// Local paths are accepted for testing.
    pub bucket_url: String,

    /// Warehouse database file; queries run in-memory when unset, with
    /// scripts attaching their own sources
    #[serde(default)]
    pub warehouse_db: Option<PathBuf>,

    /// Drive destination settings
    pub drive: DriveConfig,

    /// Maximum number of data rows per output file
    #[serde(default = "default_slice_rows")]
    pub slice_rows: usize,

    /// Field delimiter for output files (single ASCII character)
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Department display-name overrides, keyed by department code
    #[serde(default)]
    pub departments: BTreeMap<String, String>,

    /// Scheduling metadata, read by the external orchestrator
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Drive destination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Base URL of the drive API (overridable for tests)
    #[serde(default = "default_drive_base_url")]
    pub base_url: String,

    /// Folder id under which the year/month/department hierarchy lives
    pub root_folder_id: String,
}

/// Scheduling metadata.
///
/// The pipeline itself never interprets these; they are carried for the
/// scheduler that triggers the stages. Date-dependent naming is always
/// anchored to execution time, so a catch-up run reflects "now".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression for daily runs
    #[serde(default = "default_schedule_expression")]
    pub expression: String,

    /// First date the schedule is active
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Whether the scheduler should backfill runs missed since `start_date`
    #[serde(default)]
    pub catchup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            expression: default_schedule_expression(),
            start_date: None,
            catchup: false,
        }
    }
}

fn default_slice_rows() -> usize {
    // One million rows minus the header line
    999_999
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_drive_base_url() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_schedule_expression() -> String {
    "15 07 * * *".to_string()
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Validate the configuration before any stage runs.
    ///
    /// The scripts directory must exist; the output directory is created if
    /// missing. Everything else is checked for shape.
    pub fn validate(&self) -> Result<()> {
        if !self.sql_scripts_dir.is_dir() {
            return Err(Error::invalid_value(
                "sql_scripts_dir",
                format!("{} is not a directory", self.sql_scripts_dir.display()),
            ));
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::invalid_value(
                "output_dir",
                format!("cannot create {}: {e}", self.output_dir.display()),
            )
        })?;

        if self.bucket_url.trim().is_empty() {
            return Err(Error::missing_field("bucket_url"));
        }

        if self.drive.root_folder_id.trim().is_empty() {
            return Err(Error::missing_field("drive.root_folder_id"));
        }

        if self.slice_rows == 0 {
            return Err(Error::invalid_value("slice_rows", "must be greater than 0"));
        }

        self.delimiter_byte()?;

        // Surface bad department overrides at startup, not at routing time
        self.department_table()?;

        Ok(())
    }

    /// The delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        let bytes = self.delimiter.as_bytes();
        if bytes.len() != 1 || !self.delimiter.is_ascii() {
            return Err(Error::invalid_value(
                "delimiter",
                format!("'{}' must be a single ASCII character", self.delimiter),
            ));
        }
        Ok(bytes[0])
    }

    /// Resolve the department table with any configured overrides
    pub fn department_table(&self) -> Result<DepartmentTable> {
        DepartmentTable::with_overrides(&self.departments)
    }
}
