//! Stage orchestration
//!
//! One method per scheduler-facing stage, executed sequentially:
//! `query` extracts and slices, the two upload stages distribute, and
//! `cleanup` removes local files once every destination has confirmed
//! receipt. The external scheduler invokes the stages in dependency order
//! (query, then both uploads, then cleanup); `run` preserves that order
//! in-process.

use crate::bucket::BucketStore;
use crate::config::PipelineConfig;
use crate::department::{Department, DepartmentTable};
use crate::drive::{self, DriveService};
use crate::error::{Error, Result};
use crate::naming::{self, OUTPUT_SUFFIX};
use crate::slicer::{self, OutputFile};
use crate::warehouse::{self, Warehouse};
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::path::PathBuf;

mod ledger;
#[cfg(test)]
mod tests;

pub use ledger::{DistributionLedger, DEST_BUCKET, DEST_DRIVE};

/// Destinations that must confirm a file before cleanup may delete it
const REQUIRED_DESTINATIONS: [&str; 2] = [DEST_BUCKET, DEST_DRIVE];

/// What cleanup did with each local output file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    /// Files deleted after full distribution
    pub removed: Vec<String>,
    /// Files retained because a destination has not confirmed them
    pub retained: Vec<String>,
}

/// The extract pipeline, anchored to a single capture date
pub struct Pipeline {
    config: PipelineConfig,
    table: DepartmentTable,
    capture_date: NaiveDate,
}

impl Pipeline {
    /// Build a pipeline from validated configuration.
    ///
    /// The capture date is anchored to execution time: a late or catch-up
    /// run names its files after the day it actually runs.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let table = config.department_table()?;
        Ok(Self {
            config,
            table,
            capture_date: Local::now().date_naive(),
        })
    }

    /// Override the capture date (used in tests)
    #[must_use]
    pub fn with_capture_date(mut self, date: NaiveDate) -> Self {
        self.capture_date = date;
        self
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage 1: run every query script and slice the results into local
    /// delimited files.
    ///
    /// Script failures are isolated: a bad script is logged and skipped,
    /// the remaining scripts still run, and the stage reports the failures
    /// at the end.
    pub fn query(&self, warehouse: &Warehouse) -> Result<Vec<OutputFile>> {
        let scripts = warehouse::discover_scripts(&self.config.sql_scripts_dir)?;
        let delimiter = self.config.delimiter_byte()?;

        tracing::info!(scripts = scripts.len(), "Starting extract");

        let mut written = Vec::new();
        let mut failures = Vec::new();
        let mut ledger = DistributionLedger::load(&self.config.output_dir)?;

        for script in &scripts {
            let outcome = warehouse.run_script(script).and_then(|result| {
                slicer::slice_result_set(
                    &result,
                    &script.name,
                    &self.config.output_dir,
                    self.config.slice_rows,
                    delimiter,
                    self.capture_date,
                )
            });

            match outcome {
                Ok(outputs) => {
                    tracing::info!(
                        script = %script.name,
                        files = outputs.len(),
                        "Sliced extract"
                    );
                    // Re-sliced files need fresh confirmations
                    for output in &outputs {
                        ledger.forget(&output.file_name);
                    }
                    written.extend(outputs);
                }
                Err(e) => {
                    tracing::error!(script = %script.name, error = %e, "Script failed");
                    failures.push(format!("{}: {e}", script.name));
                }
            }
        }

        ledger.save()?;

        if !failures.is_empty() {
            return Err(Error::StageFailed {
                stage: "query".to_string(),
                failed: failures.len(),
                summary: failures.join("; "),
            });
        }

        Ok(written)
    }

    /// Stage 2a: upload every local output file to the bucket destination.
    ///
    /// Keys are fully qualified from the file name, department, and the
    /// capture month/year; existing objects are overwritten.
    pub async fn upload_bucket(&self, store: &BucketStore) -> Result<Vec<String>> {
        let files = self.list_output_files()?;
        let mut ledger = DistributionLedger::load(&self.config.output_dir)?;
        let mut uploaded = Vec::with_capacity(files.len());

        for (path, file_name) in &files {
            let key = naming::bucket_key(file_name, self.capture_date, &self.table)?;
            let destination = store.upload_file(path, &key).await?;
            tracing::info!(file = %file_name, destination = %destination, "Uploaded to bucket");

            ledger.confirm(file_name, DEST_BUCKET);
            ledger.save()?;
            uploaded.push(destination);
        }

        Ok(uploaded)
    }

    /// Stage 2b: upload every local output file into the drive hierarchy
    /// `{root}/{year}/{month}/{department}`, replacing same-named files.
    pub async fn upload_drive(&self, service: &dyn DriveService) -> Result<()> {
        let files = self.list_output_files()?;
        let mut ledger = DistributionLedger::load(&self.config.output_dir)?;

        // Folder ids resolved once per department within a run
        let mut folder_cache: HashMap<Department, String> = HashMap::new();

        for (path, file_name) in &files {
            let dept = naming::parse_department(file_name)?;

            let folder_id = match folder_cache.get(&dept) {
                Some(id) => id.clone(),
                None => {
                    let chain = naming::folder_chain(self.capture_date, dept, &self.table);
                    let id = drive::provision_chain(
                        service,
                        &self.config.drive.root_folder_id,
                        &chain,
                    )
                    .await?;
                    folder_cache.insert(dept, id.clone());
                    id
                }
            };

            let content = Bytes::from(tokio::fs::read(path).await?);
            let file_id = drive::replace_file(service, &folder_id, file_name, content).await?;
            tracing::info!(file = %file_name, id = %file_id, "Uploaded to drive");

            ledger.confirm(file_name, DEST_DRIVE);
            ledger.save()?;
        }

        Ok(())
    }

    /// Stage 3: delete local output files that every destination has
    /// confirmed; retain and report the rest.
    pub fn cleanup(&self) -> Result<CleanupOutcome> {
        let files = self.list_output_files()?;
        let mut ledger = DistributionLedger::load(&self.config.output_dir)?;
        let mut outcome = CleanupOutcome::default();

        for (path, file_name) in &files {
            if ledger.is_distributed(file_name, &REQUIRED_DESTINATIONS) {
                std::fs::remove_file(path)?;
                ledger.forget(file_name);
                outcome.removed.push(file_name.clone());
            } else {
                tracing::warn!(
                    file = %file_name,
                    confirmed = ?ledger.confirmed(file_name),
                    "Retaining file pending distribution"
                );
                outcome.retained.push(file_name.clone());
            }
        }

        ledger.save()?;

        tracing::info!(
            removed = outcome.removed.len(),
            retained = outcome.retained.len(),
            "Cleanup complete"
        );

        Ok(outcome)
    }

    /// Run the full chain in-process: query, both uploads, then cleanup
    pub async fn run(
        &self,
        warehouse: &Warehouse,
        store: &BucketStore,
        service: &dyn DriveService,
    ) -> Result<CleanupOutcome> {
        self.query(warehouse)?;
        self.upload_bucket(store).await?;
        self.upload_drive(service).await?;
        self.cleanup()
    }

    /// Local output files matching the expected suffix, sorted by name
    fn list_output_files(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        let suffix = format!(".{OUTPUT_SUFFIX}");

        for entry in std::fs::read_dir(&self.config.output_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(&suffix) && entry.file_type()?.is_file() {
                files.push((entry.path(), name));
            }
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }
}
