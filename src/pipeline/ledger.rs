//! Distribution ledger
//!
//! Records which destinations have confirmed receipt of each output file.
//! Cleanup consults the ledger and only deletes files every configured
//! destination has confirmed, so a failed upload never loses the local
//! copy. The ledger is file-backed because the four stages run as separate
//! scheduler-invoked processes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Destination name for the object-store bucket
pub const DEST_BUCKET: &str = "bucket";

/// Destination name for the shared drive
pub const DEST_DRIVE: &str = "drive";

/// Ledger file name, kept next to the output files
const LEDGER_FILE: &str = ".distribution-ledger.json";

/// Per-file record of confirmed destinations
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DistributionLedger {
    /// File name -> destinations that confirmed receipt
    files: BTreeMap<String, BTreeSet<String>>,

    #[serde(skip)]
    path: PathBuf,
}

impl DistributionLedger {
    /// Load the ledger from the output directory, starting empty if no
    /// ledger file exists yet.
    pub fn load(output_dir: impl AsRef<Path>) -> Result<Self> {
        let path = output_dir.as_ref().join(LEDGER_FILE);
        let mut ledger = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str::<DistributionLedger>(&contents)
                .map_err(|e| Error::config(format!("Corrupt distribution ledger: {e}")))?
        } else {
            DistributionLedger::default()
        };
        ledger.path = path;
        Ok(ledger)
    }

    /// Persist the ledger, atomically via a temp file rename
    pub fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Record that a destination confirmed receipt of a file
    pub fn confirm(&mut self, file_name: &str, destination: &str) {
        self.files
            .entry(file_name.to_string())
            .or_default()
            .insert(destination.to_string());
    }

    /// Drop all confirmations for a file (on re-slice or after deletion)
    pub fn forget(&mut self, file_name: &str) {
        self.files.remove(file_name);
    }

    /// Whether every required destination has confirmed the file
    pub fn is_distributed(&self, file_name: &str, required: &[&str]) -> bool {
        match self.files.get(file_name) {
            Some(confirmed) => required.iter().all(|d| confirmed.contains(*d)),
            None => false,
        }
    }

    /// Destinations confirmed for a file, for reporting
    pub fn confirmed(&self, file_name: &str) -> Vec<&str> {
        self.files
            .get(file_name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
