//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Warehouse extract pipeline CLI
///
/// The external scheduler invokes the stage subcommands in dependency
/// order: `query`, then `upload-bucket` and `upload-drive`, then `cleanup`.
#[derive(Parser, Debug)]
#[command(name = "exapp-pipeline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true, default_value = "pipeline.yaml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full chain in-process: query, both uploads, cleanup
    Run,

    /// Execute the query scripts and slice results into local files
    Query,

    /// Upload sliced files to the bucket destination
    UploadBucket,

    /// Upload sliced files into the drive folder hierarchy
    UploadDrive,

    /// Delete local files confirmed by every destination
    Cleanup,

    /// Validate the configuration and exit
    Validate,
}
