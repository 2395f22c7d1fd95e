//! CLI runner - executes commands

use crate::bucket::BucketStore;
use crate::cli::commands::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::drive::DriveClient;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::warehouse::Warehouse;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Validate => self.validate(),
            Commands::Query => self.query(),
            Commands::UploadBucket => self.upload_bucket().await,
            Commands::UploadDrive => self.upload_drive().await,
            Commands::Cleanup => self.cleanup(),
            Commands::Run => self.run_all().await,
        }
    }

    fn pipeline(&self) -> Result<Pipeline> {
        let config = PipelineConfig::load(&self.cli.config)?;
        Pipeline::new(config)
    }

    fn warehouse(&self, config: &PipelineConfig) -> Result<Warehouse> {
        match &config.warehouse_db {
            Some(path) => Warehouse::open(path),
            None => Warehouse::open_in_memory(),
        }
    }

    fn validate(&self) -> Result<()> {
        let config = PipelineConfig::load(&self.cli.config)?;
        config.validate()?;
        println!("Configuration OK: {}", self.cli.config.display());
        Ok(())
    }

    fn query(&self) -> Result<()> {
        let pipeline = self.pipeline()?;
        let warehouse = self.warehouse(pipeline.config())?;
        let written = pipeline.query(&warehouse)?;
        println!("Wrote {} output file(s)", written.len());
        Ok(())
    }

    async fn upload_bucket(&self) -> Result<()> {
        let pipeline = self.pipeline()?;
        let store = BucketStore::parse(&pipeline.config().bucket_url)?;
        let uploaded = pipeline.upload_bucket(&store).await?;
        println!("Uploaded {} file(s) to bucket", uploaded.len());
        Ok(())
    }

    async fn upload_drive(&self) -> Result<()> {
        let pipeline = self.pipeline()?;
        let client = DriveClient::new(&pipeline.config().drive.base_url);
        pipeline.upload_drive(&client).await?;
        println!("Drive upload complete");
        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        let pipeline = self.pipeline()?;
        let outcome = pipeline.cleanup()?;
        println!(
            "Removed {} file(s), retained {}",
            outcome.removed.len(),
            outcome.retained.len()
        );
        for name in &outcome.retained {
            println!("  retained: {name}");
        }
        Ok(())
    }

    async fn run_all(&self) -> Result<()> {
        let pipeline = self.pipeline()?;
        let warehouse = self.warehouse(pipeline.config())?;
        let store = BucketStore::parse(&pipeline.config().bucket_url)?;
        let client = DriveClient::new(&pipeline.config().drive.base_url);

        let outcome = pipeline.run(&warehouse, &store, &client).await?;
        println!(
            "Pipeline complete: {} file(s) distributed and removed, {} retained",
            outcome.removed.len(),
            outcome.retained.len()
        );
        Ok(())
    }
}
