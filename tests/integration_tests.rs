//! End-to-end pipeline tests
//!
//! Exercise the full scheduler-shaped chain against a local bucket and an
//! in-memory drive: query scripts, slice, distribute to both destinations,
//! then gated cleanup.

use chrono::NaiveDate;
use exapp_pipeline::bucket::BucketStore;
use exapp_pipeline::drive::MemoryDrive;
use exapp_pipeline::pipeline::Pipeline;
use exapp_pipeline::warehouse::Warehouse;
use exapp_pipeline::PipelineConfig;
use tempfile::TempDir;

struct Env {
    scripts: TempDir,
    output: TempDir,
    bucket: TempDir,
    drive: MemoryDrive,
}

impl Env {
    fn new() -> Self {
        Self {
            scripts: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
            bucket: tempfile::tempdir().unwrap(),
            drive: MemoryDrive::new(),
        }
    }

    fn add_script(&self, name: &str, sql: &str) {
        std::fs::write(self.scripts.path().join(name), sql).unwrap();
    }

    fn pipeline(&self, slice_rows: usize) -> Pipeline {
        let yaml = format!(
            r"
sql_scripts_dir: {}
output_dir: {}
bucket_url: {}
slice_rows: {slice_rows}
delimiter: '|'
drive:
  root_folder_id: shared-root
",
            self.scripts.path().display(),
            self.output.path().display(),
            self.bucket.path().display(),
        );
        Pipeline::new(PipelineConfig::from_yaml(&yaml).unwrap())
            .unwrap()
            .with_capture_date(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap())
    }

    fn bucket_store(&self) -> BucketStore {
        BucketStore::parse(self.bucket.path().to_str().unwrap()).unwrap()
    }

    fn local_csv_count(&self) -> usize {
        std::fs::read_dir(self.output.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".csv")
            })
            .count()
    }

    fn bucket_files(&self, dept_display: &str) -> Vec<String> {
        let dir = self
            .bucket
            .path()
            .join("supply_chain/possales_rl/2025/March")
            .join(dept_display);
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn drive_files(&self, dept_display: &str) -> Vec<String> {
        let chain = vec![
            "2025".to_string(),
            "March".to_string(),
            dept_display.to_string(),
        ];
        let leaf = self
            .drive
            .resolve_chain("shared-root", &chain)
            .unwrap_or_else(|| panic!("no drive chain for {dept_display}"));
        let mut names: Vec<String> = self
            .drive
            .children(&leaf)
            .into_iter()
            .map(|f| f.name)
            .collect();
        names.sort();
        names
    }
}

#[tokio::test]
async fn staged_invocation_distributes_and_cleans_up() {
    let env = Env::new();
    env.add_script(
        "possales_rl_1.sql",
        "SELECT range AS id, 'item-' || range::VARCHAR AS name FROM range(7) ORDER BY id",
    );
    env.add_script(
        "possales_rl_5.sql",
        "SELECT range AS id FROM range(2) ORDER BY id",
    );

    let pipeline = env.pipeline(3);
    let warehouse = Warehouse::open_in_memory().unwrap();

    // Scheduler order: query, then both uploads, then cleanup
    let written = pipeline.query(&warehouse).unwrap();
    assert_eq!(written.len(), 4); // 7 rows / 3 -> 3 files, 2 rows -> 1 file
    assert_eq!(env.local_csv_count(), 4);

    pipeline.upload_bucket(&env.bucket_store()).await.unwrap();
    pipeline.upload_drive(&env.drive).await.unwrap();
    let outcome = pipeline.cleanup().unwrap();

    assert_eq!(outcome.removed.len(), 4);
    assert!(outcome.retained.is_empty());
    assert_eq!(env.local_csv_count(), 0);

    assert_eq!(
        env.bucket_files("1 - GROCERY"),
        vec![
            "possales_rl_1_2025-03-16_1.csv",
            "possales_rl_1_2025-03-16_2.csv",
            "possales_rl_1_2025-03-16_3.csv",
        ]
    );
    assert_eq!(
        env.bucket_files("5 - HEALTH & BEAUTY"),
        vec!["possales_rl_5_2025-03-16_1.csv"]
    );
    assert_eq!(env.drive_files("1 - GROCERY").len(), 3);
    assert_eq!(env.drive_files("5 - HEALTH & BEAUTY").len(), 1);
}

#[tokio::test]
async fn chunk_boundaries_and_order_survive_distribution() {
    let env = Env::new();
    env.add_script(
        "possales_rl_4.sql",
        "SELECT range AS id FROM range(10) ORDER BY id",
    );

    let pipeline = env.pipeline(4);
    let warehouse = Warehouse::open_in_memory().unwrap();
    pipeline.query(&warehouse).unwrap();
    pipeline.upload_bucket(&env.bucket_store()).await.unwrap();

    // Reassemble from the bucket and check original row order
    let dir = env
        .bucket
        .path()
        .join("supply_chain/possales_rl/2025/March/4 - NON FOODS");
    let mut rows: Vec<String> = Vec::new();
    for version in 1..=3 {
        let path = dir.join(format!("possales_rl_4_2025-03-16_{version}.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("id"));
        rows.extend(lines.map(String::from));
    }
    let expected: Vec<String> = (0..10).map(|n| n.to_string()).collect();
    assert_eq!(rows, expected);
}

#[tokio::test]
async fn failed_drive_distribution_retains_local_files() {
    let env = Env::new();
    env.add_script(
        "possales_rl_2.sql",
        "SELECT range AS id FROM range(2) ORDER BY id",
    );

    let pipeline = env.pipeline(10);
    let warehouse = Warehouse::open_in_memory().unwrap();
    pipeline.query(&warehouse).unwrap();
    pipeline.upload_bucket(&env.bucket_store()).await.unwrap();

    // Drive upload never ran; cleanup must keep the local copy
    let outcome = pipeline.cleanup().unwrap();
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.retained, vec!["possales_rl_2_2025-03-16_1.csv"]);
    assert_eq!(env.local_csv_count(), 1);

    // Finishing distribution later completes the cleanup
    pipeline.upload_drive(&env.drive).await.unwrap();
    let outcome = pipeline.cleanup().unwrap();
    assert_eq!(outcome.removed, vec!["possales_rl_2_2025-03-16_1.csv"]);
    assert_eq!(env.local_csv_count(), 0);
}

#[tokio::test]
async fn rerun_on_same_date_overwrites_both_destinations() {
    let env = Env::new();
    env.add_script(
        "possales_rl_6.sql",
        "SELECT range AS id FROM range(3) ORDER BY id",
    );

    let warehouse = Warehouse::open_in_memory().unwrap();
    let pipeline = env.pipeline(10);

    pipeline
        .run(&warehouse, &env.bucket_store(), &env.drive)
        .await
        .unwrap();
    pipeline
        .run(&warehouse, &env.bucket_store(), &env.drive)
        .await
        .unwrap();

    // Last write wins in the bucket; exactly one copy in the drive folder
    assert_eq!(
        env.bucket_files("6 - GMS"),
        vec!["possales_rl_6_2025-03-16_1.csv"]
    );
    assert_eq!(
        env.drive_files("6 - GMS"),
        vec!["possales_rl_6_2025-03-16_1.csv"]
    );
    // The year/month/department chain was not duplicated
    assert_eq!(env.drive.folder_count(), 3);
}

#[test]
fn validate_rejects_bad_configuration_before_any_stage() {
    let output = tempfile::tempdir().unwrap();
    let yaml = format!(
        r"
sql_scripts_dir: /nonexistent/sql-scripts
output_dir: {}
bucket_url: gs://extract-bucket
drive:
  root_folder_id: shared-root
",
        output.path().display(),
    );
    let config = PipelineConfig::from_yaml(&yaml).unwrap();
    assert!(config.validate().is_err());
    assert!(Pipeline::new(config).is_err());
}

#[test]
fn output_dir_only_ever_holds_expected_suffix_files() {
    let env = Env::new();
    env.add_script(
        "possales_rl_3.sql",
        "SELECT range AS id FROM range(5) ORDER BY id",
    );

    let pipeline = env.pipeline(2);
    let warehouse = Warehouse::open_in_memory().unwrap();
    pipeline.query(&warehouse).unwrap();

    for entry in std::fs::read_dir(env.output.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().to_string();
        assert!(
            name.ends_with(".csv") || name == ".distribution-ledger.json",
            "unexpected artifact: {name}"
        );
    }
}
