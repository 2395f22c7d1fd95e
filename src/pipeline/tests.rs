//! Tests for stage orchestration and cleanup gating

use super::*;
use crate::drive::MemoryDrive;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Fixture {
    scripts: TempDir,
    output: TempDir,
    bucket: TempDir,
    drive: MemoryDrive,
}

impl Fixture {
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
drive:
  root_folder_id: root
",
            self.scripts.path().display(),
            self.output.path().display(),
            self.bucket.path().display(),
        );
        let config = PipelineConfig::from_yaml(&yaml).unwrap();
        Pipeline::new(config)
            .unwrap()
            .with_capture_date(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap())
    }

    fn bucket_store(&self) -> BucketStore {
        BucketStore::parse(self.bucket.path().to_str().unwrap()).unwrap()
    }

    fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".csv"))
            .collect();
        names.sort();
        names
    }
}

fn warehouse() -> Warehouse {
    Warehouse::open_in_memory().unwrap()
}

// ============================================================================
// Query Stage Tests
// ============================================================================

#[test]
fn test_query_slices_each_script() {
    let fx = Fixture::new();
    fx.add_script(
        "possales_rl_1.sql",
        "SELECT range AS id FROM range(5) ORDER BY id",
    );
    fx.add_script(
        "possales_rl_2.sql",
        "SELECT range AS id FROM range(3) ORDER BY id",
    );

    let pipeline = fx.pipeline(2);
    let written = pipeline.query(&warehouse()).unwrap();

    // 5 rows at bound 2 -> 3 files; 3 rows -> 2 files
    assert_eq!(written.len(), 5);
    assert_eq!(
        fx.output_files(),
        vec![
            "possales_rl_1_2025-03-16_1.csv",
            "possales_rl_1_2025-03-16_2.csv",
            "possales_rl_1_2025-03-16_3.csv",
            "possales_rl_2_2025-03-16_1.csv",
            "possales_rl_2_2025-03-16_2.csv",
        ]
    );
}

#[test]
fn test_query_isolates_script_failures() {
    let fx = Fixture::new();
    fx.add_script("possales_rl_1.sql", "SELEC broken");
    fx.add_script(
        "possales_rl_2.sql",
        "SELECT range AS id FROM range(2) ORDER BY id",
    );

    let pipeline = fx.pipeline(10);
    let err = pipeline.query(&warehouse()).unwrap_err();

    // The good script still produced its file
    assert_eq!(fx.output_files(), vec!["possales_rl_2_2025-03-16_1.csv"]);
    assert!(
        matches!(err, Error::StageFailed { ref stage, failed: 1, .. } if stage == "query"),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("possales_rl_1.sql"));
}

#[test]
fn test_query_empty_result_writes_nothing() {
    let fx = Fixture::new();
    fx.add_script("possales_rl_1.sql", "SELECT 1 AS id WHERE 1 = 0");

    let pipeline = fx.pipeline(10);
    let written = pipeline.query(&warehouse()).unwrap();
    assert!(written.is_empty());
    assert!(fx.output_files().is_empty());
}

// ============================================================================
// Upload Stage Tests
// ============================================================================

#[tokio::test]
async fn test_upload_bucket_routes_by_department() {
    let fx = Fixture::new();
    fx.add_script(
        "possales_rl_3.sql",
        "SELECT range AS id FROM range(2) ORDER BY id",
    );

    let pipeline = fx.pipeline(10);
    pipeline.query(&warehouse()).unwrap();
    let uploaded = pipeline.upload_bucket(&fx.bucket_store()).await.unwrap();

    assert_eq!(uploaded.len(), 1);
    let stored = fx.bucket.path().join(
        "supply_chain/possales_rl/2025/March/3 - PERISHABLES/possales_rl_3_2025-03-16_1.csv",
    );
    assert!(stored.is_file(), "missing {}", stored.display());
}

#[tokio::test]
async fn test_upload_drive_provisions_hierarchy() {
    let fx = Fixture::new();
    fx.add_script(
        "possales_rl_1.sql",
        "SELECT range AS id FROM range(5) ORDER BY id",
    );

    let pipeline = fx.pipeline(2);
    pipeline.query(&warehouse()).unwrap();
    pipeline.upload_drive(&fx.drive).await.unwrap();

    // Exactly one {year}/{month}/{department} chain for the one department
    assert_eq!(fx.drive.folder_count(), 3);
    let chain = vec![
        "2025".to_string(),
        "March".to_string(),
        "1 - GROCERY".to_string(),
    ];
    let leaf = fx.drive.resolve_chain("root", &chain).unwrap();
    assert_eq!(fx.drive.children(&leaf).len(), 3);
}

#[tokio::test]
async fn test_upload_drive_rerun_replaces_files() {
    let fx = Fixture::new();
    fx.add_script(
        "possales_rl_1.sql",
        "SELECT range AS id FROM range(2) ORDER BY id",
    );

    let pipeline = fx.pipeline(10);
    pipeline.query(&warehouse()).unwrap();
    pipeline.upload_drive(&fx.drive).await.unwrap();
    pipeline.upload_drive(&fx.drive).await.unwrap();

    let chain = vec![
        "2025".to_string(),
        "March".to_string(),
        "1 - GROCERY".to_string(),
    ];
    let leaf = fx.drive.resolve_chain("root", &chain).unwrap();
    // Same name uploaded twice, exactly one file remains
    assert_eq!(fx.drive.children(&leaf).len(), 1);
    assert_eq!(fx.drive.folder_count(), 3);
}

#[tokio::test]
async fn test_upload_unknown_department_is_fatal() {
    let fx = Fixture::new();
    std::fs::write(
        fx.output.path().join("possales_rl_9_2025-03-16_1.csv"),
        "id\n1\n",
    )
    .unwrap();

    let pipeline = fx.pipeline(10);
    let err = pipeline.upload_bucket(&fx.bucket_store()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownDepartment { .. }));
}

// ============================================================================
// Cleanup Stage Tests
// ============================================================================

#[tokio::test]
async fn test_cleanup_gated_on_both_destinations() {
    let fx = Fixture::new();
    fx.add_script(
        "possales_rl_1.sql",
        "SELECT range AS id FROM range(2) ORDER BY id",
    );

    let pipeline = fx.pipeline(10);
    pipeline.query(&warehouse()).unwrap();

    // Only the bucket has confirmed; the file must be retained
    pipeline.upload_bucket(&fx.bucket_store()).await.unwrap();
    let outcome = pipeline.cleanup().unwrap();
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.retained, vec!["possales_rl_1_2025-03-16_1.csv"]);
    assert_eq!(fx.output_files().len(), 1);

    // After the drive confirms too, cleanup deletes the file
    pipeline.upload_drive(&fx.drive).await.unwrap();
    let outcome = pipeline.cleanup().unwrap();
    assert_eq!(outcome.removed, vec!["possales_rl_1_2025-03-16_1.csv"]);
    assert!(fx.output_files().is_empty());
}

#[test]
fn test_cleanup_with_no_confirmations_retains_everything() {
    let fx = Fixture::new();
    std::fs::write(
        fx.output.path().join("possales_rl_2_2025-03-16_1.csv"),
        "id\n1\n",
    )
    .unwrap();

    let pipeline = fx.pipeline(10);
    let outcome = pipeline.cleanup().unwrap();
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.retained.len(), 1);
    assert_eq!(fx.output_files().len(), 1);
}

// ============================================================================
// Full Run Tests
// ============================================================================

#[tokio::test]
async fn test_run_full_chain() {
    let fx = Fixture::new();
    fx.add_script(
        "possales_rl_2.sql",
        "SELECT range AS id, 'row-' || range::VARCHAR AS name FROM range(5) ORDER BY id",
    );

    let pipeline = fx.pipeline(2);
    let outcome = pipeline
        .run(&warehouse(), &fx.bucket_store(), &fx.drive)
        .await
        .unwrap();

    assert_eq!(outcome.removed.len(), 3);
    assert!(outcome.retained.is_empty());

    // Local artifacts are gone, both destinations hold the files
    assert!(fx.output_files().is_empty());
    let bucket_dir = fx
        .bucket
        .path()
        .join("supply_chain/possales_rl/2025/March/2 - FRESH");
    assert_eq!(std::fs::read_dir(bucket_dir).unwrap().count(), 3);

    let chain = vec![
        "2025".to_string(),
        "March".to_string(),
        "2 - FRESH".to_string(),
    ];
    let leaf = fx.drive.resolve_chain("root", &chain).unwrap();
    assert_eq!(fx.drive.children(&leaf).len(), 3);
}

#[tokio::test]
async fn test_run_halts_distribution_when_query_fails() {
    let fx = Fixture::new();
    fx.add_script("possales_rl_1.sql", "SELEC broken");

    let pipeline = fx.pipeline(10);
    let err = pipeline
        .run(&warehouse(), &fx.bucket_store(), &fx.drive)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StageFailed { .. }));
    assert_eq!(fx.drive.folder_count(), 0);
}
