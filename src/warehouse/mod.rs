//! Warehouse query execution
//!
//! Runs raw SQL scripts through DuckDB and materializes the results as
//! text-encoded rows for the slicer. Script files are discovered from the
//! configured directory and executed sequentially, one result set at a time.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;
use std::path::Path;


/// A named SQL statement read from the scripts directory
#[derive(Debug, Clone)]
pub struct QueryScript {
    /// File name including the `.sql` suffix, e.g. `possales_rl_1.sql`
    pub name: String,
    /// The SQL text
    pub sql: String,
}

/// An ordered, text-encoded query result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    /// Column names, in select order
    pub columns: Vec<String>,
    /// Rows in result order; NULL values are encoded as empty strings
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Discover `*.sql` scripts in a directory, sorted by name for a
/// deterministic run order.
pub fn discover_scripts(dir: impl AsRef<Path>) -> Result<Vec<QueryScript>> {
    let dir = dir.as_ref();
    let mut scripts = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".sql") || !entry.file_type()?.is_file() {
            continue;
        }
        let sql = std::fs::read_to_string(entry.path())
            .map_err(|e| Error::query(&name, format!("failed to read script: {e}")))?;
        scripts.push(QueryScript { name, sql });
    }

    if scripts.is_empty() {
        return Err(Error::NoScripts {
            dir: dir.display().to_string(),
        });
    }

    scripts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(scripts)
}

/// DuckDB-backed warehouse client
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open an in-memory warehouse connection
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to open DuckDB connection: {e}")))?;
        Ok(Self { conn })
    }

    /// Open a warehouse backed by a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to open database {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(Self { conn })
    }

    /// Execute a statement without a result, e.g. to seed test fixtures
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::query("batch", e.to_string()))?;
        Ok(())
    }

    /// Execute a query script and materialize the full result set.
    ///
    /// Errors (malformed SQL, permission, resource exhaustion) carry the
    /// script name so per-script failures are attributable.
    pub fn run_script(&self, script: &QueryScript) -> Result<ResultSet> {
        tracing::debug!(script = %script.name, "Executing query");

        let mut stmt = self
            .conn
            .prepare(&script.sql)
            .map_err(|e| Error::query(&script.name, e.to_string()))?;

        let mut rows = stmt
            .query([])
            .map_err(|e| Error::query(&script.name, e.to_string()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut out: Vec<Vec<String>> = Vec::new();

        while let Some(row) = rows
            .next()
            .map_err(|e| Error::query(&script.name, e.to_string()))?
        {
            if columns.is_empty() {
                columns = row.as_ref().column_names();
            }
            let mut fields = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value: Value = row
                    .get(idx)
                    .map_err(|e| Error::query(&script.name, e.to_string()))?;
                fields.push(value_to_text(&value));
            }
            out.push(fields);
        }

        // Empty result: column names are still needed for the header row.
        // The statement has executed at this point, so the result schema is
        // available once the row cursor releases its borrow.
        drop(rows);
        if columns.is_empty() {
            columns = stmt.column_names();
        }

        tracing::info!(script = %script.name, rows = out.len(), "Query complete");

        Ok(ResultSet {
            columns,
            rows: out,
        })
    }
}

/// Text-encode a DuckDB value for delimited output
fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(v) => v.to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::HugeInt(v) => v.to_string(),
        Value::UTinyInt(v) => v.to_string(),
        Value::USmallInt(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::UBigInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::Text(s) => s.clone(),
        Value::Enum(s) => s.clone(),
        Value::Date32(days) => date_from_epoch_days(*days)
            .map(|d| d.to_string())
            .unwrap_or_default(),
        Value::Timestamp(unit, v) => timestamp_to_text(*unit, *v),
        other => format!("{other:?}"),
    }
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(TimeDelta::days(i64::from(days)))
}

fn timestamp_to_text(unit: TimeUnit, value: i64) -> String {
    let micros = match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    };
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .as_ref()
        .map(NaiveDateTime::to_string)
        .unwrap_or_default()
}
