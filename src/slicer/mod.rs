//! Row slicer
//!
//! Partitions a query result into contiguous chunks of at most `bound` rows
//! and serializes each chunk as a delimited file with a header row. Chunk
//! versions are 1-based and contiguous; an N-row result produces
//! `ceil(N / bound)` files and an empty result produces none.
//!
//! Files are written atomically: each chunk goes to a temporary file in the
//! output directory and is persisted to its final name only once fully
//! written, so a failure partway never leaves a truncated output file.

use crate::error::{Error, Result};
use crate::naming::{self, OUTPUT_SUFFIX, SQL_SUFFIX};
use crate::warehouse::ResultSet;
use chrono::NaiveDate;
use csv::WriterBuilder;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;


/// A sliced output file on local disk, written once and never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Full local path
    pub path: PathBuf,
    /// File name, e.g. `possales_rl_1_2025-03-16_2.csv`
    pub file_name: String,
    /// 1-based chunk version
    pub version: u32,
    /// Number of data rows in this chunk
    pub rows: usize,
}

/// Slice a result set into bounded delimited files.
///
/// `script_name` is the source query script (`possales_rl_1.sql`); the
/// capture `date` and chunk version feed the naming resolver.
pub fn slice_result_set(
    result: &ResultSet,
    script_name: &str,
    output_dir: &Path,
    bound: usize,
    delimiter: u8,
    date: NaiveDate,
) -> Result<Vec<OutputFile>> {
    if bound == 0 {
        return Err(Error::slice("slice bound must be greater than 0"));
    }

    let mut outputs = Vec::new();

    for (index, chunk) in result.rows.chunks(bound).enumerate() {
        let version = index as u32 + 1;
        let file_name =
            naming::output_file_name(script_name, SQL_SUFFIX, OUTPUT_SUFFIX, version, date);
        let path = output_dir.join(&file_name);

        write_chunk(&path, &result.columns, chunk, delimiter)?;

        tracing::debug!(file = %file_name, rows = chunk.len(), "Wrote slice");

        outputs.push(OutputFile {
            path,
            file_name,
            version,
            rows: chunk.len(),
        });
    }

    Ok(outputs)
}

/// Write one chunk: header row of column names, then the data rows,
/// persisted atomically via a temp file in the destination directory.
fn write_chunk(path: &Path, columns: &[String], rows: &[Vec<String>], delimiter: u8) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::slice(format!(
            "cannot determine parent directory for {}",
            path.display()
        ))
    })?;

    let temp = NamedTempFile::new_in(parent)
        .map_err(|e| Error::slice(format!("failed to create temporary file: {e}")))?;

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(BufWriter::new(temp));

    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let buf = writer
        .into_inner()
        .map_err(|e| Error::slice(format!("failed to flush slice writer: {e}")))?;
    let temp = buf
        .into_inner()
        .map_err(|e| Error::slice(format!("failed to flush slice buffer: {e}")))?;

    temp.persist(path)
        .map_err(|e| Error::slice(format!("failed to persist {}: {}", path.display(), e.error)))?;

    Ok(())
}
