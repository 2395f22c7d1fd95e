//! Output file naming and destination routing
//!
//! Every output file name encodes its source script, capture date, and
//! chunk version: `possales_rl_{dept}_{date}_{version}.csv`. The department
//! code is recoverable from the name, which is what both destination
//! routers key on.
//!
//! All functions here are pure; callers pass in the capture date, which the
//! pipeline anchors to execution time.

use crate::department::{Department, DepartmentTable};
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};


/// Fixed prefix shared by every query script and output file
pub const FILE_PREFIX: &str = "possales_rl_";

/// Suffix of the query-definition scripts
pub const SQL_SUFFIX: &str = ".sql";

/// Suffix of the sliced output files
pub const OUTPUT_SUFFIX: &str = "csv";

/// Fixed key prefix in the bucket destination
pub const BUCKET_PREFIX: &str = "supply_chain/possales_rl";

/// Derive an output file name from a script name.
///
/// `{base}_{date}_{version}.{output_suffix}` where `base` is `input_name`
/// with `input_suffix` removed. Stable within a calendar day for identical
/// inputs except `version`, and distinct versions never collide.
///
/// `possales_rl_1.sql` with version 2 becomes `possales_rl_1_2025-03-16_2.csv`.
pub fn output_file_name(
    input_name: &str,
    input_suffix: &str,
    output_suffix: &str,
    version: u32,
    date: NaiveDate,
) -> String {
    let base = input_name.strip_suffix(input_suffix).unwrap_or(input_name);
    format!("{base}_{date}_{version}.{output_suffix}")
}

/// English month name and year for a capture date
pub fn month_year(date: NaiveDate) -> (String, i32) {
    (date.format("%B").to_string(), date.year())
}

/// Recover the department from an output file name.
///
/// The code is the token immediately after the fixed prefix and before the
/// first underscore: `possales_rl_3_2025-03-16_1.csv` -> `3`.
pub fn parse_department(file_name: &str) -> Result<Department> {
    let rest = file_name
        .strip_prefix(FILE_PREFIX)
        .ok_or_else(|| Error::UnroutableFile {
            file: file_name.to_string(),
        })?;
    let code = rest.split('_').next().unwrap_or_default();
    Department::from_code(code).ok_or_else(|| Error::unknown_department(code, file_name))
}

/// Fully qualified bucket key for an output file:
/// `supply_chain/possales_rl/{year}/{month}/{department}/{file_name}`
pub fn bucket_key(file_name: &str, date: NaiveDate, table: &DepartmentTable) -> Result<String> {
    let dept = parse_department(file_name)?;
    let (month, year) = month_year(date);
    Ok(format!(
        "{BUCKET_PREFIX}/{year}/{month}/{}/{file_name}",
        table.display_name(dept)
    ))
}

/// Drive folder chain for a department under the root folder:
/// `[{year}, {month}, {department}]`, provisioned segment by segment.
pub fn folder_chain(date: NaiveDate, dept: Department, table: &DepartmentTable) -> [String; 3] {
    let (month, year) = month_year(date);
    [
        year.to_string(),
        month,
        table.display_name(dept).to_string(),
    ]
}
