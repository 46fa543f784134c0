//! Dataset validation for the raw review files.
//!
//! Reports on the files as scraped, before any normalization: which expected files are
//! missing, how many cells are empty, how many exact duplicates exist, and whether dates
//! are already in ISO form.

use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::BankSource;
use crate::constants::REQUIRED_COLUMNS;
use crate::error::{PipelineError, Result};

static ISO_DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("ISO date pattern is valid"));

/// Columns that identify an exact duplicate row
const DUPLICATE_KEY: [&str; 4] = ["review_text", "rating", "date", "bank_name"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileValidation {
    pub bank: String,
    pub file: String,
    pub reviews: usize,
    pub missing_values: usize,
    pub missing_pct: f64,
    pub duplicates: usize,
    pub date_format_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMetrics {
    pub total_reviews: usize,
    pub overall_missing_pct: f64,
    pub total_duplicates: usize,
    pub all_files_present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetValidation {
    pub files: Vec<FileValidation>,
    pub missing_files: Vec<String>,
    /// `None` when no expected file could be read
    pub metrics: Option<ValidationMetrics>,
}

impl DatasetValidation {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validate every configured bank file under `data_dir`.
///
/// A file lacking a required column is an error; a file that does not exist is
/// only reported.
pub fn validate_dataset(data_dir: &Path, banks: &[BankSource]) -> Result<DatasetValidation> {
    let mut files = Vec::new();
    let mut missing_files = Vec::new();

    for bank in banks {
        let path = data_dir.join(&bank.file);
        if !path.exists() {
            warn!(file = %bank.file, "Expected review file is missing");
            missing_files.push(bank.file.clone());
            continue;
        }
        let content = std::fs::read(&path)?;
        let validation = validate_file(&bank.name, &bank.file, content.as_slice())?;
        info!(
            file = %bank.file,
            reviews = validation.reviews,
            missing = validation.missing_values,
            duplicates = validation.duplicates,
            "Validated review file"
        );
        files.push(validation);
    }

    let metrics = overall_metrics(&files, missing_files.is_empty());
    Ok(DatasetValidation {
        files,
        missing_files,
        metrics,
    })
}

pub fn validate_file<R: std::io::Read>(
    bank: &str,
    file: &str,
    reader: R,
) -> Result<FileValidation> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let missing_columns: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| position(c).is_none())
        .collect();
    if !missing_columns.is_empty() {
        return Err(PipelineError::MissingColumn(format!(
            "{} in {}",
            missing_columns.join(", "),
            file
        )));
    }
    let required: Vec<usize> = REQUIRED_COLUMNS.iter().filter_map(|c| position(c)).collect();
    let key_columns: Vec<usize> = DUPLICATE_KEY.iter().filter_map(|c| position(c)).collect();
    let date_column = position("date");

    let mut reviews = 0;
    let mut missing_values = 0;
    let mut duplicates = 0;
    let mut date_format_ok = true;
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for record in rdr.records() {
        let record = record?;
        reviews += 1;
        let cell = |i: usize| record.get(i).map(str::trim).unwrap_or_default();

        missing_values += required.iter().filter(|&&i| cell(i).is_empty()).count();

        let key: Vec<String> = key_columns.iter().map(|&i| cell(i).to_string()).collect();
        if !seen.insert(key) {
            duplicates += 1;
        }

        if let Some(i) = date_column {
            let date = cell(i);
            if !date.is_empty() && !ISO_DATE_PREFIX.is_match(date) {
                date_format_ok = false;
            }
        }
    }

    Ok(FileValidation {
        bank: bank.to_string(),
        file: file.to_string(),
        reviews,
        missing_values,
        missing_pct: missing_percentage(missing_values, reviews),
        duplicates,
        date_format_ok,
    })
}

fn overall_metrics(files: &[FileValidation], all_files_present: bool) -> Option<ValidationMetrics> {
    let total_reviews: usize = files.iter().map(|f| f.reviews).sum();
    if total_reviews == 0 {
        return None;
    }
    let missing: usize = files.iter().map(|f| f.missing_values).sum();
    Some(ValidationMetrics {
        total_reviews,
        overall_missing_pct: missing_percentage(missing, total_reviews),
        total_duplicates: files.iter().map(|f| f.duplicates).sum(),
        all_files_present,
    })
}

/// Share of empty required cells, as a percentage rounded to two decimals.
fn missing_percentage(missing: usize, rows: usize) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    let pct = missing as f64 / (rows * REQUIRED_COLUMNS.len()) as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "review_text,rating,date,bank_name,source\n";

    #[test]
    fn test_counts_missing_and_duplicates() {
        let data = format!(
            "{HEADER}Good,5,2024-01-01,BOA,Google Play\n\
             Good,5,2024-01-01,BOA,Google Play\n\
             ,3,2024-01-03,BOA,\n"
        );
        let v = validate_file("BOA", "boa.csv", data.as_bytes()).unwrap();
        assert_eq!(v.reviews, 3);
        assert_eq!(v.missing_values, 2);
        assert_eq!(v.duplicates, 1);
        assert!(v.date_format_ok);
        // 2 of 15 cells
        assert_eq!(v.missing_pct, 13.33);
    }

    #[test]
    fn test_dataset_validation_as_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("boa.csv"),
            format!("{HEADER}Good,5,2024-01-01,BOA,Google Play\n"),
        )
        .unwrap();
        let banks = vec![BankSource {
            name: "BOA".to_string(),
            file: "boa.csv".to_string(),
        }];
        let validation = validate_dataset(dir.path(), &banks).unwrap();

        let json = validation.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files"][0]["bank"], "BOA");
        assert_eq!(value["files"][0]["reviews"], 1);
        assert_eq!(value["metrics"]["all_files_present"], true);
    }

    #[test]
    fn test_detects_non_iso_dates() {
        let data = format!("{HEADER}Good,5,01/15/2024,BOA,Google Play\n");
        let v = validate_file("BOA", "boa.csv", data.as_bytes()).unwrap();
        assert!(!v.date_format_ok);
    }

    #[test]
    fn test_missing_columns_is_an_error() {
        let data = "review,rating,date\nGood,5,2024-01-01\n";
        let err = validate_file("BOA", "boa.csv", data.as_bytes()).unwrap_err();
        match err {
            PipelineError::MissingColumn(msg) => {
                assert!(msg.contains("review_text"));
                assert!(msg.contains("boa.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_dataset_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("boa.csv"),
            format!("{HEADER}Good,5,2024-01-01,BOA,Google Play\n"),
        )
        .unwrap();
        let banks = vec![
            BankSource {
                name: "BOA".to_string(),
                file: "boa.csv".to_string(),
            },
            BankSource {
                name: "Dashen".to_string(),
                file: "dashen.csv".to_string(),
            },
        ];

        let report = validate_dataset(dir.path(), &banks).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.missing_files, vec!["dashen.csv".to_string()]);
        let metrics = report.metrics.unwrap();
        assert_eq!(metrics.total_reviews, 1);
        assert_eq!(metrics.overall_missing_pct, 0.0);
        assert!(!metrics.all_files_present);
    }

    #[test]
    fn test_no_files_gives_no_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let banks = vec![BankSource {
            name: "BOA".to_string(),
            file: "boa.csv".to_string(),
        }];
        let report = validate_dataset(dir.path(), &banks).unwrap();
        assert!(report.metrics.is_none());
    }
}
