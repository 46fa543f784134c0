use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::types::{RawReview, ReviewSource};

const TEXT_HEADERS: &[&str] = &["review_text", "review", "content", "text"];
const RATING_HEADERS: &[&str] = &["rating", "score"];
const DATE_HEADERS: &[&str] = &["date", "at", "review_date"];
const BANK_HEADERS: &[&str] = &["bank_name", "bank"];
const SOURCE_HEADERS: &[&str] = &["source"];

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    text: usize,
    rating: usize,
    date: usize,
    bank: Option<usize>,
    source: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
        };
        let required = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| PipelineError::MissingColumn(aliases[0].to_string()))
        };
        Ok(Self {
            text: required(TEXT_HEADERS)?,
            rating: required(RATING_HEADERS)?,
            date: required(DATE_HEADERS)?,
            bank: find(BANK_HEADERS),
            source: find(SOURCE_HEADERS),
        })
    }
}

/// One bank's scraped reviews exported as CSV.
#[derive(Debug, Clone)]
pub struct CsvReviewSource {
    bank: String,
    path: PathBuf,
}

impl CsvReviewSource {
    pub fn new(bank: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            bank: bank.to_string(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReviewSource for CsvReviewSource {
    fn bank_name(&self) -> &str {
        &self.bank
    }

    async fn fetch_reviews(&self) -> Result<Vec<RawReview>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let reviews = read_reviews(bytes.as_slice(), &self.bank)?;
        info!(
            bank = %self.bank,
            path = %self.path.display(),
            rows = reviews.len(),
            "Read review CSV"
        );
        Ok(reviews)
    }
}

/// Parse review rows from CSV. When the file has no bank column every row is
/// attributed to `default_bank`; an empty cell in a present column stays missing.
pub fn read_reviews<R: Read>(reader: R, default_bank: &str) -> Result<Vec<RawReview>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = ColumnIndex::resolve(rdr.headers()?)?;
    if columns.bank.is_none() {
        debug!(bank = default_bank, "No bank column; using configured bank name");
    }

    let mut reviews = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = |i: usize| {
            record
                .get(i)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        reviews.push(RawReview {
            text: cell(columns.text),
            rating: cell(columns.rating).as_deref().and_then(parse_rating),
            date: cell(columns.date),
            bank: match columns.bank {
                Some(i) => cell(i),
                None => Some(default_bank.to_string()),
            },
            source: columns.source.and_then(cell),
        });
    }
    Ok(reviews)
}

/// Whole-number ratings, written either as "5" or "5.0".
fn parse_rating(value: &str) -> Option<i64> {
    if let Ok(r) = value.parse::<i64>() {
        return Some(r);
    }
    let r = value.parse::<f64>().ok()?;
    (r.is_finite() && r.fract() == 0.0).then_some(r as i64)
}
