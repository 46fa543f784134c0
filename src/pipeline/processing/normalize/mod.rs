use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::constants;
use crate::error::PipelineError;
use crate::types::RawReview;

pub mod dates;

pub use dates::{format_date, parse_review_date};

/// A review that passed validation: every required field present, rating in range,
/// date canonical, and unique on (text, date, bank) within its batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedReview {
    pub text: String,
    pub rating: u8,
    pub date: NaiveDate,
    pub bank: String,
    pub source: String,
}

impl ValidatedReview {
    /// Key used for deduplication within a batch
    pub fn dedup_key(&self) -> (String, NaiveDate, String) {
        (self.text.clone(), self.date, self.bank.clone())
    }

    /// Back to the raw shape, with the date in canonical form.
    pub fn to_raw(&self) -> RawReview {
        RawReview {
            text: Some(self.text.clone()),
            rating: Some(i64::from(self.rating)),
            date: Some(format_date(self.date)),
            bank: Some(self.bank.clone()),
            source: Some(self.source.clone()),
        }
    }
}

/// Why a raw row was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DropReason {
    MissingText,
    MissingRating,
    MissingDate,
    MissingBank,
    RatingOutOfRange(i64),
    UnparseableDate(String),
}

impl DropReason {
    /// The column responsible for the rejection
    pub fn field(&self) -> &'static str {
        match self {
            DropReason::MissingText => "text",
            DropReason::MissingRating | DropReason::RatingOutOfRange(_) => "rating",
            DropReason::MissingDate | DropReason::UnparseableDate(_) => "date",
            DropReason::MissingBank => "bank",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DropReason::MissingText => "review text is missing".to_string(),
            DropReason::MissingRating => "rating is missing".to_string(),
            DropReason::MissingDate => "date is missing".to_string(),
            DropReason::MissingBank => "bank is missing".to_string(),
            DropReason::RatingOutOfRange(r) => format!("rating {} is outside 1..=5", r),
            DropReason::UnparseableDate(d) => format!("date '{}' could not be parsed", d),
        }
    }
}

/// A rejected row, identified by its zero-based position in the input batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub row: usize,
    pub reason: DropReason,
}

impl DroppedRow {
    pub fn to_error(&self) -> PipelineError {
        PipelineError::MalformedRecord {
            row: self.row,
            reason: self.reason.describe(),
        }
    }
}

/// Count of absent values per column, across all input rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingFieldReport {
    pub text: usize,
    pub rating: usize,
    pub date: usize,
    pub bank: usize,
    /// Rows whose source was absent and received the default
    pub source_defaulted: usize,
}

impl MissingFieldReport {
    pub fn total_missing(&self) -> usize {
        self.text + self.rating + self.date + self.bank + self.source_defaulted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub duplicates_removed: usize,
    pub dropped: Vec<DroppedRow>,
    pub missing: MissingFieldReport,
}

impl NormalizationReport {
    /// Rows that did not make it to the output, malformed or duplicate.
    pub fn dropped_count(&self) -> usize {
        self.dropped.len() + self.duplicates_removed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationOutcome {
    pub reviews: Vec<ValidatedReview>,
    pub report: NormalizationReport,
}

/// Trait for turning raw scraped rows into validated reviews
pub trait Normalizer {
    fn normalize(&self, records: &[RawReview]) -> NormalizationOutcome;
}

/// Drops malformed rows, fills the default source, canonicalizes dates, and
/// deduplicates on (text, date, bank) keeping the first occurrence.
#[derive(Debug, Clone)]
pub struct DefaultNormalizer {
    pub default_source: String,
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        Self {
            default_source: constants::DEFAULT_SOURCE.to_string(),
        }
    }
}

impl DefaultNormalizer {
    pub fn new(default_source: &str) -> Self {
        Self {
            default_source: default_source.to_string(),
        }
    }

    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Tally every absent field of the row, then validate it.
    fn validate_row(
        &self,
        record: &RawReview,
        missing: &mut MissingFieldReport,
    ) -> Result<ValidatedReview, DropReason> {
        let text = Self::present(&record.text);
        let date = Self::present(&record.date);
        let bank = Self::present(&record.bank);
        let source = Self::present(&record.source);

        if text.is_none() {
            missing.text += 1;
        }
        if record.rating.is_none() {
            missing.rating += 1;
        }
        if date.is_none() {
            missing.date += 1;
        }
        if bank.is_none() {
            missing.bank += 1;
        }

        let text = text.ok_or(DropReason::MissingText)?;
        let rating = record.rating.ok_or(DropReason::MissingRating)?;
        let date = date.ok_or(DropReason::MissingDate)?;
        let bank = bank.ok_or(DropReason::MissingBank)?;

        if !(1..=5).contains(&rating) {
            return Err(DropReason::RatingOutOfRange(rating));
        }
        let date = parse_review_date(date)
            .ok_or_else(|| DropReason::UnparseableDate(date.to_string()))?;

        let source = match source {
            Some(s) => s.to_string(),
            None => {
                missing.source_defaulted += 1;
                self.default_source.clone()
            }
        };

        Ok(ValidatedReview {
            text: text.to_string(),
            rating: rating as u8,
            date,
            bank: bank.to_string(),
            source,
        })
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, records: &[RawReview]) -> NormalizationOutcome {
        let mut report = NormalizationReport {
            total_rows: records.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        let mut reviews = Vec::with_capacity(records.len());

        for (row, record) in records.iter().enumerate() {
            match self.validate_row(record, &mut report.missing) {
                Ok(review) => {
                    if seen.insert(review.dedup_key()) {
                        reviews.push(review);
                    } else {
                        debug!(row, "Dropping duplicate review");
                        report.duplicates_removed += 1;
                    }
                }
                Err(reason) => {
                    warn!(
                        row,
                        field = reason.field(),
                        "Dropping malformed review: {}",
                        reason.describe()
                    );
                    crate::observability::metrics::normalize::row_dropped(reason.field());
                    report.dropped.push(DroppedRow { row, reason });
                }
            }
        }

        report.kept_rows = reviews.len();

        crate::observability::metrics::normalize::batch_processed(report.total_rows);
        crate::observability::metrics::normalize::duplicates_removed(report.duplicates_removed);
        crate::observability::metrics::normalize::source_defaulted(report.missing.source_defaulted);

        info!(
            total = report.total_rows,
            kept = report.kept_rows,
            malformed = report.dropped.len(),
            duplicates = report.duplicates_removed,
            "Normalized review batch"
        );

        NormalizationOutcome { reviews, report }
    }
}
