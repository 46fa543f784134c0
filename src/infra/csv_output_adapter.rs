use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{bank_slug, ENRICHED_SUFFIX, LIST_SEPARATOR};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::aggregate::SummaryRecord;
use crate::pipeline::processing::enrich::EnrichedReview;
use crate::pipeline::processing::normalize::{parse_review_date, ValidatedReview};
use crate::types::{SentimentLabel, SentimentScore};

/// One line of an enriched review file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub review_id: String,
    pub review_text: String,
    pub rating: u8,
    pub date: String,
    pub source: String,
    pub bank: String,
    pub cleaned_review: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
    pub keywords: String,
    pub themes: String,
}

impl From<&EnrichedReview> for EnrichedRow {
    fn from(r: &EnrichedReview) -> Self {
        Self {
            review_id: r.review_id.clone(),
            review_text: r.review.text.clone(),
            rating: r.review.rating,
            date: r.review.date.format("%Y-%m-%d").to_string(),
            source: r.review.source.clone(),
            bank: r.review.bank.clone(),
            cleaned_review: r.cleaned_text.clone(),
            sentiment_label: r.sentiment.label,
            sentiment_score: r.sentiment.score,
            keywords: r.keywords_joined(),
            themes: r.themes_joined(),
        }
    }
}

impl EnrichedRow {
    pub fn into_enriched(self) -> Result<EnrichedReview> {
        let date = parse_review_date(&self.date).ok_or_else(|| PipelineError::MalformedRecord {
            row: 0,
            reason: format!("date '{}' could not be parsed", self.date),
        })?;
        Ok(EnrichedReview {
            review_id: self.review_id,
            review: ValidatedReview {
                text: self.review_text,
                rating: self.rating,
                date,
                bank: self.bank,
                source: self.source,
            },
            cleaned_text: self.cleaned_review,
            sentiment: SentimentScore {
                label: self.sentiment_label,
                score: self.sentiment_score,
            },
            keywords: split_list(&self.keywords),
            themes: split_list(&self.themes).into_iter().collect::<BTreeSet<_>>(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SummaryRow {
    bank: String,
    rating: u8,
    sentiment_score: f64,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR.trim())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Writes enriched reviews and rating summaries under an output directory.
#[derive(Debug, Clone)]
pub struct CsvOutputAdapter {
    output_dir: PathBuf,
}

impl CsvOutputAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `<output_dir>/<bank_slug>_with_sentiment_themes.csv`
    pub fn enriched_path(&self, bank: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", bank_slug(bank), ENRICHED_SUFFIX))
    }

    pub fn write_enriched(&self, bank: &str, reviews: &[EnrichedReview]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.enriched_path(bank);
        let mut writer = csv::Writer::from_path(&path)?;
        for review in reviews {
            writer.serialize(EnrichedRow::from(review))?;
        }
        writer.flush()?;
        info!(bank, path = %path.display(), rows = reviews.len(), "Wrote enriched reviews");
        Ok(path)
    }

    pub fn write_summaries(&self, file_name: &str, summaries: &[SummaryRecord]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        for s in summaries {
            writer.serialize(SummaryRow {
                bank: s.bank.clone(),
                rating: s.rating,
                sentiment_score: s.mean_sentiment_score,
            })?;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = summaries.len(), "Wrote rating summaries");
        Ok(path)
    }

    pub fn read_enriched(&self, bank: &str) -> Result<Vec<EnrichedReview>> {
        read_enriched_file(&self.enriched_path(bank))
    }
}

pub fn read_enriched_file(path: &Path) -> Result<Vec<EnrichedReview>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut reviews = Vec::new();
    for (row, record) in reader.deserialize::<EnrichedRow>().enumerate() {
        let review = record?.into_enriched().map_err(|e| match e {
            PipelineError::MalformedRecord { reason, .. } => {
                PipelineError::MalformedRecord { row, reason }
            }
            other => other,
        })?;
        reviews.push(review);
    }
    Ok(reviews)
}

pub fn read_summaries_file(path: &Path) -> Result<Vec<SummaryRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<SummaryRow>()
        .map(|row| {
            let row = row?;
            Ok(SummaryRecord {
                bank: row.bank,
                rating: row.rating,
                mean_sentiment_score: row.sentiment_score,
            })
        })
        .collect()
}
