use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A review as captured by the scraping collaborator.
///
/// Every field is optional because upstream payloads routinely omit values; the
/// normalizer decides which absences are fatal for the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub text: Option<String>,
    pub rating: Option<i64>,
    /// Unparsed date: ISO date/datetime, epoch millis, or a locale-formatted string
    pub date: Option<String>,
    pub bank: Option<String>,
    pub source: Option<String>,
}

impl RawReview {
    pub fn new(text: &str, rating: i64, date: &str, bank: &str, source: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            rating: Some(rating),
            date: Some(date.to_string()),
            bank: Some(bank.to_string()),
            source: Some(source.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label plus compound score in [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f64,
}

/// Boundary to whatever produces raw reviews for one bank (scraper, CSV export, fixture).
#[async_trait::async_trait]
pub trait ReviewSource: Send + Sync {
    /// Bank the reviews belong to
    fn bank_name(&self) -> &str;

    /// Fetch every raw review available for this bank
    async fn fetch_reviews(&self) -> Result<Vec<RawReview>>;
}
