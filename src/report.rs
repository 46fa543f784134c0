//! Per-bank insight report built from enriched reviews.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::pipeline::processing::aggregate::{bank_overview, BankOverview};
use crate::pipeline::processing::enrich::EnrichedReview;
use crate::pipeline::processing::themes::{examples_by_theme, theme_counts};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankReport {
    pub overview: BankOverview,
    /// Reviews per theme, most frequent first; excludes "Other"
    pub theme_counts: Vec<(String, usize)>,
    pub examples: BTreeMap<String, Vec<String>>,
}

impl BankReport {
    pub fn build(bank: &str, reviews: &[EnrichedReview], max_examples: usize) -> Result<Self> {
        let overview = bank_overview(bank, reviews)?;

        let mut counts: Vec<(String, usize)> =
            theme_counts(reviews.iter().map(|r| &r.themes)).into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let examples = examples_by_theme(
            reviews.iter().map(|r| (r.review.text.as_str(), &r.themes)),
            max_examples,
        );

        Ok(Self {
            overview,
            theme_counts: counts,
            examples,
        })
    }

    /// Single-line JSON, so several reports can be written as JSON Lines.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
