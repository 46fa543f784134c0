use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::constants::LIST_SEPARATOR;
use crate::pipeline::processing::normalize::{format_date, ValidatedReview};
use crate::types::SentimentScore;

/// Hex characters kept from the SHA-256 digest
const REVIEW_ID_LEN: usize = 16;

/// A validated review carrying every enrichment. Never partially populated:
/// the pipeline either returns a full batch of these or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedReview {
    /// Deterministic fingerprint of (bank, date, text)
    pub review_id: String,
    /// The review this record was derived from
    pub review: ValidatedReview,
    /// Lowercased, stop-word free, lemmatized tokens joined by spaces
    pub cleaned_text: String,
    pub sentiment: SentimentScore,
    /// Most relevant first; at most `top_n` entries
    pub keywords: Vec<String>,
    /// Never empty; `{"Other"}` when no keyword matched the theme map
    pub themes: BTreeSet<String>,
}

impl EnrichedReview {
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(LIST_SEPARATOR)
    }

    pub fn themes_joined(&self) -> String {
        self.themes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR)
    }
}

/// First 16 hex characters of SHA-256 over `bank`, canonical date and `text`.
pub fn review_fingerprint(review: &ValidatedReview) -> String {
    let mut hasher = Sha256::new();
    hasher.update(review.bank.as_bytes());
    hasher.update([0x1f]);
    hasher.update(format_date(review.date).as_bytes());
    hasher.update([0x1f]);
    hasher.update(review.text.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(REVIEW_ID_LEN);
    id
}
