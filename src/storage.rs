use crate::error::{PipelineError, Result};
use crate::pipeline::processing::aggregate::SummaryRecord;
use crate::pipeline::processing::enrich::EnrichedReview;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredBank {
    pub bank_id: i64,
    pub bank_name: String,
}

/// A review row as persisted: surrogate ids plus flattened list columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReview {
    pub review_id: i64,
    pub bank_id: i64,
    /// Natural key; the enriched review's fingerprint
    pub review_key: String,
    pub review_text: String,
    pub rating: u8,
    pub review_date: NaiveDate,
    pub source: String,
    pub cleaned_review: String,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub keywords: String,
    pub themes: String,
}

impl StoredReview {
    pub fn from_enriched(review_id: i64, bank_id: i64, enriched: &EnrichedReview) -> Self {
        Self {
            review_id,
            bank_id,
            review_key: enriched.review_id.clone(),
            review_text: enriched.review.text.clone(),
            rating: enriched.review.rating,
            review_date: enriched.review.date,
            source: enriched.review.source.clone(),
            cleaned_review: enriched.cleaned_text.clone(),
            sentiment_label: enriched.sentiment.label.as_str().to_string(),
            sentiment_score: enriched.sentiment.score,
            keywords: enriched.keywords_joined(),
            themes: enriched.themes_joined(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSummary {
    pub bank_id: i64,
    pub rating: u8,
    pub mean_sentiment_score: f64,
}

/// What one bank insert changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InsertOutcome {
    pub bank_id: i64,
    pub inserted: usize,
    /// Reviews whose natural key was already stored
    pub skipped: usize,
    pub summaries: usize,
}

/// Sink for enriched reviews. Each bank batch is written atomically; re-inserting the
/// same batch stores nothing new.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert_bank_batch(
        &self,
        bank: &str,
        reviews: &[EnrichedReview],
        summaries: &[SummaryRecord],
    ) -> Result<InsertOutcome>;

    /// Stored review rows, for one bank or all of them
    async fn count_reviews(&self, bank: Option<&str>) -> Result<usize>;

    async fn banks(&self) -> Result<Vec<StoredBank>>;

    /// All review rows ordered by surrogate id
    async fn reviews(&self) -> Result<Vec<StoredReview>>;

    async fn summaries(&self) -> Result<Vec<StoredSummary>>;
}

/// Insert outcome plus the bank's stored row count read back afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifiedInsert {
    pub outcome: InsertOutcome,
    pub stored: usize,
}

impl VerifiedInsert {
    /// Every enriched review is accounted for in the store.
    pub fn is_complete(&self, expected: usize) -> bool {
        self.stored >= expected
    }
}

/// Write one bank's batch, then re-count its rows. Either step failing is an
/// error for this bank alone.
pub async fn store_and_verify(
    store: &dyn ReviewStore,
    bank: &str,
    reviews: &[EnrichedReview],
    summaries: &[SummaryRecord],
) -> Result<VerifiedInsert> {
    let outcome = store.insert_bank_batch(bank, reviews, summaries).await?;
    let stored = store.count_reviews(Some(bank)).await?;
    Ok(VerifiedInsert { outcome, stored })
}

#[derive(Debug, Default)]
struct InMemoryState {
    banks: Vec<StoredBank>,
    reviews: Vec<StoredReview>,
    review_keys: HashSet<String>,
    summaries: BTreeMap<(i64, u8), f64>,
}

impl InMemoryState {
    fn bank_id(&mut self, bank: &str) -> i64 {
        if let Some(existing) = self.banks.iter().find(|b| b.bank_name == bank) {
            return existing.bank_id;
        }
        let bank_id = self.banks.len() as i64 + 1;
        self.banks.push(StoredBank {
            bank_id,
            bank_name: bank.to_string(),
        });
        bank_id
    }
}

/// In-memory storage implementation for development/testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|_| PipelineError::SinkWrite("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn insert_bank_batch(
        &self,
        bank: &str,
        reviews: &[EnrichedReview],
        summaries: &[SummaryRecord],
    ) -> Result<InsertOutcome> {
        let mut state = self.state()?;
        let bank_id = state.bank_id(bank);
        let mut outcome = InsertOutcome {
            bank_id,
            ..Default::default()
        };

        for review in reviews {
            if !state.review_keys.insert(review.review_id.clone()) {
                outcome.skipped += 1;
                continue;
            }
            let review_id = state.reviews.len() as i64 + 1;
            state.reviews.push(StoredReview::from_enriched(review_id, bank_id, review));
            outcome.inserted += 1;
        }
        for summary in summaries {
            state
                .summaries
                .insert((bank_id, summary.rating), summary.mean_sentiment_score);
            outcome.summaries += 1;
        }

        debug!(
            bank,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "Stored bank batch in memory"
        );
        Ok(outcome)
    }

    async fn count_reviews(&self, bank: Option<&str>) -> Result<usize> {
        let state = self.state()?;
        let count = match bank {
            None => state.reviews.len(),
            Some(name) => match state.banks.iter().find(|b| b.bank_name == name) {
                Some(b) => state.reviews.iter().filter(|r| r.bank_id == b.bank_id).count(),
                None => 0,
            },
        };
        Ok(count)
    }

    async fn banks(&self) -> Result<Vec<StoredBank>> {
        Ok(self.state()?.banks.clone())
    }

    async fn reviews(&self) -> Result<Vec<StoredReview>> {
        Ok(self.state()?.reviews.clone())
    }

    async fn summaries(&self) -> Result<Vec<StoredSummary>> {
        Ok(self
            .state()?
            .summaries
            .iter()
            .map(|(&(bank_id, rating), &mean_sentiment_score)| StoredSummary {
                bank_id,
                rating,
                mean_sentiment_score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::ValidatedReview;
    use crate::types::{SentimentLabel, SentimentScore};
    use std::collections::BTreeSet;

    fn enriched(text: &str, rating: u8, score: f64) -> EnrichedReview {
        let review = ValidatedReview {
            text: text.to_string(),
            rating,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            bank: "BOA".to_string(),
            source: "Google Play".to_string(),
        };
        EnrichedReview {
            review_id: crate::pipeline::processing::enrich::review_fingerprint(&review),
            review,
            cleaned_text: text.to_lowercase(),
            sentiment: SentimentScore {
                label: SentimentLabel::Positive,
                score,
            },
            keywords: vec!["great".to_string(), "great app".to_string()],
            themes: BTreeSet::from(["Other".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_surrogate_ids() {
        let store = InMemoryStore::new();
        let reviews = vec![enriched("Great app", 5, 0.6), enriched("Nice", 4, 0.4)];
        let summaries = vec![SummaryRecord {
            bank: "BOA".to_string(),
            rating: 5,
            mean_sentiment_score: 0.6,
        }];

        let outcome = store.insert_bank_batch("BOA", &reviews, &summaries).await.unwrap();
        assert_eq!(outcome.bank_id, 1);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.summaries, 1);

        let stored = store.reviews().await.unwrap();
        assert_eq!(stored[0].review_id, 1);
        assert_eq!(stored[1].review_id, 2);
        assert_eq!(stored[0].keywords, "great, great app");
        assert_eq!(stored[0].sentiment_label, "positive");
    }

    /// Accepts writes but cannot answer row-count queries.
    struct CountlessStore(InMemoryStore);

    #[async_trait]
    impl ReviewStore for CountlessStore {
        async fn insert_bank_batch(
            &self,
            bank: &str,
            reviews: &[EnrichedReview],
            summaries: &[SummaryRecord],
        ) -> Result<InsertOutcome> {
            self.0.insert_bank_batch(bank, reviews, summaries).await
        }

        async fn count_reviews(&self, _bank: Option<&str>) -> Result<usize> {
            Err(PipelineError::SinkWrite("count unavailable".to_string()))
        }

        async fn banks(&self) -> Result<Vec<StoredBank>> {
            self.0.banks().await
        }

        async fn reviews(&self) -> Result<Vec<StoredReview>> {
            self.0.reviews().await
        }

        async fn summaries(&self) -> Result<Vec<StoredSummary>> {
            self.0.summaries().await
        }
    }

    #[tokio::test]
    async fn test_store_and_verify_counts_bank_rows() {
        let store = InMemoryStore::new();
        let reviews = vec![enriched("Great app", 5, 0.6), enriched("Nice", 4, 0.4)];
        let verified = store_and_verify(&store, "BOA", &reviews, &[]).await.unwrap();
        assert_eq!(verified.outcome.inserted, 2);
        assert_eq!(verified.stored, 2);
        assert!(verified.is_complete(reviews.len()));

        let again = store_and_verify(&store, "BOA", &reviews, &[]).await.unwrap();
        assert_eq!(again.outcome.skipped, 2);
        assert!(again.is_complete(reviews.len()));
    }

    #[tokio::test]
    async fn test_failed_count_is_an_error_for_that_bank() {
        let store = CountlessStore(InMemoryStore::new());
        let reviews = vec![enriched("Great app", 5, 0.6)];
        let err = store_and_verify(&store, "BOA", &reviews, &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::SinkWrite(_)));

        // the next bank is still writable through the same store
        let other = vec![enriched("Nice", 4, 0.4)];
        store.insert_bank_batch("Dashen", &other, &[]).await.unwrap();
        assert_eq!(store.0.count_reviews(Some("Dashen")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reinsertion_is_idempotent() {
        let store = InMemoryStore::new();
        let reviews = vec![enriched("Great app", 5, 0.6)];
        store.insert_bank_batch("BOA", &reviews, &[]).await.unwrap();
        let again = store.insert_bank_batch("BOA", &reviews, &[]).await.unwrap();

        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(store.count_reviews(None).await.unwrap(), 1);
        assert_eq!(store.count_reviews(Some("BOA")).await.unwrap(), 1);
        assert_eq!(store.count_reviews(Some("Dashen")).await.unwrap(), 0);
        assert_eq!(store.banks().await.unwrap().len(), 1);
    }
}
