use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::aggregate::SummaryRecord;
use crate::pipeline::processing::enrich::EnrichedReview;
use crate::storage::{InsertOutcome, ReviewStore, StoredBank, StoredReview, StoredSummary};

pub const BANKS_DDL: &str = "CREATE TABLE IF NOT EXISTS banks (
    bank_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    bank_name TEXT NOT NULL UNIQUE
)";

pub const REVIEWS_DDL: &str = "CREATE TABLE IF NOT EXISTS reviews (
    review_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    review_key      TEXT NOT NULL UNIQUE,
    bank_id         INTEGER NOT NULL REFERENCES banks (bank_id),
    review_text     TEXT NOT NULL,
    rating          INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    review_date     TEXT NOT NULL,
    source          TEXT NOT NULL,
    cleaned_review  TEXT NOT NULL,
    sentiment_label TEXT NOT NULL CHECK (sentiment_label IN ('positive', 'neutral', 'negative')),
    sentiment_score REAL NOT NULL CHECK (sentiment_score BETWEEN -1.0 AND 1.0),
    keywords        TEXT,
    themes          TEXT NOT NULL
)";

pub const RATING_SUMMARIES_DDL: &str = "CREATE TABLE IF NOT EXISTS rating_summaries (
    bank_id              INTEGER NOT NULL REFERENCES banks (bank_id),
    rating               INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    mean_sentiment_score REAL NOT NULL,
    PRIMARY KEY (bank_id, rating)
)";

/// (table, DDL) in creation order.
pub const SCHEMA: [(&str, &str); 3] = [
    ("banks", BANKS_DDL),
    ("reviews", REVIEWS_DDL),
    ("rating_summaries", RATING_SUMMARIES_DDL),
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed review store. The connection is serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::with_connection(conn)?;
        info!(path = %path.display(), "Opened review database");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        for (_, ddl) in SCHEMA {
            conn.execute_batch(ddl)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::SinkWrite("sqlite connection lock poisoned".to_string()))
    }

    fn write_batch(
        conn: &mut Connection,
        bank: &str,
        reviews: &[EnrichedReview],
        summaries: &[SummaryRecord],
    ) -> Result<InsertOutcome> {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO banks (bank_name) VALUES (?1) ON CONFLICT (bank_name) DO NOTHING",
            params![bank],
        )?;
        let bank_id: i64 = tx.query_row(
            "SELECT bank_id FROM banks WHERE bank_name = ?1",
            params![bank],
            |row| row.get(0),
        )?;

        let mut outcome = InsertOutcome {
            bank_id,
            ..Default::default()
        };
        {
            let mut insert_review = tx.prepare(
                "INSERT INTO reviews (
                    review_key, bank_id, review_text, rating, review_date, source,
                    cleaned_review, sentiment_label, sentiment_score, keywords, themes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT (review_key) DO NOTHING",
            )?;
            for review in reviews {
                let changed = insert_review.execute(params![
                    review.review_id,
                    bank_id,
                    review.review.text,
                    review.review.rating,
                    review.review.date.format(DATE_FORMAT).to_string(),
                    review.review.source,
                    review.cleaned_text,
                    review.sentiment.label.as_str(),
                    review.sentiment.score,
                    review.keywords_joined(),
                    review.themes_joined(),
                ])?;
                if changed == 0 {
                    outcome.skipped += 1;
                } else {
                    outcome.inserted += 1;
                }
            }

            let mut upsert_summary = tx.prepare(
                "INSERT INTO rating_summaries (bank_id, rating, mean_sentiment_score)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (bank_id, rating) DO UPDATE SET
                    mean_sentiment_score = excluded.mean_sentiment_score",
            )?;
            for summary in summaries {
                upsert_summary.execute(params![
                    bank_id,
                    summary.rating,
                    summary.mean_sentiment_score
                ])?;
                outcome.summaries += 1;
            }
        }
        tx.commit()?;
        Ok(outcome)
    }
}

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn insert_bank_batch(
        &self,
        bank: &str,
        reviews: &[EnrichedReview],
        summaries: &[SummaryRecord],
    ) -> Result<InsertOutcome> {
        let result = {
            let mut conn = self.conn()?;
            Self::write_batch(&mut conn, bank, reviews, summaries)
        };
        match &result {
            Ok(outcome) => {
                metrics::storage::rows_written(bank, outcome.inserted, outcome.skipped);
                debug!(
                    bank,
                    inserted = outcome.inserted,
                    skipped = outcome.skipped,
                    "Committed bank batch"
                );
            }
            Err(_) => metrics::storage::write_error(bank),
        }
        result
    }

    async fn count_reviews(&self, bank: Option<&str>) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = match bank {
            None => conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?,
            Some(name) => conn.query_row(
                "SELECT COUNT(*) FROM reviews r JOIN banks b ON b.bank_id = r.bank_id
                 WHERE b.bank_name = ?1",
                params![name],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    async fn banks(&self) -> Result<Vec<StoredBank>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT bank_id, bank_name FROM banks ORDER BY bank_id")?;
        let banks = stmt
            .query_map([], |row| {
                Ok(StoredBank {
                    bank_id: row.get(0)?,
                    bank_name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(banks)
    }

    async fn reviews(&self) -> Result<Vec<StoredReview>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT review_id, bank_id, review_key, review_text, rating, review_date, source,
                    cleaned_review, sentiment_label, sentiment_score, keywords, themes
             FROM reviews ORDER BY review_id",
        )?;
        let reviews = stmt
            .query_map([], |row| {
                let review_date: String = row.get(5)?;
                let review_date = NaiveDate::parse_from_str(&review_date, DATE_FORMAT)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                    })?;
                let keywords: Option<String> = row.get(10)?;
                Ok(StoredReview {
                    review_id: row.get(0)?,
                    bank_id: row.get(1)?,
                    review_key: row.get(2)?,
                    review_text: row.get(3)?,
                    rating: row.get(4)?,
                    review_date,
                    source: row.get(6)?,
                    cleaned_review: row.get(7)?,
                    sentiment_label: row.get(8)?,
                    sentiment_score: row.get(9)?,
                    keywords: keywords.unwrap_or_default(),
                    themes: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    async fn summaries(&self) -> Result<Vec<StoredSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT bank_id, rating, mean_sentiment_score FROM rating_summaries
             ORDER BY bank_id, rating",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(StoredSummary {
                    bank_id: row.get(0)?,
                    rating: row.get(1)?,
                    mean_sentiment_score: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }
}

impl SqliteStore {
    /// Bank id for `bank`, if it has been stored.
    pub fn bank_id(&self, bank: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT bank_id FROM banks WHERE bank_name = ?1",
                params![bank],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
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
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            bank: "Dashen Bank".to_string(),
            source: "Google Play".to_string(),
        };
        EnrichedReview {
            review_id: crate::pipeline::processing::enrich::review_fingerprint(&review),
            review,
            cleaned_text: "app crash".to_string(),
            sentiment: SentimentScore {
                label: SentimentLabel::Negative,
                score,
            },
            keywords: vec!["app crash".to_string()],
            themes: BTreeSet::from(["Performance".to_string()]),
        }
    }

    fn summary(rating: u8, mean: f64) -> SummaryRecord {
        SummaryRecord {
            bank: "Dashen Bank".to_string(),
            rating,
            mean_sentiment_score: mean,
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let reviews = vec![
            enriched("App crashes, it's awful", 1, -0.6),
            enriched("Crash again", 2, -0.3),
        ];
        let outcome = store
            .insert_bank_batch("Dashen Bank", &reviews, &[summary(1, -0.6), summary(2, -0.3)])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.summaries, 2);

        let stored = store.reviews().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].review_text, "App crashes, it's awful");
        assert_eq!(stored[0].review_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(stored[0].themes, "Performance");
        assert_eq!(store.banks().await.unwrap()[0].bank_name, "Dashen Bank");
        assert_eq!(store.summaries().await.unwrap().len(), 2);
        assert_eq!(store.bank_id("Dashen Bank").unwrap(), Some(outcome.bank_id));
        assert_eq!(store.bank_id("Nope").unwrap(), None);
    }

    #[tokio::test]
    async fn test_reinsertion_keeps_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reviews.db");
        let store = SqliteStore::open(&path).unwrap();
        let reviews = vec![enriched("Crash again", 2, -0.3)];

        store.insert_bank_batch("Dashen Bank", &reviews, &[summary(2, -0.3)]).await.unwrap();
        let again = store
            .insert_bank_batch("Dashen Bank", &reviews, &[summary(2, -0.3)])
            .await
            .unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(store.count_reviews(None).await.unwrap(), 1);
        assert_eq!(store.count_reviews(Some("Dashen Bank")).await.unwrap(), 1);
        assert_eq!(store.summaries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_constraint_violation_rolls_back_batch() {
        let store = SqliteStore::open_in_memory().unwrap();
        let good = enriched("Fine", 3, 0.0);
        let mut bad = enriched("Out of range", 3, 0.0);
        bad.sentiment.score = 7.0;

        let err = store
            .insert_bank_batch("Dashen Bank", &[good, bad], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SinkWrite(_)));
        assert_eq!(store.count_reviews(None).await.unwrap(), 0);
        assert!(store.banks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_batch_leaves_earlier_rows_and_is_not_counted_as_skipped() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = enriched("Crash again", 2, -0.3);
        store.insert_bank_batch("Dashen Bank", &[stored.clone()], &[]).await.unwrap();

        let fresh = enriched("Slow login", 1, -0.2);
        let bad_rating = enriched("Rated nine", 9, -0.1);
        let result = store
            .insert_bank_batch(
                "Dashen Bank",
                &[stored.clone(), fresh, bad_rating],
                &[summary(1, -0.2)],
            )
            .await;
        assert!(matches!(result, Err(PipelineError::SinkWrite(_))));
        assert_eq!(store.count_reviews(Some("Dashen Bank")).await.unwrap(), 1);
        assert!(store.summaries().await.unwrap().is_empty());

        let again = store.insert_bank_batch("Dashen Bank", &[stored], &[]).await.unwrap();
        assert_eq!((again.inserted, again.skipped), (0, 1));
    }
}
