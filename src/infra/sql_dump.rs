use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::infra::sqlite_store::SCHEMA;
use crate::storage::ReviewStore;

/// Rows written by a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpStats {
    pub banks: usize,
    pub reviews: usize,
    pub summaries: usize,
}

/// Renders a store's schema and contents as a replayable SQL script.
pub struct SqlDumper<'a> {
    store: &'a dyn ReviewStore,
}

impl<'a> SqlDumper<'a> {
    pub fn new(store: &'a dyn ReviewStore) -> Self {
        Self { store }
    }

    pub async fn render(&self, generated_at: DateTime<Local>) -> Result<(String, DumpStats)> {
        let banks = self.store.banks().await?;
        let reviews = self.store.reviews().await?;
        let summaries = self.store.summaries().await?;

        let mut sql = String::new();
        let mut line = |text: &str| {
            sql.push_str(text);
            sql.push('\n');
        };
        line("-- SQL dump of banks, reviews and rating_summaries tables");
        line(&format!("-- Generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
        line("");
        line("BEGIN TRANSACTION;");
        line("");
        for (table, ddl) in SCHEMA {
            line(&format!("-- Table structure for {}", table));
            line(&format!("{};", ddl));
            line("");
        }

        line("-- Data for banks");
        for bank in &banks {
            line(&format!(
                "INSERT INTO banks (bank_id, bank_name) VALUES ({}, {});",
                bank.bank_id,
                quote(&bank.bank_name)
            ));
        }
        line("");

        line("-- Data for reviews");
        for r in &reviews {
            let mut stmt = String::from(
                "INSERT INTO reviews (review_id, review_key, bank_id, review_text, rating, \
                 review_date, source, cleaned_review, sentiment_label, sentiment_score, \
                 keywords, themes) VALUES (",
            );
            // infallible: writing into a String
            let _ = write!(
                stmt,
                "{}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {});",
                r.review_id,
                quote(&r.review_key),
                r.bank_id,
                quote(&r.review_text),
                r.rating,
                quote(&r.review_date.format("%Y-%m-%d").to_string()),
                quote(&r.source),
                quote(&r.cleaned_review),
                quote(&r.sentiment_label),
                r.sentiment_score,
                quote_or_null(&r.keywords),
                quote(&r.themes),
            );
            line(&stmt);
        }
        line("");

        line("-- Data for rating_summaries");
        for s in &summaries {
            line(&format!(
                "INSERT INTO rating_summaries (bank_id, rating, mean_sentiment_score) \
                 VALUES ({}, {}, {});",
                s.bank_id, s.rating, s.mean_sentiment_score
            ));
        }
        line("");
        line("COMMIT;");

        let stats = DumpStats {
            banks: banks.len(),
            reviews: reviews.len(),
            summaries: summaries.len(),
        };
        Ok((sql, stats))
    }

    /// Render and write to `path`, creating parent directories.
    pub async fn write_to(&self, path: &Path) -> Result<DumpStats> {
        let (sql, stats) = self.render(Local::now()).await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, sql).await.map_err(|e| {
            PipelineError::SinkWrite(format!(
                "Failed to write SQL dump '{}': {}",
                path.display(),
                e
            ))
        })?;
        info!(path = %path.display(), reviews = stats.reviews, "SQL dump written");
        Ok(stats)
    }
}

/// Single-quoted SQL literal with embedded quotes doubled.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_or_null(value: &str) -> String {
    if value.is_empty() {
        "NULL".to_string()
    } else {
        quote(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite_store::SqliteStore;
    use crate::pipeline::processing::aggregate::SummaryRecord;
    use crate::pipeline::processing::enrich::{review_fingerprint, EnrichedReview};
    use crate::pipeline::processing::normalize::ValidatedReview;
    use crate::storage::InMemoryStore;
    use crate::types::{SentimentLabel, SentimentScore};
    use chrono::{NaiveDate, TimeZone};
    use std::collections::BTreeSet;

    fn enriched(text: &str, keywords: Vec<String>) -> EnrichedReview {
        let review = ValidatedReview {
            text: text.to_string(),
            rating: 4,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            bank: "Bank of Abyssinia".to_string(),
            source: "Google Play".to_string(),
        };
        EnrichedReview {
            review_id: review_fingerprint(&review),
            review,
            cleaned_text: "good".to_string(),
            sentiment: SentimentScore {
                label: SentimentLabel::Positive,
                score: 0.44,
            },
            keywords,
            themes: BTreeSet::from(["Other".to_string()]),
        }
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("it's"), "'it''s'");
        assert_eq!(quote_or_null(""), "NULL");
    }

    #[tokio::test]
    async fn test_render_structure() {
        let store = InMemoryStore::new();
        let reviews = vec![
            enriched("It's good", vec!["good".to_string()]),
            enriched("ok", vec![]),
        ];
        let summary = SummaryRecord {
            bank: "Bank of Abyssinia".to_string(),
            rating: 4,
            mean_sentiment_score: 0.44,
        };
        store
            .insert_bank_batch("Bank of Abyssinia", &reviews, &[summary])
            .await
            .unwrap();

        let at = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let (sql, stats) = SqlDumper::new(&store).render(at).await.unwrap();

        assert!(sql.starts_with("-- SQL dump"));
        assert!(sql.contains("-- Generated on: 2024-06-01 12:00:00"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS reviews"));
        assert!(sql.contains("'It''s good'"));
        assert!(sql.contains(", NULL, 'Other');"));
        assert!(sql.trim_end().ends_with("COMMIT;"));
        assert_eq!(stats, DumpStats { banks: 1, reviews: 2, summaries: 1 });
    }

    #[tokio::test]
    async fn test_dump_replays_into_fresh_database() {
        let store = SqliteStore::open_in_memory().unwrap();
        let reviews = vec![enriched("Bank's app is good", vec!["app".to_string()])];
        store.insert_bank_batch("Bank of Abyssinia", &reviews, &[]).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump").join("database_dump.sql");
        let stats = SqlDumper::new(&store).write_to(&path).await.unwrap();
        assert_eq!(stats.reviews, 1);

        let sql = std::fs::read_to_string(&path).unwrap();
        let replay = rusqlite::Connection::open_in_memory().unwrap();
        replay.execute_batch(&sql).unwrap();
        let text: String = replay
            .query_row("SELECT review_text FROM reviews", [], |row| row.get(0))
            .unwrap();
        assert_eq!(text, "Bank's app is good");
    }
}
