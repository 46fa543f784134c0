//! Metrics for the review pipeline.
//!
//! Recording goes through the `metrics` facade; without an installed recorder every
//! call is a no-op, so library code and tests record unconditionally. The binary
//! installs a Prometheus exporter when a listen address is configured.

use std::fmt;
use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Env var holding the Prometheus listen address, e.g. `0.0.0.0:9000`
pub const METRICS_ADDR_ENV: &str = "REVIEW_PIPELINE_METRICS_ADDR";

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Normalize metrics
    NormalizeBatchesProcessed,
    NormalizeBatchSize,
    NormalizeRowsDropped,
    NormalizeDuplicatesRemoved,
    NormalizeSourceDefaulted,

    // Sentiment metrics
    SentimentReviewsScored,
    SentimentScore,

    // Keyword metrics
    KeywordsCorpusSize,
    KeywordsDegenerateDocuments,

    // Theme metrics
    ThemesAssigned,
    ThemesFallback,

    // Aggregate metrics
    AggregateSummaryRecords,

    // Storage metrics
    StorageRowsInserted,
    StorageRowsSkipped,
    StorageWriteErrors,

    // Pipeline metrics
    PipelineBankSuccess,
    PipelineBankError,
    PipelineBankDuration,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NormalizeBatchesProcessed => {
                "review_pipeline_normalize_batches_processed_total"
            }
            MetricName::NormalizeBatchSize => "review_pipeline_normalize_batch_size",
            MetricName::NormalizeRowsDropped => "review_pipeline_normalize_rows_dropped_total",
            MetricName::NormalizeDuplicatesRemoved => {
                "review_pipeline_normalize_duplicates_removed_total"
            }
            MetricName::NormalizeSourceDefaulted => {
                "review_pipeline_normalize_source_defaulted_total"
            }

            MetricName::SentimentReviewsScored => "review_pipeline_sentiment_reviews_scored_total",
            MetricName::SentimentScore => "review_pipeline_sentiment_score",

            MetricName::KeywordsCorpusSize => "review_pipeline_keywords_corpus_size",
            MetricName::KeywordsDegenerateDocuments => {
                "review_pipeline_keywords_degenerate_documents_total"
            }

            MetricName::ThemesAssigned => "review_pipeline_themes_assigned_total",
            MetricName::ThemesFallback => "review_pipeline_themes_fallback_total",

            MetricName::AggregateSummaryRecords => {
                "review_pipeline_aggregate_summary_records_total"
            }

            MetricName::StorageRowsInserted => "review_pipeline_storage_rows_inserted_total",
            MetricName::StorageRowsSkipped => "review_pipeline_storage_rows_skipped_total",
            MetricName::StorageWriteErrors => "review_pipeline_storage_write_errors_total",

            MetricName::PipelineBankSuccess => "review_pipeline_bank_success_total",
            MetricName::PipelineBankError => "review_pipeline_bank_error_total",
            MetricName::PipelineBankDuration => "review_pipeline_bank_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            NormalizeBatchesProcessed,
            NormalizeBatchSize,
            NormalizeRowsDropped,
            NormalizeDuplicatesRemoved,
            NormalizeSourceDefaulted,
            SentimentReviewsScored,
            SentimentScore,
            KeywordsCorpusSize,
            KeywordsDegenerateDocuments,
            ThemesAssigned,
            ThemesFallback,
            AggregateSummaryRecords,
            StorageRowsInserted,
            StorageRowsSkipped,
            StorageWriteErrors,
            PipelineBankSuccess,
            PipelineBankError,
            PipelineBankDuration,
        ]
        .into_iter()
    }

    /// (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::NormalizeBatchesProcessed => {
                ("normalize", "Review batches normalized", None)
            }
            MetricName::NormalizeBatchSize => ("normalize", "Raw rows per normalized batch", None),
            MetricName::NormalizeRowsDropped => {
                ("normalize", "Malformed rows dropped, by field", None)
            }
            MetricName::NormalizeDuplicatesRemoved => ("normalize", "Duplicate rows removed", None),
            MetricName::NormalizeSourceDefaulted => {
                ("normalize", "Rows given the default source", None)
            }

            MetricName::SentimentReviewsScored => ("sentiment", "Reviews scored, by label", None),
            MetricName::SentimentScore => {
                ("sentiment", "Compound sentiment score distribution", None)
            }

            MetricName::KeywordsCorpusSize => ("keywords", "Documents per TF-IDF corpus", None),
            MetricName::KeywordsDegenerateDocuments => {
                ("keywords", "Documents with fewer than top_n keywords", None)
            }

            MetricName::ThemesAssigned => ("themes", "Theme assignments, by theme", None),
            MetricName::ThemesFallback => {
                ("themes", "Reviews that fell back to the Other theme", None)
            }

            MetricName::AggregateSummaryRecords => {
                ("aggregate", "Rating summary records produced", None)
            }

            MetricName::StorageRowsInserted => ("storage", "Review rows inserted", None),
            MetricName::StorageRowsSkipped => ("storage", "Review rows already present", None),
            MetricName::StorageWriteErrors => ("storage", "Failed bank writes", None),

            MetricName::PipelineBankSuccess => ("pipeline", "Banks processed successfully", None),
            MetricName::PipelineBankError => ("pipeline", "Banks that failed", None),
            MetricName::PipelineBankDuration => {
                ("pipeline", "Per-bank pipeline duration", Some("s"))
            }
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))?;
    for metric in MetricName::all_metrics() {
        let (_, description, _) = metric.metadata();
        if metric.as_str().ends_with("_total") {
            ::metrics::describe_counter!(metric.as_str(), description);
        } else {
            ::metrics::describe_histogram!(metric.as_str(), description);
        }
    }
    info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Install the exporter when `REVIEW_PIPELINE_METRICS_ADDR` is set.
pub fn init_from_env() -> Result<bool, Box<dyn std::error::Error>> {
    match std::env::var(METRICS_ADDR_ENV) {
        Ok(addr) if !addr.trim().is_empty() => {
            init(addr.trim().parse()?)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn batch_processed(batch_size: usize) {
        ::metrics::histogram!(MetricName::NormalizeBatchSize.as_str()).record(batch_size as f64);
        ::metrics::counter!(MetricName::NormalizeBatchesProcessed.as_str()).increment(1);
    }

    pub fn row_dropped(field: &'static str) {
        ::metrics::counter!(MetricName::NormalizeRowsDropped.as_str(), "field" => field)
            .increment(1);
    }

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::NormalizeDuplicatesRemoved.as_str())
            .increment(count as u64);
    }

    pub fn source_defaulted(count: usize) {
        ::metrics::counter!(MetricName::NormalizeSourceDefaulted.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Sentiment Metrics
// ============================================================================

pub mod sentiment {
    use super::MetricName;
    use crate::types::SentimentScore;

    pub fn review_scored(score: &SentimentScore) {
        ::metrics::counter!(
            MetricName::SentimentReviewsScored.as_str(),
            "label" => score.label.as_str()
        )
        .increment(1);
        ::metrics::histogram!(MetricName::SentimentScore.as_str()).record(score.score);
    }
}

// ============================================================================
// Keyword Metrics
// ============================================================================

pub mod keywords {
    use super::MetricName;

    pub fn corpus_processed(documents: usize, degenerate: usize) {
        ::metrics::histogram!(MetricName::KeywordsCorpusSize.as_str()).record(documents as f64);
        ::metrics::counter!(MetricName::KeywordsDegenerateDocuments.as_str())
            .increment(degenerate as u64);
    }
}

// ============================================================================
// Theme Metrics
// ============================================================================

pub mod themes {
    use super::MetricName;
    use crate::constants::FALLBACK_THEME;
    use std::collections::BTreeSet;

    pub fn themes_assigned(themes: &BTreeSet<String>) {
        if themes.len() == 1 && themes.contains(FALLBACK_THEME) {
            ::metrics::counter!(MetricName::ThemesFallback.as_str()).increment(1);
            return;
        }
        for theme in themes {
            ::metrics::counter!(MetricName::ThemesAssigned.as_str(), "theme" => theme.clone())
                .increment(1);
        }
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

pub mod aggregate {
    use super::MetricName;

    pub fn summaries_produced(count: usize) {
        ::metrics::counter!(MetricName::AggregateSummaryRecords.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Storage Metrics
// ============================================================================

pub mod storage {
    use super::MetricName;

    pub fn rows_written(bank: &str, inserted: usize, skipped: usize) {
        ::metrics::counter!(MetricName::StorageRowsInserted.as_str(), "bank" => bank.to_string())
            .increment(inserted as u64);
        ::metrics::counter!(MetricName::StorageRowsSkipped.as_str(), "bank" => bank.to_string())
            .increment(skipped as u64);
    }

    pub fn write_error(bank: &str) {
        ::metrics::counter!(MetricName::StorageWriteErrors.as_str(), "bank" => bank.to_string())
            .increment(1);
    }
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn bank_succeeded(bank: &str, secs: f64) {
        ::metrics::counter!(MetricName::PipelineBankSuccess.as_str(), "bank" => bank.to_string())
            .increment(1);
        ::metrics::histogram!(MetricName::PipelineBankDuration.as_str(), "bank" => bank.to_string())
            .record(secs);
    }

    pub fn bank_failed(bank: &str, error_type: &'static str) {
        ::metrics::counter!(
            MetricName::PipelineBankError.as_str(),
            "bank" => bank.to_string(),
            "error_type" => error_type
        )
        .increment(1);
    }
}
