use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, info_span};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::aggregate::{
    aggregate_by_rating, bank_overview, BankOverview, SummaryRecord,
};
use crate::pipeline::processing::clean::TextCleaner;
use crate::pipeline::processing::enrich::{review_fingerprint, EnrichedReview};
use crate::pipeline::processing::keywords::KeywordExtractor;
use crate::pipeline::processing::normalize::{
    DefaultNormalizer, NormalizationReport, Normalizer, ValidatedReview,
};
use crate::pipeline::processing::sentiment::SentimentScorer;
use crate::pipeline::processing::themes::{map_keywords, ThemeMap};
use crate::types::{RawReview, ReviewSource};

/// Read-only state shared by every bank's pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResources {
    pub normalizer: DefaultNormalizer,
    pub cleaner: TextCleaner,
    pub scorer: SentimentScorer,
    pub extractor: KeywordExtractor,
    pub theme_map: ThemeMap,
}

impl PipelineResources {
    /// Build every stage from configuration. Loads the lexicon file if one is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let scorer = SentimentScorer::from_settings(&config.sentiment)?;
        let theme_map = ThemeMap::from_config(&config.themes);
        info!(
            lexicon_entries = scorer.lexicon().len(),
            theme_keys = theme_map.len(),
            top_n = config.pipeline.top_n,
            "Pipeline resources ready"
        );
        Ok(Self {
            normalizer: DefaultNormalizer::new(&config.pipeline.default_source),
            cleaner: TextCleaner::new(),
            scorer,
            extractor: KeywordExtractor::from_settings(&config.pipeline),
            theme_map,
        })
    }
}

/// Fully enriched output of one bank.
#[derive(Debug, Clone)]
pub struct BankOutput {
    pub reviews: Vec<EnrichedReview>,
    pub summaries: Vec<SummaryRecord>,
    pub overview: BankOverview,
}

/// Normalization report plus enriched output.
#[derive(Debug, Clone)]
pub struct BankRun {
    pub normalization: NormalizationReport,
    pub output: BankOutput,
}

/// Raw rows for one bank, as handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct BankBatch {
    pub bank: String,
    pub records: Vec<RawReview>,
}

/// Result of running one bank. A failure here never affects other banks.
#[derive(Debug)]
pub struct BankOutcome {
    pub bank: String,
    pub result: Result<BankRun>,
    pub elapsed: Duration,
}

impl BankOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Synchronous, single-threaded pipeline for one bank.
#[derive(Debug, Clone)]
pub struct BankPipeline {
    resources: Arc<PipelineResources>,
}

impl BankPipeline {
    pub fn new(resources: Arc<PipelineResources>) -> Self {
        Self { resources }
    }

    /// Normalize then enrich.
    pub fn run(&self, bank: &str, records: &[RawReview]) -> Result<BankRun> {
        let span = info_span!("bank_pipeline", bank = %bank);
        let _guard = span.enter();

        let outcome = self.resources.normalizer.normalize(records);
        let output = self.enrich(bank, outcome.reviews)?;
        Ok(BankRun {
            normalization: outcome.report,
            output,
        })
    }

    /// clean text -> sentiment -> keywords -> themes -> aggregate.
    ///
    /// Keyword weights are computed over the whole of `reviews`, so the batch must be
    /// the bank's complete review set.
    pub fn enrich(&self, bank: &str, reviews: Vec<ValidatedReview>) -> Result<BankOutput> {
        if reviews.is_empty() {
            return Err(PipelineError::EmptyBatch {
                bank: bank.to_string(),
            });
        }
        let resources = &self.resources;

        let cleaned: Vec<String> = reviews
            .iter()
            .map(|r| resources.cleaner.clean(&r.text))
            .collect();
        info!(reviews = reviews.len(), "Cleaned review text");

        let sentiments = resources
            .scorer
            .predict_batch(&reviews.iter().map(|r| r.text.as_str()).collect::<Vec<_>>());
        sentiments.iter().for_each(metrics::sentiment::review_scored);
        info!("Scored sentiment");

        let keywords = resources.extractor.extract_terms(&cleaned);
        let degenerate = keywords
            .iter()
            .filter(|k| k.len() < resources.extractor.top_n())
            .count();
        metrics::keywords::corpus_processed(cleaned.len(), degenerate);
        if degenerate > 0 {
            debug!(degenerate, "Reviews with fewer keywords than requested");
        }
        info!("Extracted keywords");

        let enriched: Vec<EnrichedReview> = reviews
            .into_iter()
            .zip(cleaned)
            .zip(sentiments)
            .zip(keywords)
            .map(|(((review, cleaned_text), sentiment), keywords)| {
                let themes = map_keywords(&keywords, &resources.theme_map);
                metrics::themes::themes_assigned(&themes);
                EnrichedReview {
                    review_id: review_fingerprint(&review),
                    review,
                    cleaned_text,
                    sentiment,
                    keywords,
                    themes,
                }
            })
            .collect();
        info!("Assigned themes");

        let summaries = aggregate_by_rating(bank, &enriched)?;
        let overview = bank_overview(bank, &enriched)?;
        metrics::aggregate::summaries_produced(summaries.len());
        info!(
            summaries = summaries.len(),
            mean_sentiment = overview.mean_sentiment_score,
            "Aggregated sentiment by rating"
        );

        Ok(BankOutput {
            reviews: enriched,
            summaries,
            overview,
        })
    }
}

/// Runs banks independently on Tokio's blocking pool.
pub struct PipelineOrchestrator {
    resources: Arc<PipelineResources>,
}

impl PipelineOrchestrator {
    pub fn new(resources: Arc<PipelineResources>) -> Self {
        Self { resources }
    }

    pub fn resources(&self) -> &Arc<PipelineResources> {
        &self.resources
    }

    /// One outcome per batch, in input order.
    pub async fn run_all(&self, batches: Vec<BankBatch>) -> Vec<BankOutcome> {
        info!("🚀 Running pipeline for {} bank(s)", batches.len());

        let handles: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                let pipeline = BankPipeline::new(Arc::clone(&self.resources));
                let bank = batch.bank.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let started = Instant::now();
                    let result = pipeline.run(&batch.bank, &batch.records);
                    (result, started.elapsed())
                });
                (bank, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (bank, handle) in handles {
            let (result, elapsed) = match handle.await {
                Ok(done) => done,
                Err(e) => (Err(PipelineError::Task(e.to_string())), Duration::ZERO),
            };
            outcomes.push(record_outcome(bank, result, elapsed));
        }
        outcomes
    }

    /// Fetch every source, then run the banks. A source that fails to load yields a
    /// failed outcome for its bank only.
    pub async fn run_sources(&self, sources: &[Arc<dyn ReviewSource>]) -> Vec<BankOutcome> {
        let mut batches = Vec::new();
        let mut failed = Vec::new();
        for source in sources {
            let bank = source.bank_name().to_string();
            match source.fetch_reviews().await {
                Ok(records) => {
                    info!("📥 Loaded {} raw reviews for {}", records.len(), bank);
                    batches.push(BankBatch { bank, records });
                }
                Err(e) => failed.push(record_outcome(bank, Err(e), Duration::ZERO)),
            }
        }

        let mut outcomes = self.run_all(batches).await;
        outcomes.extend(failed);
        outcomes
    }
}

fn record_outcome(bank: String, result: Result<BankRun>, elapsed: Duration) -> BankOutcome {
    match &result {
        Ok(run) => {
            info!(
                "✅ {}: {} enriched, {} dropped in {:.2}s",
                bank,
                run.output.reviews.len(),
                run.normalization.dropped_count(),
                elapsed.as_secs_f64()
            );
            metrics::pipeline::bank_succeeded(&bank, elapsed.as_secs_f64());
        }
        Err(e) => {
            error!("❌ {} failed: {}", bank, e);
            metrics::pipeline::bank_failed(&bank, e.kind());
        }
    }
    BankOutcome { bank, result, elapsed }
}
