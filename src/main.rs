use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use review_pipeline::config::{BankSource, Config};
use review_pipeline::constants::{bank_slug, SUMMARY_FILE};
use review_pipeline::infra::{CsvOutputAdapter, SqlDumper, SqliteStore};
use review_pipeline::logging;
use review_pipeline::observability;
use review_pipeline::pipeline::ingestion::{validate_dataset, CsvReviewSource};
use review_pipeline::pipeline::{BankRun, PipelineOrchestrator, PipelineResources};
use review_pipeline::report::BankReport;
use review_pipeline::storage::store_and_verify;
use review_pipeline::types::{ReviewSource, SentimentLabel};

#[derive(Parser)]
#[command(name = "review_pipeline")]
#[command(about = "Sentiment and theme enrichment for mobile-banking app reviews")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to $REVIEW_PIPELINE_CONFIG or review_pipeline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, enrich, store, and summarize every bank's reviews
    Run {
        /// Specific banks to run (comma-separated names or slugs)
        #[arg(long)]
        banks: Option<String>,
        /// Directory holding the raw review CSV files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Write CSV outputs only, without touching the database
        #[arg(long)]
        skip_store: bool,
    },
    /// Report on the raw review files before processing
    Validate {
        /// Directory holding the raw review CSV files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the database contents as a replayable SQL script
    Dump {
        /// Destination file (defaults to storage.dump_path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print insight reports computed from the enriched output files
    Report {
        /// Bank name or slug (defaults to every configured bank)
        #[arg(long)]
        bank: Option<String>,
        /// Example reviews shown per theme
        #[arg(long, default_value_t = 3)]
        examples: usize,
        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
}

fn select_banks(config: &Config, filter: Option<&str>) -> Vec<BankSource> {
    let sources = config.bank_sources();
    let Some(filter) = filter else {
        return sources;
    };
    let wanted: Vec<String> = filter
        .split(',')
        .map(|s| bank_slug(s.trim()))
        .filter(|s| !s.is_empty())
        .collect();
    sources
        .into_iter()
        .filter(|b| wanted.contains(&bank_slug(&b.name)))
        .collect()
}

fn print_bank_run(bank: &str, run: &BankRun) {
    let report = &run.normalization;
    let overview = &run.output.overview;
    println!("\n📊 Pipeline Results for {}:", bank);
    println!("   Raw rows: {}", report.total_rows);
    println!("   Kept: {}", report.kept_rows);
    println!("   Duplicates removed: {}", report.duplicates_removed);
    println!("   Dropped: {}", report.dropped_count());
    println!(
        "   Sentiment: {:.1}% positive, {:.1}% neutral, {:.1}% negative (mean {:.3})",
        overview.share(SentimentLabel::Positive) * 100.0,
        overview.share(SentimentLabel::Neutral) * 100.0,
        overview.share(SentimentLabel::Negative) * 100.0,
        overview.mean_sentiment_score
    );

    if !report.dropped.is_empty() {
        println!("\n⚠️  Dropped rows:");
        for dropped in &report.dropped {
            println!("   - row {}: {}", dropped.row, dropped.reason.describe());
        }
    }
}

async fn run_pipeline(
    config: &Config,
    banks: Option<String>,
    data_dir: Option<PathBuf>,
    skip_store: bool,
) -> anyhow::Result<bool> {
    let data_dir = data_dir.unwrap_or_else(|| config.pipeline.data_dir.clone());
    let selected = select_banks(config, banks.as_deref());
    if selected.is_empty() {
        warn!("No configured bank matched the selection");
        println!("⚠️  No banks selected");
        return Ok(true);
    }

    let sources: Vec<Arc<dyn ReviewSource>> = selected
        .iter()
        .map(|b| {
            Arc::new(CsvReviewSource::new(&b.name, data_dir.join(&b.file))) as Arc<dyn ReviewSource>
        })
        .collect();

    let resources = PipelineResources::from_config(config)
        .context("Failed to build pipeline resources")?;
    let resources = Arc::new(resources);
    let orchestrator = PipelineOrchestrator::new(resources);
    let outcomes = orchestrator.run_sources(&sources).await;

    let output = CsvOutputAdapter::new(&config.storage.output_dir);
    let store = if skip_store {
        None
    } else {
        Some(open_store(config)?)
    };

    let mut all_summaries = Vec::new();
    let mut failed = Vec::new();

    for outcome in outcomes {
        let bank = outcome.bank;
        let run = match outcome.result {
            Ok(run) => run,
            Err(e) => {
                error!(bank = %bank, error = %e, "Bank pipeline failed");
                println!("❌ {} failed: {}", bank, e);
                failed.push(bank);
                continue;
            }
        };

        print_bank_run(&bank, &run);

        let path = output
            .write_enriched(&bank, &run.output.reviews)
            .with_context(|| format!("Failed to write enriched reviews for {}", bank))?;
        println!("   Output file: {}", path.display());

        if let Some(store) = &store {
            let reviews = &run.output.reviews;
            match store_and_verify(store, &bank, reviews, &run.output.summaries).await {
                Ok(verified) => {
                    println!(
                        "   Stored: {} new, {} already present ({} rows for bank)",
                        verified.outcome.inserted, verified.outcome.skipped, verified.stored
                    );
                    if !verified.is_complete(reviews.len()) {
                        warn!(
                            bank = %bank,
                            stored = verified.stored,
                            expected = reviews.len(),
                            "Stored row count below enriched count"
                        );
                    }
                }
                Err(e) => {
                    error!(bank = %bank, error = %e, "Storing bank batch failed");
                    println!("❌ {} could not be stored: {}", bank, e);
                    failed.push(bank.clone());
                }
            }
        }

        all_summaries.extend(run.output.summaries);
    }

    if !all_summaries.is_empty() {
        let path = output
            .write_summaries(SUMMARY_FILE, &all_summaries)
            .context("Failed to write rating summaries")?;
        println!("\n📈 Rating summaries: {}", path.display());
    }

    if failed.is_empty() {
        println!("\n✅ All {} banks processed", selected.len());
        Ok(true)
    } else {
        println!(
            "\n❌ {} of {} banks failed: {}",
            failed.len(),
            selected.len(),
            failed.join(", ")
        );
        Ok(false)
    }
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = &config.storage.database_path;
    SqliteStore::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn run_validation(config: &Config, data_dir: Option<PathBuf>, json: bool) -> anyhow::Result<bool> {
    let data_dir = data_dir.unwrap_or_else(|| config.pipeline.data_dir.clone());
    let validation = validate_dataset(&data_dir, &config.bank_sources())
        .with_context(|| format!("Failed to validate {}", data_dir.display()))?;
    let passed = validation
        .metrics
        .as_ref()
        .is_some_and(|m| m.all_files_present);

    if json {
        println!("{}", validation.to_json()?);
        return Ok(passed);
    }

    println!("\n🔎 Dataset validation for {}:", data_dir.display());
    for file in &validation.files {
        println!(
            "   {}: {} reviews, {} missing ({:.2}%), {} duplicates, dates {}",
            file.bank,
            file.reviews,
            file.missing_values,
            file.missing_pct,
            file.duplicates,
            if file.date_format_ok { "ISO" } else { "not ISO" }
        );
    }
    for missing in &validation.missing_files {
        println!("   ⚠️  Missing file: {}", missing);
    }

    match &validation.metrics {
        Some(m) => {
            println!("\n📋 Totals:");
            println!("   Reviews: {}", m.total_reviews);
            println!("   Missing values: {:.2}%", m.overall_missing_pct);
            println!("   Duplicates: {}", m.total_duplicates);
            println!("   All files present: {}", m.all_files_present);
            Ok(m.all_files_present)
        }
        None => {
            println!("❌ No review files could be read");
            Ok(false)
        }
    }
}

fn print_report(report: &BankReport) {
    let overview = &report.overview;
    println!("\n📊 Insights for {}:", overview.bank);
    println!("   Reviews: {}", overview.review_count);
    println!("   Mean sentiment: {:.3}", overview.mean_sentiment_score);
    println!(
        "   Positive/neutral/negative: {}/{}/{}",
        overview.positive, overview.neutral, overview.negative
    );

    println!("\n🏷️  Themes:");
    for (theme, count) in &report.theme_counts {
        println!("   {}: {}", theme, count);
    }

    for (theme, texts) in &report.examples {
        println!("\n💬 {}:", theme);
        for text in texts {
            println!("   - {}", text);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let _log_guard = logging::init_logging(&config.storage.log_dir);

    match observability::init_from_env() {
        Ok(true) => info!("Prometheus exporter started"),
        Ok(false) => {}
        Err(e) => warn!("Metrics exporter not started: {}", e),
    }

    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("review_pipeline", run_id = %run_id);

    let success = match cli.command {
        Commands::Run {
            banks,
            data_dir,
            skip_store,
        } => {
            println!("🔄 Running review pipeline...");
            run_pipeline(&config, banks, data_dir, skip_store)
                .instrument(span)
                .await?
        }
        Commands::Validate { data_dir, json } => {
            let _enter = span.enter();
            run_validation(&config, data_dir, json)?
        }
        Commands::Dump { output } => {
            let path = output.unwrap_or_else(|| config.storage.dump_path.clone());
            let store = open_store(&config)?;
            let stats = SqlDumper::new(&store)
                .write_to(&path)
                .instrument(span)
                .await
                .context("Failed to write SQL dump")?;
            println!(
                "✅ Dumped {} banks, {} reviews, {} summaries to {}",
                stats.banks,
                stats.reviews,
                stats.summaries,
                path.display()
            );
            true
        }
        Commands::Report {
            bank,
            examples,
            json,
        } => {
            let _enter = span.enter();
            let mut names: Vec<String> = select_banks(&config, bank.as_deref())
                .into_iter()
                .map(|b| b.name)
                .collect();
            if names.is_empty() {
                // Not configured; read the enriched file for the name as given
                names.extend(bank);
            }
            let adapter = CsvOutputAdapter::new(&config.storage.output_dir);
            for name in &names {
                let reviews = adapter
                    .read_enriched(name)
                    .with_context(|| format!("Failed to read enriched reviews for {}", name))?;
                let report = BankReport::build(name, &reviews, examples)?;
                if json {
                    // One object per line
                    println!("{}", report.to_json()?);
                } else {
                    print_report(&report);
                }
            }
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
