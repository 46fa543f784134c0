use anyhow::Result;
use std::sync::Arc;
use tempfile::tempdir;

use review_pipeline::config::Config;
use review_pipeline::infra::CsvOutputAdapter;
use review_pipeline::pipeline::ingestion::CsvReviewSource;
use review_pipeline::pipeline::{PipelineOrchestrator, PipelineResources};
use review_pipeline::types::{ReviewSource, SentimentLabel};

const HEADER: &str = "review_text,rating,date,bank_name,source\n";

fn orchestrator() -> Result<PipelineOrchestrator> {
    let resources = PipelineResources::from_config(&Config::default())?;
    Ok(PipelineOrchestrator::new(Arc::new(resources)))
}

#[tokio::test]
async fn test_two_reviews_from_csv_export() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("boa.csv");
    std::fs::write(
        &path,
        format!(
            "{}\"Great app, love transfers\",5,2024-01-01,BOA,Google Play\n\
             App keeps crashing on login,1,2024-01-02,BOA,Google Play\n",
            HEADER
        ),
    )?;

    let sources: Vec<Arc<dyn ReviewSource>> = vec![Arc::new(CsvReviewSource::new("BOA", &path))];
    let mut outcomes = orchestrator()?.run_sources(&sources).await;
    assert_eq!(outcomes.len(), 1);
    let run = outcomes.remove(0).result?;

    let reviews = &run.output.reviews;
    assert_eq!(reviews.len(), 2);

    let first = &reviews[0];
    assert_eq!(first.sentiment.label, SentimentLabel::Positive);
    assert!(first.sentiment.score > 0.05);
    assert!(first.themes.contains("Transactions"));

    let second = &reviews[1];
    assert_eq!(second.sentiment.label, SentimentLabel::Negative);
    assert!(second.sentiment.score < -0.05);
    assert!(second.themes.contains("Performance") || second.themes.contains("Account Access"));

    let summaries = &run.output.summaries;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].rating, 1);
    assert!((summaries[0].mean_sentiment_score - second.sentiment.score).abs() < 1e-9);
    assert_eq!(summaries[1].rating, 5);
    assert!((summaries[1].mean_sentiment_score - first.sentiment.score).abs() < 1e-9);

    let adapter = CsvOutputAdapter::new(dir.path().join("output"));
    adapter.write_enriched("BOA", reviews)?;
    assert_eq!(&adapter.read_enriched("BOA")?, reviews);

    Ok(())
}

#[tokio::test]
async fn test_duplicates_and_missing_dates_are_removed() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("dashen.csv");
    std::fs::write(
        &path,
        format!(
            "{}Fast and reliable,5,2024-03-01,Dashen Bank,Google Play\n\
             Fast and reliable,5,2024-03-01,Dashen Bank,Google Play\n\
             No date on this one,3,,Dashen Bank,Google Play\n",
            HEADER
        ),
    )?;

    let sources: Vec<Arc<dyn ReviewSource>> =
        vec![Arc::new(CsvReviewSource::new("Dashen Bank", &path))];
    let mut outcomes = orchestrator()?.run_sources(&sources).await;
    let run = outcomes.remove(0).result?;

    assert_eq!(run.output.reviews.len(), 1);
    assert_eq!(run.normalization.total_rows, 3);
    assert_eq!(run.normalization.duplicates_removed, 1);
    assert_eq!(run.normalization.missing.date, 1);
    assert!(run
        .output
        .reviews
        .iter()
        .all(|r| r.review.text != "No date on this one"));

    Ok(())
}

#[tokio::test]
async fn test_missing_file_fails_only_that_bank() -> Result<()> {
    let dir = tempdir()?;
    let good = dir.path().join("good.csv");
    std::fs::write(&good, format!("{}Love it,5,2024-01-01,CBE,Google Play\n", HEADER))?;

    let sources: Vec<Arc<dyn ReviewSource>> = vec![
        Arc::new(CsvReviewSource::new("CBE", &good)),
        Arc::new(CsvReviewSource::new("BOA", dir.path().join("absent.csv"))),
    ];
    let outcomes = orchestrator()?.run_sources(&sources).await;

    assert_eq!(outcomes.len(), 2);
    let cbe = outcomes.iter().find(|o| o.bank == "CBE").unwrap();
    let boa = outcomes.iter().find(|o| o.bank == "BOA").unwrap();
    assert!(cbe.is_success());
    assert!(!boa.is_success());

    Ok(())
}
