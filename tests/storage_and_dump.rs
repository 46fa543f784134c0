use anyhow::Result;
use std::sync::Arc;
use tempfile::tempdir;

use review_pipeline::config::Config;
use review_pipeline::infra::{SqlDumper, SqliteStore};
use review_pipeline::pipeline::{BankPipeline, PipelineResources};
use review_pipeline::storage::ReviewStore;
use review_pipeline::types::RawReview;

fn rows() -> Vec<RawReview> {
    vec![
        RawReview::new("Great app, love transfers", 5, "2024-01-01", "BOA", "Google Play"),
        RawReview::new("App keeps crashing on login", 1, "2024-01-02", "BOA", "Google Play"),
        RawReview::new("It's okay I guess", 3, "2024-01-03", "BOA", "Google Play"),
    ]
}

#[tokio::test]
async fn test_rerun_into_database_adds_no_rows() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("db").join("reviews.db");
    let resources = Arc::new(PipelineResources::from_config(&Config::default())?);
    let run = BankPipeline::new(resources).run("BOA", &rows())?;

    {
        let store = SqliteStore::open(&db_path)?;
        let first = store
            .insert_bank_batch("BOA", &run.output.reviews, &run.output.summaries)
            .await?;
        assert_eq!(first.inserted, 3);
    }

    // Reopen to check the rows survived on disk
    let store = SqliteStore::open(&db_path)?;
    let second = store
        .insert_bank_batch("BOA", &run.output.reviews, &run.output.summaries)
        .await?;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(store.count_reviews(Some("BOA")).await?, 3);
    assert_eq!(store.summaries().await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_dump_contains_schema_and_rows() -> Result<()> {
    let dir = tempdir()?;
    let resources = Arc::new(PipelineResources::from_config(&Config::default())?);
    let run = BankPipeline::new(resources).run("BOA", &rows())?;

    let store = SqliteStore::open_in_memory()?;
    store
        .insert_bank_batch("BOA", &run.output.reviews, &run.output.summaries)
        .await?;

    let dump_path = dir.path().join("database_dump.sql");
    let stats = SqlDumper::new(&store).write_to(&dump_path).await?;
    assert_eq!(stats.banks, 1);
    assert_eq!(stats.reviews, 3);
    assert_eq!(stats.summaries, 3);

    let sql = std::fs::read_to_string(&dump_path)?;
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS banks"));
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS rating_summaries"));
    assert!(sql.contains("'It''s okay I guess'"));
    assert_eq!(sql.matches("INSERT INTO reviews").count(), 3);

    Ok(())
}
