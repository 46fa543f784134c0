// Review pipeline: ingestion, processing, and per-bank orchestration

pub mod ingestion;
pub mod orchestrator;
pub mod processing;

pub use orchestrator::{
    BankBatch, BankOutcome, BankOutput, BankPipeline, BankRun, PipelineOrchestrator,
    PipelineResources,
};
