pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod types;

// Adapters for the relational store and output files
pub mod infra;
