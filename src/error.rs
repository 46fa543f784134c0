use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("Bank '{bank}' has no validated reviews")]
    EmptyBatch { bank: String },

    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::SinkWrite(err.to_string())
    }
}

impl PipelineError {
    /// Short label used in metrics and run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MalformedRecord { .. } => "malformed_record",
            PipelineError::EmptyBatch { .. } => "empty_batch",
            PipelineError::SinkWrite(_) => "sink_write",
            PipelineError::Csv(_) => "csv",
            PipelineError::Json(_) => "json",
            PipelineError::Toml(_) => "toml",
            PipelineError::Io(_) => "io",
            PipelineError::Config(_) => "config",
            PipelineError::MissingColumn(_) => "missing_column",
            PipelineError::Env(_) => "env",
            PipelineError::Task(_) => "task",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
