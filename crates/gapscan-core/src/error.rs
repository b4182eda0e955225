use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GapScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    #[error("Enhancement already running for flow {0}")]
    ConcurrentEnhancement(Uuid),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, GapScanError>;
