use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerAnalyticsError {
    #[error("Required field '{field}' has no column mapped")]
    MissingRequiredField { field: String },

    #[error("Field '{field}' is mapped to header '{header}', which is not present in the sheet")]
    UnknownHeader { field: String, header: String },

    #[error("Ledger export contains no rows")]
    EmptyDataset,

    #[error("Wildcard pattern '{pattern}' could not be compiled: {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Response belongs to a superseded request")]
    StaleResponse,

    #[error("Narrative generation failed: {0}")]
    NarrativeFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, LedgerAnalyticsError>;
