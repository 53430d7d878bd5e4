use thiserror::Error;

/// Failures delivering traces to the sink
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("trace ingestion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid Langfuse base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("trace ingestion rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
