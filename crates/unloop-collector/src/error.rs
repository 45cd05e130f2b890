use thiserror::Error;
use unloop_core::UnloopError;

/// Failure of a single upstream request. `Display` is the human-readable
/// cause written to the session log.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API Error ({0})")]
    Status(u16),

    #[error("Error: failed to decode response: {0}")]
    Decode(String),

    #[error("Error: unsupported response shape ({0})")]
    UnsupportedShape(String),

    #[error("Error: request cancelled")]
    Cancelled,
}

impl From<UpstreamError> for UnloopError {
    fn from(err: UpstreamError) -> Self {
        UnloopError::Upstream(err.to_string())
    }
}

pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;
