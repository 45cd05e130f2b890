use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnloopError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid subject identifier: {0}")]
    InvalidSubject(String),

    #[error("An analysis run is already in progress for FID {0}")]
    RunInProgress(u64),

    #[error("Invalid run transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<config::ConfigError> for UnloopError {
    fn from(err: config::ConfigError) -> Self {
        UnloopError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UnloopError>;
