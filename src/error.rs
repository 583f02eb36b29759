//! Error types
//!
//! `FlushError` is what an item (or a flush unit) settles with when it does not
//! get a value. It is `Clone` so one handler failure can be delivered to every
//! item of the batch and to the unit itself.

use std::sync::Arc;
use thiserror::Error;

/// Failure outcome of a flush or of a single queued item.
#[derive(Debug, Clone, Error)]
pub enum FlushError {
    /// The flush handler returned an error. Shared by every item of the batch.
    #[error("flush handler failed: {0}")]
    Handler(Arc<anyhow::Error>),
    /// The settlement channel closed without a value, e.g. the runtime shut
    /// down or the flush task panicked.
    #[error("item was abandoned before it was settled")]
    Abandoned,
}

impl FlushError {
    pub fn handler(err: anyhow::Error) -> Self {
        FlushError::Handler(Arc::new(err))
    }

    /// The handler's error, if this is a handler failure.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            FlushError::Handler(err) => Some(err.as_ref()),
            FlushError::Abandoned => None,
        }
    }
}

/// Errors raised while constructing a `Batcher`.
#[derive(Debug, Error)]
pub enum BatcherError {
    #[error("invalid batcher configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("a batcher must be created inside a tokio runtime")]
    NoRuntime,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_size must be greater than zero")]
    ZeroMaxSize,
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
