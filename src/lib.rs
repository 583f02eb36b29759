//! This crate implements an in-process batching primitive.
//! Callers enqueue individual items and get back a future that resolves once the
//! item has been grouped with others and processed by a caller-supplied flush handler.
//! Groups close on size or after a maximum wait, may dwell for a minimum time
//! before flushing, and can be drained on shutdown.

pub mod types; // Items handed to and returned from the flush handler.
pub mod error; // Error types for settlement, construction and configuration.
pub mod config; // Batcher settings and TOML loading.
pub mod batch; // Accumulator, flush coordinator and the `Batcher` façade.
mod registry; // Live set of in-flight flushes.

use std::sync::{Mutex, MutexGuard};

// Re-export the public surface for easier access.
pub use batch::{Batcher, CancelHandle, FlushHandler, ItemTicket, Settlement};
pub use config::{BatcherConfig, Config};
pub use error::{BatcherError, ConfigError, FlushError};
pub use types::*;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering poisoned batcher lock");
        poisoned.into_inner()
    })
}
