//! Batching Module
//!
//! This module handles accumulation and flushing of queued items:
//! - Accumulator: Holds the open group and its size trigger
//! - FlushCoordinator: Turns closed groups into flush units and settles their items
//! - Trigger: Cancellable minimum-dwell timer, fast-forwarded on shutdown
//! - Batcher: The public façade tying them together

mod accumulator;
mod batcher;
mod coordinator;
mod handler;
mod item;
mod trigger;


pub use batcher::Batcher;
pub use handler::FlushHandler;
pub use item::{CancelHandle, ItemTicket, Settlement};
pub(crate) use trigger::{FastForward, dwell};
