use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An item as seen by the flush handler
///
/// `delta_ms` is the time the item spent queued, measured when the handler
/// is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushItem<T> {
    pub id: String,
    pub data: T,
    pub delta_ms: u64,
}

/// Explicit per-item result returned by the flush handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushResult<R> {
    pub id: String,
    pub data: R,
}

impl<R> FlushResult<R> {
    pub fn new(id: impl Into<String>, data: R) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// What a flush handler resolves to
///
/// `Ok(None)` settles every item with `None`. `Ok(Some(results))` settles each
/// item with the result carrying its id, or `None` when there is no such entry.
pub type FlushOutcome<R> = anyhow::Result<Option<Vec<FlushResult<R>>>>;

/// Produces the id of an item from its data.
pub type IdGenerator<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Default id generator: a random v4 UUID per item.
pub fn random_id<T>(_data: &T) -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Report of one completed flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushSummary {
    /// Sequential id of the flush, starting at 1
    pub batch_id: u64,
    /// Items handed to the handler
    pub item_count: usize,
    /// Items dropped from the batch because they were cancelled before the flush started
    pub cancelled_count: usize,
    /// Items the handler returned an explicit result for
    pub resolved_count: usize,
    /// Minimum-dwell wait scheduled before the handler ran
    pub dwell_ms: u64,
    pub flushed_at: DateTime<Utc>,
}
