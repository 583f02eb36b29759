//! Pending flush registry
//!
//! Maps a flush unit's batch id to its completion future and, while the unit
//! is still dwelling, the trigger that fast-forwards its timer.

use crate::batch::FastForward;
use crate::{FlushError, FlushSummary, lock};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Settlement of a whole flush unit.
pub(crate) type UnitOutcome = Result<FlushSummary, FlushError>;

/// Completion future of a flush unit; any number of waiters may clone it.
pub(crate) type UnitFuture = Shared<BoxFuture<'static, UnitOutcome>>;

struct RegisteredFlush {
    fast_forward: Option<FastForward>,
    done: UnitFuture,
}

pub(crate) struct FlushRegistry {
    units: Mutex<HashMap<u64, RegisteredFlush>>,
}

impl FlushRegistry {
    pub(crate) fn new() -> Self {
        Self {
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new unit, returning the sender its task settles it through.
    pub(crate) fn register(
        &self,
        batch_id: u64,
        fast_forward: Option<FastForward>,
    ) -> oneshot::Sender<UnitOutcome> {
        let (settle, settled) = oneshot::channel();
        let done = settled
            .map(|outcome| outcome.unwrap_or(Err(FlushError::Abandoned)))
            .boxed()
            .shared();
        lock(&self.units).insert(batch_id, RegisteredFlush { fast_forward, done });
        debug!(batch_id, "flush registered");
        settle
    }

    /// Remove a unit. Returns `false` if it was not registered.
    pub(crate) fn deregister(&self, batch_id: u64) -> bool {
        let removed = lock(&self.units).remove(&batch_id).is_some();
        debug!(batch_id, removed, "flush deregistered");
        removed
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.units).len()
    }

    /// Fire every pending dwell trigger and snapshot the completion futures of
    /// all units registered right now.
    pub(crate) fn fast_forward_all(&self) -> Vec<UnitFuture> {
        let mut units = lock(&self.units);
        units
            .iter_mut()
            .map(|(batch_id, unit)| {
                if let Some(fast_forward) = unit.fast_forward.as_mut() {
                    if fast_forward.fire() {
                        debug!(batch_id, "dwell fast-forwarded");
                    }
                }
                unit.done.clone()
            })
            .collect()
    }
}
