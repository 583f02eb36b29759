//! Flush Coordinator Module
//!
//! Turns closed groups into flush units and drives each unit to settlement.
//!
//! # Unit Lifecycle
//! 1. Drop items that were cancelled before the flush was scheduled
//! 2. Register the unit (with its dwell trigger, if any) in the registry
//! 3. Wait out the remaining minimum dwell, unless fast-forwarded
//! 4. Invoke the flush handler with the surviving items
//! 5. Settle every item from the handler's outcome
//! 6. Deregister the unit and publish its summary

use super::accumulator::Group;
use super::handler::FlushHandler;
use super::item::{PendingItem, SettleSlot};
use super::dwell;
use crate::registry::{FlushRegistry, UnitOutcome};
use crate::{FlushError, FlushItem, FlushSummary};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub(crate) struct FlushCoordinator<T, R> {
    handler: Arc<dyn FlushHandler<T, R>>,
    registry: Arc<FlushRegistry>,
    min_time: Duration,
    /// Next batch id to assign (starts at 1)
    next_batch_id: AtomicU64,
    runtime: Handle,
}

impl<T, R> FlushCoordinator<T, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    pub(crate) fn new(
        handler: Arc<dyn FlushHandler<T, R>>,
        registry: Arc<FlushRegistry>,
        min_time: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            handler,
            registry,
            min_time,
            next_batch_id: AtomicU64::new(1),
            runtime,
        }
    }

    /// Hand a closed group to a new flush unit.
    ///
    /// Returns the unit's batch id, or `None` when there was nothing left to
    /// flush and no unit was created.
    pub(crate) fn schedule_flush(&self, group: Group<T, R>) -> Option<u64> {
        if group.is_empty() {
            return None;
        }

        let total = group.len();
        let first_arrival = group.first_arrival.unwrap_or_else(Instant::now);
        let survivors: Vec<PendingItem<T, R>> = group
            .items
            .into_iter()
            .filter(|item| {
                if item.is_cancelled() {
                    debug!(id = item.id(), "dropping cancelled item from batch");
                    return false;
                }
                true
            })
            .collect();
        let cancelled_count = total - survivors.len();

        if survivors.is_empty() {
            debug!(cancelled_count, "every item was cancelled, skipping flush");
            return None;
        }

        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        let dwell_until = first_arrival + self.min_time;
        let remaining_dwell = dwell_until.saturating_duration_since(Instant::now());
        let (timer, fast_forward) = if remaining_dwell.is_zero() {
            (None, None)
        } else {
            let (timer, fast_forward) = dwell(dwell_until);
            (Some(timer), Some(fast_forward))
        };

        let settle = self.registry.register(batch_id, fast_forward);
        debug!(
            batch_id,
            items = survivors.len(),
            cancelled_count,
            dwell_ms = remaining_dwell.as_millis() as u64,
            "flush scheduled"
        );

        let handler = Arc::clone(&self.handler);
        let guard = Deregister {
            registry: Arc::clone(&self.registry),
            batch_id,
        };
        self.runtime.spawn(async move {
            if let Some(timer) = timer {
                if timer.wait().await {
                    debug!(batch_id, "dwell cut short by shutdown");
                }
            }
            let outcome = run_flush(
                handler.as_ref(),
                batch_id,
                survivors,
                cancelled_count,
                remaining_dwell,
            )
            .await;
            drop(guard);
            // Nobody may be waiting on the unit; that is fine.
            let _ = settle.send(outcome);
        });

        Some(batch_id)
    }
}

/// Removes a unit from the registry when its task ends, even by panic.
struct Deregister {
    registry: Arc<FlushRegistry>,
    batch_id: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.registry.deregister(self.batch_id);
    }
}

async fn run_flush<T, R>(
    handler: &dyn FlushHandler<T, R>,
    batch_id: u64,
    items: Vec<PendingItem<T, R>>,
    cancelled_count: usize,
    dwell: Duration,
) -> UnitOutcome
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    let now = Instant::now();
    let (inputs, slots): (Vec<FlushItem<T>>, Vec<Arc<SettleSlot<R>>>) =
        items.into_iter().map(|item| item.into_flush_item(now)).unzip();
    let item_count = inputs.len();

    match handler.flush(inputs).await {
        Err(err) => {
            let err = FlushError::handler(err);
            warn!(batch_id, item_count, "flush failed: {}", err);
            for slot in slots.iter().filter(|slot| !slot.is_cancelled()) {
                slot.settle(Err(err.clone()));
            }
            Err(err)
        }
        Ok(results) => {
            // Last entry per id wins; every item carrying that id gets it.
            let by_id: HashMap<String, R> = results
                .unwrap_or_default()
                .into_iter()
                .map(|result| (result.id, result.data))
                .collect();

            let mut resolved_count = 0;
            for slot in &slots {
                let value = by_id.get(slot.id()).cloned();
                if value.is_some() {
                    resolved_count += 1;
                }
                slot.settle(Ok(value));
            }

            info!(
                batch_id,
                item_count, resolved_count, cancelled_count, "flush completed"
            );
            Ok(FlushSummary {
                batch_id,
                item_count,
                cancelled_count,
                resolved_count,
                dwell_ms: dwell.as_millis() as u64,
                flushed_at: chrono::Utc::now(),
            })
        }
    }
}
