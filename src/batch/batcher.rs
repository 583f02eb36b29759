//! Batcher Module
//!
//! The public façade. `enqueue` appends to the accumulator and closes the group
//! when it reaches `max_size`, or arms the max-wait timer when the item opens a
//! new group. Every trigger check and its hand-off run under one lock, so
//! groups close in enqueue order no matter how many tasks enqueue at once.

use super::accumulator::{Accumulator, Group};
use super::coordinator::FlushCoordinator;
use super::handler::FlushHandler;
use super::item::{CancelHandle, ItemTicket, PendingItem};
use crate::registry::FlushRegistry;
use crate::{BatcherConfig, BatcherError, FlushError, FlushSummary, IdGenerator, lock, random_id};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tracing::{debug, info, warn};

/// Coalesces individually enqueued items into batches for a flush handler.
///
/// Clones share the same open group, timers and in-flight flushes.
pub struct Batcher<T, R> {
    inner: Arc<Inner<T, R>>,
}

impl<T, R> Clone for Batcher<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T, R> {
    config: BatcherConfig,
    gen_id: IdGenerator<T>,
    open: Mutex<OpenGroup<T, R>>,
    coordinator: FlushCoordinator<T, R>,
    registry: Arc<FlushRegistry>,
    runtime: Handle,
}

/// Accumulator plus the max-wait timer armed for its current group.
struct OpenGroup<T, R> {
    accumulator: Accumulator<T, R>,
    max_wait: Option<JoinHandle<()>>,
    /// Bumped on every close so a stale timer cannot close a newer group
    generation: u64,
}

impl<T, R> OpenGroup<T, R> {
    fn close(&mut self) -> Group<T, R> {
        if let Some(timer) = self.max_wait.take() {
            timer.abort();
        }
        self.generation += 1;
        self.accumulator.close_group()
    }
}

impl<T, R> Batcher<T, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Create a batcher that ids items with random UUIDs.
    ///
    /// Must be called from within a tokio runtime; timers and flushes are
    /// spawned onto it.
    pub fn new(config: BatcherConfig, handler: impl FlushHandler<T, R>) -> Result<Self, BatcherError> {
        Self::with_id_generator(config, handler, random_id::<T>)
    }

    /// Create a batcher with a custom id generator.
    pub fn with_id_generator(
        config: BatcherConfig,
        handler: impl FlushHandler<T, R>,
        gen_id: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Result<Self, BatcherError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| BatcherError::NoRuntime)?;
        let registry = Arc::new(FlushRegistry::new());
        let coordinator = FlushCoordinator::new(
            Arc::new(handler),
            Arc::clone(&registry),
            config.min_time(),
            runtime.clone(),
        );
        debug!(
            max_size = config.max_size,
            max_time_ms = config.max_time_ms,
            min_time_ms = config.min_time_ms,
            "batcher created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                open: Mutex::new(OpenGroup {
                    accumulator: Accumulator::new(config.max_size),
                    max_wait: None,
                    generation: 0,
                }),
                config,
                gen_id: Arc::new(gen_id),
                coordinator,
                registry,
                runtime,
            }),
        })
    }

    /// Queue one item.
    ///
    /// Returns a ticket resolving once the item is settled, and a handle that
    /// settles it early with a value of the caller's choosing.
    pub fn enqueue(&self, data: T) -> (ItemTicket<R>, CancelHandle<R>) {
        let id = (self.inner.gen_id)(&data);
        let (item, ticket, cancel) = PendingItem::new(id, data);
        let enqueued_at = item.enqueued_at;

        let mut open = lock(&self.inner.open);
        let len = open.accumulator.append(item);
        if open.accumulator.should_close_on_size() {
            debug!(len, "size trigger reached");
            let group = open.close();
            self.inner.coordinator.schedule_flush(group);
        } else if len == 1 {
            let generation = open.generation;
            let inner = Arc::clone(&self.inner);
            let deadline = enqueued_at + inner.config.max_time();
            open.max_wait = Some(self.inner.runtime.spawn(async move {
                sleep_until(deadline).await;
                inner.close_on_timeout(generation);
            }));
        }

        (ticket, cancel)
    }

    /// Number of flushes created but not yet settled.
    pub fn amount_of_pending_flushes(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of items in the open group.
    pub fn pending_items(&self) -> usize {
        lock(&self.inner.open).accumulator.len()
    }

    /// Flush everything and wait for it to settle.
    ///
    /// The call itself closes the open group regardless of its size or age,
    /// cuts every pending minimum dwell short and snapshots the flushes
    /// registered at that moment; the returned future waits for that snapshot
    /// only. Flushes created after the call keep their own dwell and are not
    /// awaited. Flush failures are logged, never returned.
    pub fn wait_for_all(&self) -> impl Future<Output = ()> + Send + use<T, R> {
        let drained = self.drain();
        async move {
            let outcomes = drained.await;
            let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
            if failed > 0 {
                warn!(flushes = outcomes.len(), failed, "batcher drained with failed flushes");
            } else {
                info!(flushes = outcomes.len(), "batcher drained");
            }
        }
    }

    /// Like [`Batcher::wait_for_all`], returning the outcome of each awaited flush.
    pub fn drain(
        &self,
    ) -> impl Future<Output = Vec<Result<FlushSummary, FlushError>>> + Send + use<T, R> {
        let pending = {
            let mut open = lock(&self.inner.open);
            let group = open.close();
            self.inner.coordinator.schedule_flush(group);
            // Still under `open`: no enqueue can register a unit in between.
            self.inner.registry.fast_forward_all()
        };
        debug!(flushes = pending.len(), "waiting for in-flight flushes");
        futures::future::join_all(pending)
    }
}

impl<T, R> Inner<T, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    fn close_on_timeout(&self, generation: u64) {
        let mut open = lock(&self.open);
        if open.generation != generation {
            return;
        }
        // Detach instead of aborting: this is the timer's own task.
        open.max_wait = None;
        debug!(len = open.accumulator.len(), "max wait elapsed");
        let group = open.close();
        self.coordinator.schedule_flush(group);
    }
}
