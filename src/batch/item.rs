//! Pending Item Module
//!
//! A queued item is split in two halves that share one settlement slot:
//! the `PendingItem` travels through the accumulator and into a flush unit,
//! while the caller keeps an `ItemTicket` to await and a `CancelHandle`.
//! Whoever settles the slot first wins; every later attempt is a no-op.

use crate::{FlushError, FlushItem, lock};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

/// Final outcome of one item. `Ok(None)` means no value was provided for it.
pub type Settlement<R> = Result<Option<R>, FlushError>;

pub(crate) struct SettleSlot<R> {
    id: String,
    cancelled: Arc<AtomicBool>,
    sender: Mutex<Option<oneshot::Sender<Settlement<R>>>>,
}

impl<R> SettleSlot<R> {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` if this call settled the item.
    pub(crate) fn settle(&self, outcome: Settlement<R>) -> bool {
        let Some(sender) = lock(&self.sender).take() else {
            return false;
        };
        // The ticket may have been dropped; the item counts as settled anyway.
        let _ = sender.send(outcome);
        true
    }
}

/// An item waiting in the open group or in a flush unit.
pub(crate) struct PendingItem<T, R> {
    pub(crate) data: T,
    pub(crate) enqueued_at: Instant,
    pub(crate) slot: Arc<SettleSlot<R>>,
}

impl<T, R> PendingItem<T, R> {
    pub(crate) fn new(id: String, data: T) -> (Self, ItemTicket<R>, CancelHandle<R>) {
        let (sender, receiver) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(SettleSlot {
            id: id.clone(),
            cancelled: Arc::clone(&cancelled),
            sender: Mutex::new(Some(sender)),
        });
        let cancel = CancelHandle {
            id: id.clone(),
            cancelled,
            slot: Arc::downgrade(&slot),
        };
        let item = Self {
            data,
            enqueued_at: Instant::now(),
            slot,
        };
        (item, ItemTicket { id, receiver }, cancel)
    }

    pub(crate) fn id(&self) -> &str {
        self.slot.id()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.slot.is_cancelled()
    }

    /// Re-stamp the item for the handler, keeping the slot for settlement.
    pub(crate) fn into_flush_item(self, now: Instant) -> (FlushItem<T>, Arc<SettleSlot<R>>) {
        let delta = now.saturating_duration_since(self.enqueued_at);
        let item = FlushItem {
            id: self.slot.id().to_string(),
            data: self.data,
            delta_ms: delta.as_millis() as u64,
        };
        (item, self.slot)
    }
}

/// Future resolving to the item's settlement.
///
/// Resolves to `Ok(Some(value))` when the handler (or a cancel) provided a
/// value, `Ok(None)` when no value was provided for this item, and `Err` when
/// the flush failed.
#[derive(Debug)]
pub struct ItemTicket<R> {
    id: String,
    receiver: oneshot::Receiver<Settlement<R>>,
}

impl<R> ItemTicket<R> {
    /// Id assigned to the item at enqueue time.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<R> Future for ItemTicket<R> {
    type Output = Settlement<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(FlushError::Abandoned)))
    }
}

/// Caller-held handle that settles an item early.
///
/// Cancelling does not remove the item from its group; a group drops its
/// cancelled items when its flush is scheduled. The handle only holds a weak
/// reference, so it never keeps an abandoned item's ticket waiting.
pub struct CancelHandle<R> {
    id: String,
    cancelled: Arc<AtomicBool>,
    slot: Weak<SettleSlot<R>>,
}

impl<R> Clone for CancelHandle<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            cancelled: Arc::clone(&self.cancelled),
            slot: Weak::clone(&self.slot),
        }
    }
}

impl<R> CancelHandle<R> {
    /// Mark the item cancelled and settle it with `value`.
    ///
    /// Returns `false` if the item had already been settled, by an earlier
    /// cancel or by its flush; the value is discarded in that case.
    pub fn cancel(&self, value: Option<R>) -> bool {
        self.cancelled.store(true, Ordering::Release);
        // A dead slot means the flush already settled (or abandoned) the item.
        let settled = match self.slot.upgrade() {
            Some(slot) => slot.settle(Ok(value)),
            None => false,
        };
        debug!(id = %self.id, settled, "item cancelled");
        settled
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}
