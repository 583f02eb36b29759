//! Flush Handler Module
//!
//! The flush handler performs the actual batched work. It is supplied by the
//! caller; the batcher only decides when to call it and settles items from
//! its outcome. Any `Fn(Vec<FlushItem<T>>) -> impl Future` closure is a handler.

use crate::{FlushItem, FlushOutcome};
use async_trait::async_trait;
use std::future::Future;

/// Processes one closed group.
///
/// Items arrive in enqueue order. Return `Ok(None)` when there is nothing to
/// report per item, `Ok(Some(results))` to give individual items a value
/// (matched by id), or `Err` to fail every item in the batch.
#[async_trait]
pub trait FlushHandler<T, R>: Send + Sync + 'static {
    async fn flush(&self, items: Vec<FlushItem<T>>) -> FlushOutcome<R>;
}

#[async_trait]
impl<T, R, F, Fut> FlushHandler<T, R> for F
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<FlushItem<T>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FlushOutcome<R>> + Send + 'static,
{
    async fn flush(&self, items: Vec<FlushItem<T>>) -> FlushOutcome<R> {
        (self)(items).await
    }
}
