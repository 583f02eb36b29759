use flushbatch::{Batcher, Config, FlushItem, FlushResult};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The entry point of the flushbatch demo.
///
/// Loads the configuration, builds a batcher whose handler pretends to write
/// each batch somewhere slow, enqueues a run of integers (cancelling one of
/// them), drains the batcher and prints every item's outcome.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // The config path can be overridden by the first argument.
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&path)?;
    info!("flushbatch starting with config: {:?}", config);

    let latency = Duration::from_millis(config.demo.handler_latency_ms);
    // Only even items get a value back; odd ones settle with `None`.
    let handler = move |items: Vec<FlushItem<u64>>| async move {
        info!(size = items.len(), "writing batch");
        tokio::time::sleep(latency).await;
        let results: Vec<FlushResult<u64>> = items
            .into_iter()
            .filter(|item| item.data % 2 == 0)
            .map(|item| FlushResult::new(item.id, item.data * item.data))
            .collect();
        Ok::<_, anyhow::Error>(Some(results))
    };
    let batcher: Batcher<u64, u64> = Batcher::with_id_generator(config.batcher.clone(), handler, |n: &u64| {
        format!("item-{n}")
    })?;

    let mut tickets = Vec::new();
    for n in 0..config.demo.items {
        let (ticket, cancel) = batcher.enqueue(n);
        if config.demo.cancel_index == Some(n) {
            cancel.cancel(Some(0));
        }
        tickets.push(ticket);
    }
    info!(
        pending_items = batcher.pending_items(),
        pending_flushes = batcher.amount_of_pending_flushes(),
        "all items enqueued"
    );

    for summary in batcher.drain().await {
        match summary {
            Ok(summary) => println!("{}", serde_json::to_string(&summary)?),
            Err(err) => println!("flush failed: {err}"),
        }
    }

    for ticket in tickets {
        let id = ticket.id().to_string();
        match ticket.await {
            Ok(Some(value)) => println!("{id}: {value}"),
            Ok(None) => println!("{id}: no result"),
            Err(err) => println!("{id}: {err}"),
        }
    }

    Ok(())
}
