//! Accumulator Module
//!
//! Owns the open group: pending items in arrival order plus the arrival time of
//! the first one. Pure bookkeeping, the handler is never called from here.

use super::item::PendingItem;
use std::mem;
use tokio::time::Instant;

/// Items accumulated since the last close.
pub(crate) struct Group<T, R> {
    pub(crate) items: Vec<PendingItem<T, R>>,
    /// Enqueue time of the first item, `None` while empty
    pub(crate) first_arrival: Option<Instant>,
}

impl<T, R> Group<T, R> {
    pub(crate) fn empty() -> Self {
        Self {
            items: Vec::new(),
            first_arrival: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub(crate) struct Accumulator<T, R> {
    group: Group<T, R>,
    max_size: usize,
}

impl<T, R> Accumulator<T, R> {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            group: Group::empty(),
            max_size,
        }
    }

    /// Add an item to the open group and return the new group size.
    pub(crate) fn append(&mut self, item: PendingItem<T, R>) -> usize {
        if self.group.first_arrival.is_none() {
            self.group.first_arrival = Some(item.enqueued_at);
        }
        self.group.items.push(item);
        self.group.items.len()
    }

    pub(crate) fn should_close_on_size(&self) -> bool {
        self.group.len() >= self.max_size
    }

    /// Take the open group, leaving an empty one behind.
    pub(crate) fn close_group(&mut self) -> Group<T, R> {
        mem::replace(&mut self.group, Group::empty())
    }

    pub(crate) fn len(&self) -> usize {
        self.group.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn item(id: &str, data: u32) -> PendingItem<u32, u32> {
        PendingItem::new(id.to_string(), data).0
    }

    #[test]
    fn test_append_preserves_order() {
        let mut acc = Accumulator::new(10);
        assert_eq!(acc.append(item("a", 1)), 1);
        assert_eq!(acc.append(item("b", 2)), 2);
        assert_eq!(acc.append(item("c", 3)), 3);

        let group = acc.close_group();
        let ids: Vec<&str> = group.items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_size_trigger_includes_triggering_item() {
        let mut acc = Accumulator::new(2);
        acc.append(item("a", 1));
        assert!(!acc.should_close_on_size());
        acc.append(item("b", 2));
        assert!(acc.should_close_on_size());
        assert_eq!(acc.close_group().len(), 2);
        assert!(!acc.should_close_on_size());
    }

    #[test]
    fn test_close_empty_group() {
        let mut acc: Accumulator<u32, u32> = Accumulator::new(3);
        let group = acc.close_group();
        assert!(group.is_empty());
        assert!(group.first_arrival.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_arrival_resets_only_on_close() {
        let mut acc = Accumulator::new(10);
        let first = item("a", 1);
        let first_at = first.enqueued_at;
        acc.append(first);

        tokio::time::advance(Duration::from_millis(30)).await;
        acc.append(item("b", 2));

        let group = acc.close_group();
        assert_eq!(group.first_arrival, Some(first_at));
        assert_eq!(acc.len(), 0);

        tokio::time::advance(Duration::from_millis(30)).await;
        let later = item("c", 3);
        let later_at = later.enqueued_at;
        acc.append(later);
        assert_eq!(acc.close_group().first_arrival, Some(later_at));
        assert!(later_at > first_at);
    }
}
