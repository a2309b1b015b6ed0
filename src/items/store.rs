use chrono::Local;
use parking_lot::RwLock;
use tracing::debug;

use crate::items::item::{CREATED_AT_FORMAT, Item, NewItem};

/// In-memory, append-only collection of items.
///
/// Identifier allocation and the append happen under one write lock, so readers
/// always see a gap-free, creation-ordered sequence.
#[derive(Debug)]
pub struct ItemStore {
    inner: RwLock<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    next_id: u64,
    items: Vec<Item>,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore {
    /// An empty store whose first item gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState {
                next_id: 1,
                items: Vec::new(),
            }),
        }
    }

    /// All items in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Item> {
        self.inner.read().items.clone()
    }

    /// Assigns the next identifier to `new_item`, stamps it with the current local time and appends it.
    pub fn add(&self, new_item: NewItem) -> Item {
        let created_at = Local::now().format(CREATED_AT_FORMAT).to_string();
        let mut state = self.inner.write();
        let id = state.next_id;
        state.next_id += 1;
        let item = new_item.into_item(id, created_at);
        state.items.push(item.clone());
        debug!(id, title = %item.title, "stored item");
        item
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use crate::items::{item::NewItem, store::ItemStore};

    fn submission(title: &str) -> NewItem {
        NewItem::new(title, "description", "", "", "").unwrap()
    }

    #[test]
    fn empty_store_lists_nothing() {
        let store = ItemStore::new();
        assert!(store.list().is_empty());
    }

    #[test]
    fn ids_start_at_one_and_follow_insertion_order() {
        let store = ItemStore::new();
        let first = store.add(submission("umbrella"));
        let second = store.add(submission("scarf"));

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let titles: Vec<_> = store.list().into_iter().map(|item| item.title).collect();
        assert_eq!(titles, ["umbrella", "scarf"]);
    }

    #[test]
    fn created_at_has_minute_precision_format() {
        let store = ItemStore::new();
        let item = store.add(submission("phone"));

        assert!(chrono::NaiveDateTime::parse_from_str(&item.created_at, "%Y-%m-%d %H:%M").is_ok());
        assert_eq!(item.created_at.len(), 16);
    }

    #[test]
    fn concurrent_adds_never_share_an_id() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;
        let store = Arc::new(ItemStore::new());

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| store.add(submission(&format!("{t}-{i}"))).id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();

        let total = (THREADS * PER_THREAD) as u64;
        assert_eq!(ids.len() as u64, total);
        let listed: Vec<u64> = store.list().iter().map(|item| item.id).collect();
        assert_eq!(listed, (1..=total).collect::<Vec<_>>());
    }
}
