//! Recent-search history, newest first, capped at [`MAX_SEARCHES`].

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::KeyValueStore;

/// Number of searches kept.
pub const MAX_SEARCHES: usize = 10;

const HISTORY_KEY: &str = "searches";

pub struct SearchHistory<'a, T> {
    store: &'a dyn KeyValueStore,
    _entry: std::marker::PhantomData<T>,
}

impl<'a, T> SearchHistory<'a, T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            _entry: std::marker::PhantomData,
        }
    }

    /// All stored entries, newest first. Unreadable history reads as empty.
    pub fn list(&self) -> Result<Vec<T>> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(MAX_SEARCHES);
                Ok(entries)
            }
            Err(e) => {
                warn!("Discarding unreadable search history: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Most recent entry, if any.
    pub fn last(&self) -> Result<Option<T>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Record a new search at the front, dropping the oldest past the cap.
    pub fn push(&self, entry: T) -> Result<()> {
        let mut entries = self.list()?;
        entries.insert(0, entry);
        entries.truncate(MAX_SEARCHES);
        self.write(&entries)
    }

    /// Remove the entry at `index` (0 = newest). Returns it if it existed.
    pub fn remove(&self, index: usize) -> Result<Option<T>> {
        let mut entries = self.list()?;
        if index >= entries.len() {
            return Ok(None);
        }
        let removed = entries.remove(index);
        self.write(&entries)?;
        Ok(Some(removed))
    }

    fn write(&self, entries: &[T]) -> Result<()> {
        let payload = serde_json::to_string(entries)?;
        self.store.set(HISTORY_KEY, &payload)
    }
}
