use std::sync::Arc;

use crate::{
    api::UserId,
    storage::{search_history_key, LocalStorage},
};

/// Recent topic searches of one user, most recent first
pub struct SearchHistory {
    storage: Arc<dyn LocalStorage>,
    key: String,
    max_len: usize,
}

impl SearchHistory {
    pub fn new(storage: Arc<dyn LocalStorage>, user: &UserId, max_len: usize) -> SearchHistory {
        SearchHistory {
            storage,
            key: search_history_key(user),
            max_len,
        }
    }

    pub fn entries(&self) -> Vec<String> {
        let Some(data) = self.storage.get(&self.key) else {
            return Vec::new();
        };
        match serde_json::from_str(&data) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(?err, key = %self.key, "ignoring unreadable search history");
                Vec::new()
            }
        }
    }

    /// Puts `search` at the front, dropping older duplicates and the entries
    /// past the maximum length
    pub fn record(&self, search: &str) -> anyhow::Result<()> {
        let search = search.trim();
        if search.is_empty() {
            return Ok(());
        }
        let mut entries = self.entries();
        entries.retain(|e| e != search);
        entries.insert(0, String::from(search));
        entries.truncate(self.max_len);
        self.storage.set(&self.key, &serde_json::to_string(&entries)?)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.storage.remove(&self.key)
    }
}
