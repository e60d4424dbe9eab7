use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use parking_lot::Mutex;

use crate::api::UserId;

/// Small string key-value store that survives restarts of the client
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

pub fn last_activity_key(user: &UserId) -> String {
    format!("lastActivity-{user}")
}

pub fn search_history_key(user: &UserId) -> String {
    format!("agora-search-history-{user}")
}

pub const EMAIL_FOR_SIGN_IN_KEY: &str = "emailForSignIn";

#[derive(Debug, Default)]
pub struct MemoryStorage(Mutex<BTreeMap<String, String>>);

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0.lock().insert(String::from(key), String::from(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.0.lock().remove(key);
        Ok(())
    }
}

/// Keeps all entries in one JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<JsonFileStorage> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)
                .with_context(|| format!("parsing local storage file {path:?}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading local storage file {path:?}"))
            }
        };
        Ok(JsonFileStorage {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(entries).context("serializing local storage")?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("writing local storage file {:?}", self.path))
    }
}

impl LocalStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(String::from(key), String::from(value));
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
