//! Storage port for recap.
//!
//! The fetch and summarize code never touches storage. Everything that has
//! to survive a run (last used credentials, recent searches) goes through a
//! [`KeyValueStore`] handed to the application layer:
//!
//! - [`MemoryStore`] for tests and one-shot runs
//! - [`FileStore`], a single JSON object on disk
//! - [`CredentialVault`] and [`SearchHistory`] layered on top of either

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

pub mod history;

pub use history::{SearchHistory, MAX_SEARCHES};

/// Minimal string key/value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object file.
///
/// Every write rewrites the whole file through a temp file + rename, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory: {:?}", parent))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read store: {:?}", self.path))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse store: {:?}", self.path))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, payload).with_context(|| format!("failed to write store: {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace store: {:?}", self.path))?;
        debug!("Wrote {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Which secret a vault entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Secret {
    /// Token for the chat provider's REST API.
    ChatToken,
    /// Bearer token for the summarization endpoint.
    SummaryToken,
}

impl Secret {
    pub fn as_str(&self) -> &'static str {
        match self {
            Secret::ChatToken => "chat",
            Secret::SummaryToken => "summary",
        }
    }

    fn key(&self) -> String {
        format!("last_{}_token", self.as_str())
    }
}

/// Last-used credentials, as remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub channel_id: String,
    pub chat_token: String,
    pub summary_token: String,
}

/// Remembers the last channel and tokens the user ran with.
///
/// Tokens are base64-encoded at rest. That keeps them out of casual view in
/// the store file; it is not encryption.
pub struct CredentialVault<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> CredentialVault<'a> {
    const CHANNEL_KEY: &'static str = "last_channel_id";

    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        debug!(
            "Saving credentials (channel: {}, chat token: {}, summary token: {})",
            if credentials.channel_id.is_empty() { "none" } else { "set" },
            if credentials.chat_token.is_empty() { "none" } else { "set" },
            if credentials.summary_token.is_empty() { "none" } else { "set" },
        );
        self.store.set(Self::CHANNEL_KEY, &credentials.channel_id)?;
        self.set_secret(Secret::ChatToken, &credentials.chat_token)?;
        self.set_secret(Secret::SummaryToken, &credentials.summary_token)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Credentials> {
        Ok(Credentials {
            channel_id: self.store.get(Self::CHANNEL_KEY)?.unwrap_or_default(),
            chat_token: self.secret(Secret::ChatToken)?.unwrap_or_default(),
            summary_token: self.secret(Secret::SummaryToken)?.unwrap_or_default(),
        })
    }

    /// Read a single secret. Entries that fail to decode read as absent.
    pub fn secret(&self, secret: Secret) -> Result<Option<String>> {
        let Some(encoded) = self.store.get(&secret.key())? else {
            return Ok(None);
        };
        if encoded.is_empty() {
            return Ok(None);
        }
        match decode_token(&encoded) {
            Some(token) if !token.is_empty() => Ok(Some(token)),
            Some(_) => Ok(None),
            None => {
                warn!("Stored {} token could not be decoded; ignoring it", secret.as_str());
                Ok(None)
            }
        }
    }

    pub fn set_secret(&self, secret: Secret, token: &str) -> Result<()> {
        self.store.set(&secret.key(), &encode_token(token))
    }
}

fn encode_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    STANDARD.encode(token.as_bytes())
}

fn decode_token(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}
