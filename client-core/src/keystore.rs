//! Pluggable local persistence for keys and caches.
//!
//! Everything the client remembers between runs lives behind this small
//! key/value interface under a fixed, enumerable namespace:
//!
//! - `identity.privateKey` / `identity.publicKey` — the local keypair
//! - `peer.<username>.publicKey` — counterpart public-key cache
//! - `outbox.<nonce>` — locally composed plaintext, keyed by message nonce

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ClientError, ClientResult};

/// Fixed key namespace.
pub mod keys {
    pub const IDENTITY_PRIVATE_KEY: &str = "identity.privateKey";
    pub const IDENTITY_PUBLIC_KEY: &str = "identity.publicKey";

    pub fn peer_public_key(username: &str) -> String {
        format!("peer.{username}.publicKey")
    }

    pub fn outbox(nonce_b64: &str) -> String {
        format!("outbox.{nonce_b64}")
    }
}

pub trait Keystore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> ClientResult<()>;
}

/// Volatile store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryKeystore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keystore for MemoryKeystore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ClientError::Keystore("poisoned lock".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ClientError::Keystore("poisoned lock".into()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable store: one JSON object per file, written through on every put.
pub struct FileKeystore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl FileKeystore {
    /// Open or create the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| ClientError::Keystore(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&raw)
                .map_err(|e| ClientError::Keystore(format!("parse {}: {e}", path.display())))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    fn persist(&self, cache: &HashMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ClientError::Keystore(format!("mkdir {}: {e}", parent.display()))
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(cache)
            .map_err(|e| ClientError::Keystore(e.to_string()))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| ClientError::Keystore(format!("write {}: {e}", self.path.display())))
    }
}

impl Keystore for FileKeystore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let guard = self
            .cache
            .lock()
            .map_err(|_| ClientError::Keystore("poisoned lock".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|_| ClientError::Keystore("poisoned lock".into()))?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_keys_are_stable() {
        assert_eq!(keys::peer_public_key("bob"), "peer.bob.publicKey");
        assert_eq!(keys::outbox("bm9uY2U="), "outbox.bm9uY2U=");
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryKeystore::new();
        assert_eq!(store.get("identity.publicKey").unwrap(), None);
        store.put("identity.publicKey", "abc").unwrap();
        assert_eq!(
            store.get("identity.publicKey").unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!("keystore-test-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let store = FileKeystore::open(&path).unwrap();
            store.put("identity.privateKey", "secret").unwrap();
            store.put("peer.bob.publicKey", "bobkey").unwrap();
        }

        let reopened = FileKeystore::open(&path).unwrap();
        assert_eq!(
            reopened.get("identity.privateKey").unwrap().as_deref(),
            Some("secret")
        );
        assert_eq!(
            reopened.get("peer.bob.publicKey").unwrap().as_deref(),
            Some("bobkey")
        );

        let _ = std::fs::remove_file(&path);
    }
}
