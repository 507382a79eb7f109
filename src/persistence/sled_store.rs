//! Backlog backed by `sled`
//!
//! Each lane lives in its own sled tree. Entry keys are
//! `<reference>\0<sequence>` with a zero-padded sequence from
//! `Db::generate_id`, so a prefix scan yields one reference's values in
//! insertion order. Values are stored as JSON.
//!
//! Storage errors are logged and treated as "nothing stored" or "nothing
//! found"; the trait has no error path. An entry that no longer decodes is
//! logged and deleted when it is reached, so peek and remove always agree on
//! which entries come first.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::{Db, IVec, Tree};
use tracing::error;

use super::{BacklogStore, Retention};
use crate::utils::error::StoreError;

const KEY_SEPARATOR: u8 = 0;

#[derive(Clone)]
pub struct SledStore<V> {
    db: Db,
    tree: Tree,
    retention: Retention,
    _values: PhantomData<fn() -> V>,
}

impl<V> SledStore<V> {
    /// Open or create a sled database at `path` and use `tree` in it.
    pub fn open(path: &str, tree: &str, retention: Retention) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|source| StoreError::Open {
            path: path.to_string(),
            source,
        })?;
        Self::with_db(&db, tree, retention)
    }

    /// Use `tree` of an already opened database. Lanes share one database this way.
    pub fn with_db(db: &Db, tree: &str, retention: Retention) -> Result<Self, StoreError> {
        let handle = db.open_tree(tree).map_err(|source| StoreError::Tree {
            tree: tree.to_string(),
            source,
        })?;
        Ok(Self {
            db: db.clone(),
            tree: handle,
            retention,
            _values: PhantomData,
        })
    }

    fn prefix(key: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(key.len() + 1);
        prefix.extend_from_slice(key.as_bytes());
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    /// Every raw entry of `key`, decodable or not.
    fn entry_keys(&self, key: &str) -> Vec<IVec> {
        self.tree
            .scan_prefix(Self::prefix(key))
            .keys()
            .filter_map(|res| match res {
                Ok(k) => Some(k),
                Err(e) => {
                    error!("Failed to scan backlog for '{key}': {e}");
                    None
                }
            })
            .collect()
    }

    fn clear_key(&self, key: &str) {
        for entry in self.entry_keys(key) {
            if let Err(e) = self.tree.remove(entry) {
                error!("Failed to remove backlog entry for '{key}': {e}");
            }
        }
    }
}

impl<V: DeserializeOwned> SledStore<V> {
    /// The first `n` decodable entries of `key`, oldest first.
    fn decoded_entries(&self, key: &str, n: usize) -> Vec<(IVec, V)> {
        let mut entries = Vec::new();
        for res in self.tree.scan_prefix(Self::prefix(key)) {
            if entries.len() == n {
                break;
            }
            let (entry, raw) = match res {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Failed to scan backlog for '{key}': {e}");
                    break;
                }
            };
            match serde_json::from_slice(&raw) {
                Ok(value) => entries.push((entry, value)),
                Err(e) => {
                    error!("Discarding undecodable backlog entry for '{key}': {e}");
                    if let Err(e) = self.tree.remove(&entry) {
                        error!("Failed to remove backlog entry for '{key}': {e}");
                    }
                }
            }
        }
        entries
    }
}

impl<V> BacklogStore<V> for SledStore<V>
where
    V: Serialize + DeserializeOwned,
{
    fn retention(&self) -> Retention {
        self.retention
    }

    fn put(&mut self, key: &str, value: V) {
        let serialized = match serde_json::to_vec(&value) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize backlog value for '{key}': {e}");
                return;
            }
        };
        let sequence = match self.db.generate_id() {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to allocate backlog sequence for '{key}': {e}");
                return;
            }
        };

        if self.retention == Retention::LastValue {
            self.clear_key(key);
        }

        let mut entry = Self::prefix(key);
        entry.extend_from_slice(format!("{sequence:020}").as_bytes());
        if let Err(e) = self.tree.insert(entry, serialized) {
            error!("Failed to store backlog value for '{key}': {e}");
        }
    }

    fn peek_first_n(&self, key: &str, n: usize) -> Vec<V> {
        self.decoded_entries(key, n)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    fn remove_first_n(&mut self, key: &str, n: usize) {
        for (entry, _) in self.decoded_entries(key, n) {
            if let Err(e) = self.tree.remove(entry) {
                error!("Failed to remove backlog entry for '{key}': {e}");
            }
        }
    }

    fn keys_with_backlog(&self) -> BTreeSet<String> {
        self.tree
            .iter()
            .keys()
            .filter_map(|res| match res {
                Ok(entry) => Some(entry),
                Err(e) => {
                    error!("Failed to scan backlog keys: {e}");
                    None
                }
            })
            .filter_map(|entry| {
                let end = entry.iter().position(|b| *b == KEY_SEPARATOR)?;
                String::from_utf8(entry[..end].to_vec()).ok()
            })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn len(&self, key: &str) -> usize {
        self.tree.scan_prefix(Self::prefix(key)).count()
    }
}

impl<V> std::fmt::Debug for SledStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("retention", &self.retention)
            .finish()
    }
}
