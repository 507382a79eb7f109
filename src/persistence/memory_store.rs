//! In-memory backlog.

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::{BacklogStore, Retention};

#[derive(Debug)]
pub struct MemoryStore<V> {
    retention: Retention,
    pending: HashMap<String, VecDeque<V>>,
}

impl<V> MemoryStore<V> {
    pub fn new(retention: Retention) -> Self {
        Self {
            retention,
            pending: HashMap::new(),
        }
    }

    pub fn fifo() -> Self {
        Self::new(Retention::Fifo)
    }

    pub fn last_value() -> Self {
        Self::new(Retention::LastValue)
    }
}

impl<V: Clone + Send> BacklogStore<V> for MemoryStore<V> {
    fn retention(&self) -> Retention {
        self.retention
    }

    fn put(&mut self, key: &str, value: V) {
        let queue = self.pending.entry(key.to_string()).or_default();
        if self.retention == Retention::LastValue {
            queue.clear();
        }
        queue.push_back(value);
    }

    fn peek_first_n(&self, key: &str, n: usize) -> Vec<V> {
        self.pending
            .get(key)
            .map(|queue| queue.iter().take(n).cloned().collect())
            .unwrap_or_default()
    }

    fn remove_first_n(&mut self, key: &str, n: usize) {
        let Some(queue) = self.pending.get_mut(key) else {
            return;
        };
        let n = n.min(queue.len());
        queue.drain(..n);
        if queue.is_empty() {
            self.pending.remove(key);
        }
    }

    fn keys_with_backlog(&self) -> BTreeSet<String> {
        self.pending.keys().cloned().collect()
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn len(&self, key: &str) -> usize {
        self.pending.get(key).map_or(0, VecDeque::len)
    }
}
