//! The shared backlog.
//!
//! One mutex guards the four lanes together with the worker's flags, and one
//! condition variable on that mutex is the worker's only way to sleep and be
//! woken. Every operation holds the lock for the in-memory work only; nothing
//! publishes while holding it.
//!
//! Drains take a separate drain lock so two drains (the worker and an explicit
//! `publish_*` call) never send and remove the same batch twice. Producers
//! never touch the drain lock.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::model::{ActuatorStatus, Alarm, ConfigurationItem, SensorReading};
use crate::persistence::{BacklogStore, MemoryStore, Retention, SledStore};
use crate::utils::error::StoreError;

/// The four backlog lanes.
pub struct Lanes {
    readings: Box<dyn BacklogStore<SensorReading>>,
    alarms: Box<dyn BacklogStore<Alarm>>,
    statuses: Box<dyn BacklogStore<ActuatorStatus>>,
    configurations: Box<dyn BacklogStore<ConfigurationItem>>,
}

/// Selects one lane of `Lanes`.
pub type Lane<V> = fn(&mut Lanes) -> &mut (dyn BacklogStore<V> + 'static);

impl Lanes {
    pub fn new(
        readings: Box<dyn BacklogStore<SensorReading>>,
        alarms: Box<dyn BacklogStore<Alarm>>,
        statuses: Box<dyn BacklogStore<ActuatorStatus>>,
        configurations: Box<dyn BacklogStore<ConfigurationItem>>,
    ) -> Self {
        Self {
            readings,
            alarms,
            statuses,
            configurations,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Box::new(MemoryStore::<SensorReading>::fifo()),
            Box::new(MemoryStore::<Alarm>::fifo()),
            Box::new(MemoryStore::<ActuatorStatus>::last_value()),
            Box::new(MemoryStore::<ConfigurationItem>::last_value()),
        )
    }

    /// All four lanes in one sled database at `path`.
    pub fn sled(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|source| StoreError::Open {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::new(
            Box::new(SledStore::<SensorReading>::with_db(&db, "readings", Retention::Fifo)?),
            Box::new(SledStore::<Alarm>::with_db(&db, "alarms", Retention::Fifo)?),
            Box::new(SledStore::<ActuatorStatus>::with_db(
                &db,
                "actuator_statuses",
                Retention::LastValue,
            )?),
            Box::new(SledStore::<ConfigurationItem>::with_db(
                &db,
                "configurations",
                Retention::LastValue,
            )?),
        ))
    }

    pub fn readings(&mut self) -> &mut (dyn BacklogStore<SensorReading> + 'static) {
        self.readings.as_mut()
    }

    pub fn alarms(&mut self) -> &mut (dyn BacklogStore<Alarm> + 'static) {
        self.alarms.as_mut()
    }

    pub fn statuses(&mut self) -> &mut (dyn BacklogStore<ActuatorStatus> + 'static) {
        self.statuses.as_mut()
    }

    pub fn configurations(&mut self) -> &mut (dyn BacklogStore<ConfigurationItem> + 'static) {
        self.configurations.as_mut()
    }

    fn is_empty(&self) -> bool {
        self.readings.is_empty()
            && self.alarms.is_empty()
            && self.statuses.is_empty()
            && self.configurations.is_empty()
    }
}

struct OutboxState {
    lanes: Lanes,
    connected: bool,
    running: bool,
    signalled: bool,
}

pub struct Outbox {
    state: Mutex<OutboxState>,
    wake: Condvar,
    drain: Mutex<()>,
}

impl Outbox {
    pub fn new(lanes: Lanes) -> Self {
        Self {
            state: Mutex::new(OutboxState {
                lanes,
                connected: false,
                running: true,
                signalled: true,
            }),
            wake: Condvar::new(),
            drain: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Lanes::in_memory())
    }

    fn lock(&self) -> MutexGuard<'_, OutboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value and wake the worker.
    pub fn put<V>(&self, lane: Lane<V>, key: &str, value: V) {
        let mut state = self.lock();
        lane(&mut state.lanes).put(key, value);
        state.signalled = true;
        self.wake.notify_all();
    }

    pub fn peek_first_n<V>(&self, lane: Lane<V>, key: &str, n: usize) -> Vec<V> {
        lane(&mut self.lock().lanes).peek_first_n(key, n)
    }

    pub fn remove_first_n<V>(&self, lane: Lane<V>, key: &str, n: usize) {
        lane(&mut self.lock().lanes).remove_first_n(key, n);
    }

    /// Remove `sent` from the front of `key` if it is still what is pending.
    ///
    /// A last-value slot overwritten while its old value was in flight keeps
    /// the new value; `false` is returned and the new value stays pending.
    pub fn acknowledge<V: PartialEq>(&self, lane: Lane<V>, key: &str, sent: &[V]) -> bool {
        let mut state = self.lock();
        let store = lane(&mut state.lanes);
        if store.peek_first_n(key, sent.len()).as_slice() != sent {
            return false;
        }
        store.remove_first_n(key, sent.len());
        true
    }

    pub fn keys_with_backlog<V>(&self, lane: Lane<V>) -> BTreeSet<String> {
        lane(&mut self.lock().lanes).keys_with_backlog()
    }

    pub fn len<V>(&self, lane: Lane<V>, key: &str) -> usize {
        lane(&mut self.lock().lanes).len(key)
    }

    pub fn get<V>(&self, lane: Lane<V>, key: &str) -> Option<V> {
        lane(&mut self.lock().lanes).get(key)
    }

    /// True when no lane has anything pending.
    pub fn is_empty(&self) -> bool {
        self.lock().lanes.is_empty()
    }

    /// Record a connectivity edge. Going connected wakes the worker.
    pub fn set_connected(&self, connected: bool) {
        let mut state = self.lock();
        let edge = connected && !state.connected;
        state.connected = connected;
        if edge {
            state.signalled = true;
            self.wake.notify_all();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Checked before every publish attempt of a worker drain.
    pub fn may_publish(&self) -> bool {
        let state = self.lock();
        state.connected && state.running
    }

    pub(crate) fn start(&self) {
        let mut state = self.lock();
        state.running = true;
        state.signalled = true;
    }

    pub(crate) fn stop(&self) {
        self.lock().running = false;
        self.wake.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Block until there is reason to drain. Returns `false` once stopped.
    pub(crate) fn wait_for_work(&self) -> bool {
        let mut state = self.lock();
        while state.running && !(state.connected && state.signalled) {
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if !state.running {
            return false;
        }
        state.signalled = false;
        true
    }

    pub(crate) fn drain_guard(&self) -> MutexGuard<'_, ()> {
        self.drain.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Outbox")
            .field("connected", &state.connected)
            .field("running", &state.running)
            .field("empty", &state.lanes.is_empty())
            .finish()
    }
}
