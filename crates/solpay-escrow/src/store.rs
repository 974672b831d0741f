//! # Record Store
//!
//! Escrow records keyed by derived state address. Each address maps to its
//! own slot, an `Arc<Mutex<Option<EscrowStateRecord>>>`. The state machine
//! holds a slot's lock for the whole check-and-mutate of one operation, so
//! operations on one instance are serialized while operations on different
//! instances never touch the same lock.
//!
//! A slot holding `None` is an instance whose Open is in flight or failed.
//! Empty slots are dropped once nobody references them.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use solpay_core::Address;

use crate::state::EscrowStateRecord;

pub(crate) type Slot = Arc<Mutex<Option<EscrowStateRecord>>>;

/// Serializable image of all committed records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// Records by state address.
    pub records: BTreeMap<Address, EscrowStateRecord>,
}

/// Concurrent map of per-instance record slots.
#[derive(Debug, Default)]
pub struct RecordStore {
    slots: DashMap<Address, Slot>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot.
    pub fn from_snapshot(snapshot: RecordSnapshot) -> Self {
        let slots = DashMap::new();
        for (address, record) in snapshot.records {
            slots.insert(address, Arc::new(Mutex::new(Some(record))));
        }
        Self { slots }
    }

    /// Copy out every committed record.
    pub fn snapshot(&self) -> RecordSnapshot {
        let records = self
            .slots
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .lock()
                    .as_ref()
                    .map(|record| (*entry.key(), record.clone()))
            })
            .collect();
        RecordSnapshot { records }
    }

    /// The record at `state_address`, if committed.
    pub fn get(&self, state_address: &Address) -> Option<EscrowStateRecord> {
        let slot = self.existing(state_address)?;
        let guard = slot.lock();
        guard.clone()
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().lock().is_some())
            .count()
    }

    /// True if no record has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The slot for `state_address`, created empty if absent.
    pub(crate) fn slot(&self, state_address: &Address) -> Slot {
        Arc::clone(self.slots.entry(*state_address).or_default().value())
    }

    /// The slot for `state_address` without creating one.
    pub(crate) fn existing(&self, state_address: &Address) -> Option<Slot> {
        self.slots
            .get(state_address)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the slot if it is empty and referenced only by the map. Called
    /// after a failed Open has released its own handle.
    pub(crate) fn discard_if_empty(&self, state_address: &Address) {
        self.slots.remove_if(state_address, |_, slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_some_and(|guard| guard.is_none())
        });
    }
}
