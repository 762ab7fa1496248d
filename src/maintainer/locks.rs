//! Per-person write locks.
//!
//! Operations that write edges between two persons hold both persons'
//! locks for the whole transaction, so two reciprocal writes on the same
//! pair can never interleave. Locks are taken in ascending id order.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::model::PersonId;

#[derive(Debug, Default)]
pub(crate) struct PersonLocks {
    slots: Mutex<HashMap<PersonId, Arc<AsyncMutex<()>>>>,
}

/// Holds the locks of a set of persons until dropped.
pub(crate) struct PersonGuard<'a> {
    locks: &'a PersonLocks,
    held: Vec<(PersonId, OwnedMutexGuard<()>)>,
    /// Slot being waited on when the future was dropped.
    waiting: Option<PersonId>,
}

impl PersonLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self, persons: &[PersonId]) -> PersonGuard<'_> {
        let mut ids = persons.to_vec();
        ids.sort_unstable();
        ids.dedup();

        // Owned by the guard from the start, so a cancelled wait still
        // releases and prunes what it already holds.
        let mut guard = PersonGuard { locks: self, held: Vec::with_capacity(ids.len()), waiting: None };
        for id in ids {
            let slot = Arc::clone(self.slots.lock().entry(id).or_default());
            guard.waiting = Some(id);
            let owned = slot.lock_owned().await;
            guard.waiting = None;
            guard.held.push((id, owned));
        }
        guard
    }

    #[cfg(test)]
    fn idle_slots(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for PersonGuard<'_> {
    fn drop(&mut self) {
        let held = std::mem::take(&mut self.held);
        let ids: Vec<PersonId> = held.iter().map(|(id, _)| *id).chain(self.waiting.take()).collect();
        drop(held);

        // Forget slots nobody else is holding or waiting on.
        let mut slots = self.locks.slots.lock();
        for id in ids {
            if slots.get(&id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                slots.remove(&id);
            }
        }
    }
}
