//! Module `collection`
//!
//! Bounded, deduplicating store of admitted values plus the per-identity
//! scoreboard. All mutation goes through [`CollectionPool::try_admit`] under
//! a single lock, which is what makes admission exactly-once and the
//! capacity stop exact under any number of concurrent sessions.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::results::AdmitResult;
use crate::client::Identity;

/// Point-in-time copy of admissions per identity.
pub type Scoreboard = BTreeMap<Identity, usize>;

struct PoolState {
    admitted: HashSet<i32>,
    scoreboard: HashMap<Identity, usize>,
}

pub struct CollectionPool {
    state: Mutex<PoolState>,
    capacity: usize,
}

impl CollectionPool {
    /// Creates an empty pool holding at most `capacity` distinct values.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                admitted: HashSet::with_capacity(capacity),
                scoreboard: HashMap::new(),
            }),
            capacity,
        }
    }

    /// Attempts to admit `value` on behalf of `identity`.
    ///
    /// Membership is checked before capacity: a value already held is always
    /// a [`AdmitResult::Duplicate`], including the one that filled the pool.
    pub fn try_admit(&self, value: i32, identity: Identity) -> AdmitResult {
        let mut state = self.state.lock();

        if state.admitted.contains(&value) {
            return AdmitResult::Duplicate;
        }
        if state.admitted.len() >= self.capacity {
            return AdmitResult::Full;
        }
        state.admitted.insert(value);
        *state.scoreboard.entry(identity).or_insert(0) += 1;

        AdmitResult::Admitted {
            filled: state.admitted.len() == self.capacity,
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().admitted.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity
    }

    /// Copy of the scoreboard; later admissions do not show up in it.
    pub fn scoreboard(&self) -> Scoreboard {
        let state = self.state.lock();
        state
            .scoreboard
            .iter()
            .map(|(id, count)| (*id, *count))
            .collect()
    }

    /// Snapshot of the admitted values, in no particular order.
    #[cfg(test)]
    pub fn values(&self) -> Vec<i32> {
        self.state.lock().admitted.iter().copied().collect()
    }
}

impl std::fmt::Debug for CollectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionPool")
            .field("size", &self.size())
            .field("capacity", &self.capacity)
            .finish()
    }
}
