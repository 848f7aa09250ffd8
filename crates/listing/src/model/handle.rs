//! Iteration handles.
//!
//! A handle pairs the collection stamp it was issued under with the row key
//! of the record it addresses. Row keys are never reused, and the stamp
//! changes whenever the collection is detached or re-attached, so a stale
//! handle can always be detected.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RowKey(u64);

impl RowKey {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Opaque position token handed to views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle {
    pub(crate) stamp: u64,
    pub(crate) key: RowKey,
}

impl RowHandle {
    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

/// Random stamp for a new collection lifetime.
pub(crate) fn fresh_stamp() -> u64 {
    rand::thread_rng().gen()
}

/// Random stamp guaranteed to differ from `previous`.
pub(crate) fn next_stamp(previous: u64) -> u64 {
    let mut rng = rand::thread_rng();
    loop {
        let stamp: u64 = rng.gen();
        if stamp != previous {
            return stamp;
        }
    }
}
