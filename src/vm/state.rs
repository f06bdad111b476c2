//! Persistent store interface and the per-evaluation write overlay.
//!
//! The store maps `(caller, key)` to a word. Unset keys read as zero and
//! writing zero deletes the entry. An evaluation never writes the backing
//! store itself: `set` lands in a [`StoreOverlay`] whose writes the host
//! commits only after the whole evaluation succeeded.

use std::collections::BTreeMap;

use tracing::error;

use crate::vm::errors::VmError;
use crate::vm::word::{keccak_words, word_is_zero, Caller, Word, U256};

/// Abstract store backend. The caller identity is the only namespace the
/// interpreter itself enforces.
pub trait Store {
    fn get(&self, caller: &Caller, key: &Word) -> Result<Word, VmError>;
    fn set(&mut self, caller: &Caller, key: Word, value: Word) -> Result<(), VmError>;

    /// Apply `writes` under `caller`, all or nothing. If any read or write
    /// fails, keys already written are restored to their prior values
    /// before the error is returned.
    fn commit(&mut self, caller: &Caller, writes: &[(Word, Word)]) -> Result<(), VmError> {
        let mut prior = Vec::with_capacity(writes.len());
        for (k, _) in writes {
            prior.push((*k, self.get(caller, k)?));
        }
        for (applied, (k, v)) in writes.iter().enumerate() {
            if let Err(e) = self.set(caller, *k, *v) {
                for (pk, pv) in prior[..applied].iter().rev() {
                    if let Err(undo) = self.set(caller, *pk, *pv) {
                        error!(error = %undo, "store rollback failed");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// In-memory store backed by a BTreeMap.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub entries: BTreeMap<(Caller, Word), Word>,
}

impl MemoryStore {
    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Store for MemoryStore {
    fn get(&self, caller: &Caller, key: &Word) -> Result<Word, VmError> {
        Ok(self.entries.get(&(*caller, *key)).copied().unwrap_or(U256::ZERO))
    }

    fn set(&mut self, caller: &Caller, key: Word, value: Word) -> Result<(), VmError> {
        if word_is_zero(&value) {
            self.entries.remove(&(*caller, key));
        } else {
            self.entries.insert((*caller, key), value);
        }
        Ok(())
    }
}

/// Read-through write buffer for one evaluation, scoped to one caller.
pub struct StoreOverlay<'a> {
    base:   &'a dyn Store,
    caller: Caller,
    writes: BTreeMap<Word, Word>,
}

impl<'a> StoreOverlay<'a> {
    pub fn new(base: &'a dyn Store, caller: Caller) -> Self {
        Self { base, caller, writes: BTreeMap::new() }
    }

    pub fn caller(&self) -> &Caller { &self.caller }

    pub fn get(&self, key: &Word) -> Result<Word, VmError> {
        match self.writes.get(key) {
            Some(v) => Ok(*v),
            None => self.base.get(&self.caller, key),
        }
    }

    pub fn set(&mut self, key: Word, value: Word) {
        self.writes.insert(key, value);
    }

    /// Buffered writes in key order, last write per key wins.
    pub fn into_writes(self) -> Vec<(Word, Word)> {
        self.writes.into_iter().collect()
    }
}

/// keccak256(flow ‖ key). Flows sharing one caller fold their id into the
/// key this way so their entries cannot collide.
pub fn namespaced_key(flow: &Word, key: &Word) -> Word {
    keccak_words(&[*flow, *key])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(v: u64) -> Word { U256::from(v) }

    #[test]
    fn test_zero_write_deletes() {
        let mut s = MemoryStore::default();
        let c = [1u8; 32];
        s.set(&c, w(1), w(5)).unwrap();
        assert_eq!(s.len(), 1);
        s.set(&c, w(1), U256::ZERO).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.get(&c, &w(1)).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_callers_do_not_share_entries() {
        let mut s = MemoryStore::default();
        s.set(&[1u8; 32], w(7), w(42)).unwrap();
        assert_eq!(s.get(&[2u8; 32], &w(7)).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_overlay_reads_own_writes_then_base() {
        let mut base = MemoryStore::default();
        let c = [3u8; 32];
        base.set(&c, w(1), w(10)).unwrap();
        let mut overlay = StoreOverlay::new(&base, c);
        assert_eq!(overlay.get(&w(1)).unwrap(), w(10));
        overlay.set(w(1), w(11));
        overlay.set(w(2), w(20));
        assert_eq!(overlay.get(&w(1)).unwrap(), w(11));
        assert_eq!(overlay.into_writes(), vec![(w(1), w(11)), (w(2), w(20))]);
        // base untouched until commit
        assert_eq!(base.get(&c, &w(1)).unwrap(), w(10));
    }

    /// Rejects writes to one key.
    struct RejectingStore {
        inner:  MemoryStore,
        reject: Word,
    }

    impl Store for RejectingStore {
        fn get(&self, caller: &Caller, key: &Word) -> Result<Word, VmError> {
            self.inner.get(caller, key)
        }

        fn set(&mut self, caller: &Caller, key: Word, value: Word) -> Result<(), VmError> {
            if key == self.reject {
                return Err(VmError::State(format!("write to {key} rejected")));
            }
            self.inner.set(caller, key, value)
        }
    }

    #[test]
    fn test_commit_applies_all_writes() {
        let mut s = MemoryStore::default();
        let c = [4u8; 32];
        s.set(&c, w(1), w(5)).unwrap();
        s.commit(&c, &[(w(1), U256::ZERO), (w(2), w(20))]).unwrap();
        assert_eq!(s.get(&c, &w(1)).unwrap(), U256::ZERO);
        assert_eq!(s.get(&c, &w(2)).unwrap(), w(20));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_failed_commit_restores_prior_values() {
        let c = [5u8; 32];
        let mut s = RejectingStore { inner: MemoryStore::default(), reject: w(13) };
        s.set(&c, w(1), w(5)).unwrap();
        let before = s.inner.entries.clone();

        let err = s.commit(&c, &[(w(1), w(10)), (w(2), w(20)), (w(13), w(30)), (w(40), w(40))]).unwrap_err();
        assert!(matches!(err, VmError::State(_)));
        assert_eq!(s.inner.entries, before);
    }

    #[test]
    fn test_namespaced_key_separates_flows() {
        let k = w(1);
        assert_ne!(namespaced_key(&w(100), &k), namespaced_key(&w(200), &k));
        assert_eq!(namespaced_key(&w(100), &k), namespaced_key(&w(100), &k));
    }
}
