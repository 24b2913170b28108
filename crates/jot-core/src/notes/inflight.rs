use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::models::NoteId;

/// What an outstanding write is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InflightKey {
    Create,
    Note(NoteId),
}

impl fmt::Display for InflightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "new note"),
            Self::Note(id) => write!(f, "note {id}"),
        }
    }
}

/// Set of keys with a write outstanding.
#[derive(Debug, Clone, Default)]
pub struct InflightRegistry {
    keys: Arc<Mutex<HashSet<InflightKey>>>,
}

impl InflightRegistry {
    /// Claim `key`, or fail with `Error::Busy` if it is already claimed.
    pub fn acquire(&self, key: InflightKey) -> Result<InflightGuard> {
        if !self.keys().insert(key) {
            tracing::debug!("Rejected concurrent write for {}", key);
            return Err(Error::Busy(key.to_string()));
        }
        Ok(InflightGuard {
            registry: self.clone(),
            key,
        })
    }

    #[must_use]
    pub fn is_inflight(&self, key: InflightKey) -> bool {
        self.keys().contains(&key)
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<InflightKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its key when dropped, whether the write succeeded or not.
#[derive(Debug)]
pub struct InflightGuard {
    registry: InflightRegistry,
    key: InflightKey,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.registry.keys().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_on_same_key_is_busy() {
        let registry = InflightRegistry::default();
        let id = NoteId::generate();
        let _guard = registry.acquire(InflightKey::Note(id)).unwrap();

        let error = registry.acquire(InflightKey::Note(id)).unwrap_err();
        assert!(matches!(error, Error::Busy(key) if key == format!("note {id}")));
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let registry = InflightRegistry::default();
        let _a = registry.acquire(InflightKey::Note(NoteId::generate())).unwrap();
        let _b = registry.acquire(InflightKey::Note(NoteId::generate())).unwrap();
        let _c = registry.acquire(InflightKey::Create).unwrap();
    }

    #[test]
    fn dropping_guard_releases_key() {
        let registry = InflightRegistry::default();
        let guard = registry.acquire(InflightKey::Create).unwrap();
        assert!(registry.is_inflight(InflightKey::Create));

        drop(guard);
        assert!(!registry.is_inflight(InflightKey::Create));
        assert!(registry.acquire(InflightKey::Create).is_ok());
    }
}
