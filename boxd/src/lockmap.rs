//! Per-key async lock.
//!
//! Used where an operation only needs to serialize against itself (the same
//! hostname, the same container id) rather than against the whole actor —
//! e.g. concurrent `create` calls racing on the same hostname (§8
//! "Concurrent `create` of two containers with colliding hostnames: exactly
//! one succeeds").

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, TryLockError};

#[derive(Default)]
pub struct LockMap<K: Hash + Eq> {
    inner: std::sync::Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

pub struct LockMapGuard<'m, K: Hash + Eq> {
    map: &'m LockMap<K>,
    key: K,
    _guard: OwnedMutexGuard<()>,
}

impl<K: Hash + Eq> Drop for LockMapGuard<'_, K> {
    fn drop(&mut self) {
        self.map.inner.lock().expect("lock map poisoned").remove(&self.key);
    }
}

impl<K: Hash + Eq + Clone> LockMap<K> {
    pub fn new() -> Self {
        Self { inner: std::sync::Mutex::new(HashMap::new()) }
    }

    fn mutex_by_key(&self, key: K) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().expect("lock map poisoned");
        map.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn lock(&self, key: K) -> LockMapGuard<'_, K> {
        let guard = self.mutex_by_key(key.clone()).lock_owned().await;
        LockMapGuard { map: self, key, _guard: guard }
    }

    pub fn try_lock(&self, key: K) -> Result<LockMapGuard<'_, K>, TryLockError> {
        let guard = self.mutex_by_key(key.clone()).try_lock_owned()?;
        Ok(LockMapGuard { map: self, key, _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let map: LockMap<String> = LockMap::new();
        let a = map.lock("a".to_string()).await;
        let b = map.try_lock("b".to_string());
        assert!(b.is_ok());
        drop(a);
    }

    #[tokio::test]
    async fn same_key_blocks_concurrent_try_lock() {
        let map: LockMap<String> = LockMap::new();
        let _guard = map.lock("x".to_string()).await;
        assert!(map.try_lock("x".to_string()).is_err());
    }
}
