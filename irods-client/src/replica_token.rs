//! Replica tokens shared by parallel streams writing the same data object.
//!
//! The first stream to open a replica receives a token from the server; the
//! others present it. Entries are reference counted by open streams, and a
//! per-object async lock serializes the open/close handshakes.

use crate::error::ClientError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// Logical path plus the user name writing to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicaTokenCacheKey {
    pub path: String,
    pub user: String,
}

impl ReplicaTokenCacheKey {
    pub fn new(path: &str, user: &str) -> Result<Self, ClientError> {
        if path.trim().is_empty() {
            return Err(ClientError::InvalidArgument("blank logical path".to_string()));
        }
        if user.trim().is_empty() {
            return Err(ClientError::InvalidArgument("blank user name".to_string()));
        }
        Ok(Self {
            path: path.to_string(),
            user: user.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaTokenCacheEntry {
    pub token: Option<String>,
    pub replica_number: Option<i32>,
    /// Stream that obtained the token.
    pub first_stream_id: Option<u64>,
    pub open_count: u32,
}

type ObjectLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
pub struct ReplicaTokenCacheManager {
    entries: Mutex<HashMap<ReplicaTokenCacheKey, ReplicaTokenCacheEntry>>,
    locks: Mutex<HashMap<ReplicaTokenCacheKey, (ObjectLock, usize)>>,
}

impl ReplicaTokenCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the per-object lock, creating it on first use, and takes a
    /// reference on it.
    pub fn obtain_replica_token_lock(&self, path: &str, user: &str) -> Result<ObjectLock, ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        let mut locks = self.locks.lock();
        let (lock, refs) = locks
            .entry(key)
            .or_insert_with(|| (Arc::new(tokio::sync::Mutex::new(())), 0));
        *refs += 1;
        Ok(lock.clone())
    }

    /// Waits up to `timeout` for the object lock taken by
    /// [`ReplicaTokenCacheManager::obtain_replica_token_lock`].
    pub async fn try_lock(
        &self,
        path: &str,
        user: &str,
        timeout: Duration,
    ) -> Result<OwnedMutexGuard<()>, ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        let lock = self
            .locks
            .lock()
            .get(&key)
            .map(|(lock, _)| lock.clone())
            .ok_or_else(|| {
                ClientError::ReplicaToken(format!("no lock obtained for {}", key.path))
            })?;
        tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| ClientError::Timeout)
    }

    /// Returns the entry for an object, creating an empty one if absent.
    pub fn replica_token_entry(&self, path: &str, user: &str) -> Result<ReplicaTokenCacheEntry, ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        Ok(self.entries.lock().entry(key).or_default().clone())
    }

    /// Records the token issued to the first stream.
    pub fn add_replica_token(
        &self,
        path: &str,
        user: &str,
        token: &str,
        replica_number: i32,
        stream_id: u64,
    ) -> Result<(), ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        if token.trim().is_empty() {
            return Err(ClientError::InvalidArgument("blank replica token".to_string()));
        }
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&key).ok_or_else(|| {
            ClientError::ReplicaToken(format!("no entry for {}", key.path))
        })?;
        if entry.token.is_some() {
            return Err(ClientError::ReplicaToken(format!(
                "token already set for {}",
                key.path
            )));
        }
        entry.token = Some(token.to_string());
        entry.replica_number = Some(replica_number);
        entry.first_stream_id = Some(stream_id);
        entry.open_count = 1;
        tracing::debug!("Replica token for {} held by stream {}", key.path, stream_id);
        Ok(())
    }

    /// Counts one more stream holding the token. Returns the new count.
    pub fn increment_open_count(&self, path: &str, user: &str) -> Result<u32, ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&key).ok_or_else(|| {
            ClientError::ReplicaToken(format!("no entry for {}", key.path))
        })?;
        entry.open_count += 1;
        Ok(entry.open_count)
    }

    /// Whether only one stream still holds the token.
    pub fn is_final_reference(&self, path: &str, user: &str) -> Result<bool, ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        self.entries
            .lock()
            .get(&key)
            .map(|entry| entry.open_count <= 1)
            .ok_or_else(|| ClientError::ReplicaToken(format!("no entry for {}", key.path)))
    }

    pub fn is_first_stream(&self, path: &str, user: &str, stream_id: u64) -> Result<bool, ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        Ok(self
            .entries
            .lock()
            .get(&key)
            .is_some_and(|entry| entry.first_stream_id == Some(stream_id)))
    }

    /// Releases one stream's hold and its lock reference. The last release
    /// removes the entry, and the lock goes once no reference remains.
    pub fn remove_replica_token(&self, path: &str, user: &str) -> Result<(), ClientError> {
        let key = ReplicaTokenCacheKey::new(path, user)?;
        {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&key) else {
                return Ok(());
            };
            entry.open_count = entry.open_count.saturating_sub(1);
            if entry.open_count == 0 {
                entries.remove(&key);
                tracing::debug!("Replica token for {} released", key.path);
            }
        }

        let mut locks = self.locks.lock();
        if let Some((_, refs)) = locks.get_mut(&key) {
            *refs = refs.saturating_sub(1);
            if *refs == 0 {
                locks.remove(&key);
            }
        }
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/tempZone/home/rods/file.dat";

    #[test]
    fn test_token_lifecycle() {
        let cache = ReplicaTokenCacheManager::new();
        cache.obtain_replica_token_lock(PATH, "rods").unwrap();
        let entry = cache.replica_token_entry(PATH, "rods").unwrap();
        assert_eq!(entry, ReplicaTokenCacheEntry::default());

        cache.add_replica_token(PATH, "rods", "tok-1", 2, 11).unwrap();
        assert!(cache.is_first_stream(PATH, "rods", 11).unwrap());
        assert!(!cache.is_first_stream(PATH, "rods", 12).unwrap());
        assert!(cache.is_final_reference(PATH, "rods").unwrap());

        assert_eq!(cache.increment_open_count(PATH, "rods").unwrap(), 2);
        assert!(!cache.is_final_reference(PATH, "rods").unwrap());
        let entry = cache.replica_token_entry(PATH, "rods").unwrap();
        assert_eq!(entry.token.as_deref(), Some("tok-1"));
        assert_eq!(entry.replica_number, Some(2));

        cache.remove_replica_token(PATH, "rods").unwrap();
        assert_eq!(cache.entry_count(), 1);
        cache.remove_replica_token(PATH, "rods").unwrap();
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.lock_count(), 0);
    }

    #[test]
    fn test_each_release_drops_a_lock_reference() {
        let cache = ReplicaTokenCacheManager::new();
        cache.obtain_replica_token_lock(PATH, "rods").unwrap();
        cache.obtain_replica_token_lock(PATH, "rods").unwrap();
        cache.replica_token_entry(PATH, "rods").unwrap();
        cache.add_replica_token(PATH, "rods", "tok", 0, 1).unwrap();
        cache.increment_open_count(PATH, "rods").unwrap();

        cache.remove_replica_token(PATH, "rods").unwrap();
        assert_eq!(cache.lock_count(), 1);
        cache.remove_replica_token(PATH, "rods").unwrap();
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.lock_count(), 0);
    }

    #[test]
    fn test_add_requires_entry_and_no_token() {
        let cache = ReplicaTokenCacheManager::new();
        assert!(matches!(
            cache.add_replica_token(PATH, "rods", "tok", 0, 1),
            Err(ClientError::ReplicaToken(_))
        ));
        cache.replica_token_entry(PATH, "rods").unwrap();
        cache.add_replica_token(PATH, "rods", "tok", 0, 1).unwrap();
        assert!(matches!(
            cache.add_replica_token(PATH, "rods", "other", 0, 2),
            Err(ClientError::ReplicaToken(_))
        ));
    }

    #[test]
    fn test_blank_arguments() {
        let cache = ReplicaTokenCacheManager::new();
        assert!(matches!(
            cache.replica_token_entry("", "rods"),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(cache.obtain_replica_token_lock(PATH, " ").is_err());
        assert!(cache.remove_replica_token(" ", "rods").is_err());
    }

    #[test]
    fn test_users_are_separate() {
        let cache = ReplicaTokenCacheManager::new();
        cache.replica_token_entry(PATH, "alice").unwrap();
        cache.replica_token_entry(PATH, "bob").unwrap();
        cache.add_replica_token(PATH, "alice", "a", 0, 1).unwrap();
        assert!(cache.replica_token_entry(PATH, "bob").unwrap().token.is_none());
    }

    #[tokio::test]
    async fn test_try_lock_times_out_while_held() {
        let cache = Arc::new(ReplicaTokenCacheManager::new());
        let lock = cache.obtain_replica_token_lock(PATH, "rods").unwrap();
        let held = lock.clone().lock_owned().await;

        let result = cache
            .try_lock(PATH, "rods", Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(ClientError::Timeout)));

        drop(held);
        let guard = cache
            .try_lock(PATH, "rods", Duration::from_millis(50))
            .await;
        tokio_test::assert_ok!(guard);
    }

    #[tokio::test]
    async fn test_try_lock_requires_obtained_lock() {
        let cache = ReplicaTokenCacheManager::new();
        let result = cache.try_lock(PATH, "rods", Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ClientError::ReplicaToken(_))));
    }
}
