use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lock service unavailable: {0}")]
    Unavailable(String),
}

type Release = Box<dyn FnOnce() + Send>;

/// Ownership of a named lock. The lock is released when the guard is dropped.
pub struct LockGuard {
    key: String,
    release: Option<Release>,
}

impl LockGuard {
    pub fn new(key: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            key: key.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!(key = %self.key, "lock released");
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

/// Distributed mutex shared by the prover processes.
///
/// A lock that is not released expires after `ttl`, so that a crashed holder cannot stall the others.
pub trait BatchLock: Send + Sync {
    /// Returns `None` when the lock is held by someone else
    fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockGuard>, LockError>;
}

#[derive(Debug, Clone, Copy)]
struct Holder {
    token: u64,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct LockTable {
    holders: HashMap<String, Holder>,
    next_token: u64,
}

/// Process local [BatchLock]
#[derive(Debug, Clone, Default)]
pub struct InMemoryBatchLock {
    table: Arc<Mutex<LockTable>>,
}

impl InMemoryBatchLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.table
            .lock()
            .map(|table| {
                table
                    .holders
                    .get(key)
                    .map_or(false, |holder| holder.expires_at > Instant::now())
            })
            .unwrap_or(false)
    }
}

impl BatchLock for InMemoryBatchLock {
    fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockGuard>, LockError> {
        let mut table = self
            .table
            .lock()
            .map_err(|e| LockError::Unavailable(e.to_string()))?;

        let now = Instant::now();
        if let Some(holder) = table.holders.get(key) {
            if holder.expires_at > now {
                return Ok(None);
            }
            debug!(key, "taking over an expired lock");
        }

        let token = table.next_token;
        table.next_token += 1;
        table.holders.insert(
            key.to_string(),
            Holder {
                token,
                expires_at: now + ttl,
            },
        );

        let shared = Arc::clone(&self.table);
        let owned_key = key.to_string();
        Ok(Some(LockGuard::new(key, move || {
            if let Ok(mut table) = shared.lock() {
                // an expired guard must not release the lock of the next holder
                if table.holders.get(&owned_key).map(|holder| holder.token) == Some(token) {
                    table.holders.remove(&owned_key);
                }
            }
        })))
    }
}
