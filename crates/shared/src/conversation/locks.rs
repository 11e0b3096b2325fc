use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::store::SessionStoreError;

/// Hands out one async mutex per session id. Holding the guard serializes
/// every chat turn on that session; other sessions use their own mutex.
/// Entries live as long as the process, matching the session store, which
/// never evicts sessions either.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(
        &self,
        session_id: &str,
    ) -> Result<OwnedMutexGuard<()>, SessionStoreError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| SessionStoreError::Poisoned)?;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        Ok(lock.lock_owned().await)
    }
}
