use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::turn::Turn;

pub type SessionStoreFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, SessionStoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store lock poisoned")]
    Poisoned,
    #[error("session store backend failed: {0}")]
    Backend(String),
}

/// Ordered per-session transcripts. Reading an unknown session yields an
/// empty history.
pub trait SessionStore: Send + Sync {
    fn get_history<'a>(&'a self, session_id: &'a str) -> SessionStoreFuture<'a, Vec<Turn>>;

    /// Appends all turns in order, or none of them.
    fn append_turns<'a>(
        &'a self,
        session_id: &'a str,
        turns: Vec<Turn>,
    ) -> SessionStoreFuture<'a, ()>;

    fn replace_history<'a>(
        &'a self,
        session_id: &'a str,
        history: Vec<Turn>,
    ) -> SessionStoreFuture<'a, ()>;

    fn append_turn<'a>(&'a self, session_id: &'a str, turn: Turn) -> SessionStoreFuture<'a, ()> {
        self.append_turns(session_id, vec![turn])
    }
}

#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Vec<Turn>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_sessions<T>(
        &self,
        apply: impl FnOnce(&mut HashMap<String, Vec<Turn>>) -> T,
    ) -> Result<T, SessionStoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| SessionStoreError::Poisoned)?;
        Ok(apply(&mut sessions))
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_history<'a>(&'a self, session_id: &'a str) -> SessionStoreFuture<'a, Vec<Turn>> {
        let result = self.with_sessions(|sessions| {
            sessions
                .entry(session_id.to_string())
                .or_default()
                .clone()
        });
        Box::pin(async move { result })
    }

    fn append_turns<'a>(
        &'a self,
        session_id: &'a str,
        turns: Vec<Turn>,
    ) -> SessionStoreFuture<'a, ()> {
        let result = self.with_sessions(|sessions| {
            sessions
                .entry(session_id.to_string())
                .or_default()
                .extend(turns);
        });
        Box::pin(async move { result })
    }

    fn replace_history<'a>(
        &'a self,
        session_id: &'a str,
        history: Vec<Turn>,
    ) -> SessionStoreFuture<'a, ()> {
        let result = self.with_sessions(|sessions| {
            sessions.insert(session_id.to_string(), history);
        });
        Box::pin(async move { result })
    }
}
