//! SessionRegistry: the directory of admitted sessions
//!
//! Owned exclusively by the `ChatServer` actor, so every operation here is
//! atomic with respect to every other server operation without locks.
//! Insertion order is preserved for `/users` listings.

use crate::error::RegistryError;
use crate::session::Session;

/// Directory of active sessions, keyed by unique name
///
/// Invariant: at most one entry per name; membership mirrors exactly the
/// set of connections that completed the handshake and have not yet
/// disconnected.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Admitted sessions in insertion order
    sessions: Vec<Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniqueness check and insert as a single step
    ///
    /// Fails with `NameTaken` if the name is already registered; the
    /// session is returned to the caller untouched in that case.
    pub fn register(&mut self, session: Session) -> Result<(), RegistryError> {
        if self.contains(&session.name) {
            return Err(RegistryError::NameTaken(session.name));
        }
        self.sessions.push(session);
        Ok(())
    }

    /// Remove a session by name; idempotent
    ///
    /// Returns the removed session, or `None` if the name was not present
    /// (a forced-disconnect cleanup racing normal cleanup is a no-op, not
    /// an error). Callers use the `Some` case to emit the departure
    /// broadcast exactly once.
    pub fn unregister(&mut self, name: &str) -> Option<Session> {
        let pos = self.sessions.iter().position(|s| s.name == name)?;
        Some(self.sessions.remove(pos))
    }

    /// Whether a session with this name is currently registered
    pub fn contains(&self, name: &str) -> bool {
        self.sessions.iter().any(|s| s.name == name)
    }

    /// Insertion-ordered snapshot of registered names
    pub fn names(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.name.clone()).collect()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
