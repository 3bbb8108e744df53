//! Session identity
//!
//! A `Session` exists only for connections that completed the username
//! handshake; it is owned by the registry and destroyed on disconnect.

use std::net::SocketAddr;

use crate::types::SessionId;

/// An admitted, uniquely-named connection's server-side identity
///
/// The name is immutable once assigned. Outbound delivery state lives in
/// the router, not here.
#[derive(Debug, Clone)]
pub struct Session {
    /// Connection-lifetime identifier, assigned at accept time
    pub id: SessionId,
    /// Unique display name negotiated by the handshake
    pub name: String,
    /// Peer address of the underlying connection
    pub addr: SocketAddr,
}

impl Session {
    /// Create a session identity for a freshly admitted connection
    pub fn new(id: SessionId, name: String, addr: SocketAddr) -> Self {
        Self { id, name, addr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_fields() {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let session = Session::new(SessionId::new(), "alice".to_string(), addr);
        assert_eq!(session.name, "alice");
        assert_eq!(session.addr, addr);
    }
}
