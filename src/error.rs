//! Error types for the chat server
//!
//! Splits fatal connection errors from recoverable registry errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Connection-level errors
///
/// All of these are fatal to the offending connection only; the server
/// process keeps running and other sessions are unaffected.
#[derive(Debug, Error)]
pub enum AppError {
    /// Line framing error or transport IO failure (LinesCodec wraps the
    /// io case)
    #[error("line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// The server actor's command channel is closed
    #[error("server channel closed")]
    ChannelSend,
}

/// Registry admission errors
///
/// Recoverable: reported to the connection, which may retry the handshake
/// with a different name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another session already holds this name
    #[error("username already taken: {0}")]
    NameTaken(String),
}
