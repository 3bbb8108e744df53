//! Line-Oriented TCP Chat Server Library
//!
//! A chat server where clients register a unique display name and
//! exchange broadcast and private ("whisper") messages, one text line
//! per message.
//!
//! # Features
//! - Two-phase username handshake (propose/accept, then confirm)
//! - Broadcast messaging with sender and timestamp tags
//! - Whisper mode: private routing to one named session, echoed to the sender
//! - `/users`, `/help`, `/whisper`, `/disconnect` commands
//! - Clean and abrupt disconnect handling without leaking registry entries
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the session registry and
//!   the message router
//! - Each connection runs an inbound task (handshake, then command
//!   interpretation) and an output dispatcher task draining that
//!   session's FIFO outbound queue
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use whisperd::{ChatServer, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:5000").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, peer)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, peer, cmd_tx));
//!     }
//! }
//! ```

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod interpreter;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use error::{AppError, RegistryError};
pub use handler::handle_connection;
pub use handshake::Handshake;
pub use interpreter::{CommandInterpreter, Flow};
pub use protocol::Directive;
pub use registry::SessionRegistry;
pub use router::MessageRouter;
pub use server::{ChatServer, ServerCommand};
pub use session::Session;
pub use types::SessionId;
