//! HandshakeProtocol: pre-admission username negotiation
//!
//! Per-connection state machine: `AwaitingName` until a unique name is
//! proposed, accepted, and confirmed by the peer, then `Admitted`; a
//! disconnect directive or protocol violation ends in `Closed` with no
//! registry mutation.
//!
//! The two-step propose/accept-then-confirm exchange lets the client
//! resolve its display name locally before the server commits the
//! registration, so the server never admits a name the client did not
//! actually adopt.
//!
//! Replies here are written straight to the connection: the session's
//! outbound queue does not exist until admission succeeds.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::protocol::{self, Directive};
use crate::server::ServerCommand;
use crate::session::Session;
use crate::types::SessionId;

/// Terminal handshake outcome
#[derive(Debug)]
pub enum Handshake {
    /// Name registered; the connection owns the queue's receiving half
    Admitted {
        name: String,
        outbound: mpsc::UnboundedReceiver<String>,
    },
    /// Connection ended pre-admission (disconnect, EOF, or violation)
    Closed,
}

/// Negotiate a unique username for a new connection
///
/// Loops over inbound lines while awaiting a valid proposal. Empty and
/// taken names are rejected with an error line and the loop continues;
/// after acceptance, anything but the exact confirmation token is a
/// protocol violation that closes the connection without registering.
pub async fn negotiate<R, W>(
    id: SessionId,
    addr: std::net::SocketAddr,
    reader: &mut FramedRead<R, LinesCodec>,
    writer: &mut FramedWrite<W, LinesCodec>,
    cmd_tx: &mpsc::Sender<ServerCommand>,
) -> Result<Handshake, AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let Some(line) = reader.next().await else {
            debug!("session {}: connection closed during handshake", id);
            return Ok(Handshake::Closed);
        };
        let line = line?;

        let candidate = match Directive::parse(&line) {
            Directive::Disconnect => {
                debug!("session {}: disconnect before admission", id);
                return Ok(Handshake::Closed);
            }
            Directive::Username(candidate) => candidate,
            // Anything else is ignored while awaiting a proposal
            _ => continue,
        };

        if candidate.is_empty() {
            writer.send(protocol::ERR_INVALID_USERNAME.to_string()).await?;
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::NameAvailable {
                name: candidate.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;
        if !reply_rx.await.map_err(|_| AppError::ChannelSend)? {
            writer.send(protocol::ERR_NAME_TAKEN.to_string()).await?;
            continue;
        }

        writer.send(protocol::NAME_ACCEPTED.to_string()).await?;

        // The next line must be the exact confirmation token; anything
        // else (including a dropped connection) is a protocol violation.
        let confirmed = match reader.next().await {
            Some(Ok(line)) => line == protocol::NAME_CONFIRMED,
            Some(Err(e)) => {
                warn!("session {}: read failure awaiting confirmation: {}", id, e);
                return Ok(Handshake::Closed);
            }
            None => false,
        };
        if !confirmed {
            warn!("session {}: handshake violation, closing", id);
            return Ok(Handshake::Closed);
        }

        let session = Session::new(id, candidate.clone(), addr);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Admit {
                session,
                outbound: out_tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;

        match reply_rx.await.map_err(|_| AppError::ChannelSend)? {
            Ok(()) => {
                return Ok(Handshake::Admitted {
                    name: candidate,
                    outbound: out_rx,
                })
            }
            // Lost an admission race after the availability check; the
            // peer may retry with another name.
            Err(e) => {
                debug!("session {}: {}", id, e);
                writer.send(protocol::ERR_NAME_TAKEN.to_string()).await?;
            }
        }
    }
}
