//! Connection lifecycle handler
//!
//! Frames the stream into lines, runs the username handshake, then
//! spawns the output dispatcher and drives the command interpreter over
//! inbound lines. One inbound task plus one dispatcher task per
//! connection, mirroring each other's teardown through the session's
//! queue.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use futures_util::StreamExt;

use crate::dispatcher;
use crate::error::AppError;
use crate::handshake::{self, Handshake};
use crate::interpreter::{CommandInterpreter, Flow};
use crate::server::ServerCommand;
use crate::types::SessionId;

/// Longest accepted inbound line; anything larger is a framing error
/// that drops the connection
const MAX_LINE_LEN: usize = 1024;

/// Handle one client connection from accept to teardown
///
/// Any read failure or EOF after admission is an implicit disconnect:
/// the session is force-removed exactly as if it had sent
/// `/disconnect`. Removal is idempotent on the server side, so the
/// normal and forced paths may race harmlessly.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = SessionId::new();
    debug!("session {}: connected from {}", id, addr);

    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    let mut writer = FramedWrite::new(write_half, LinesCodec::new_with_max_length(MAX_LINE_LEN));

    let (name, outbound) =
        match handshake::negotiate(id, addr, &mut reader, &mut writer, &cmd_tx).await? {
            Handshake::Admitted { name, outbound } => (name, outbound),
            Handshake::Closed => {
                debug!("session {}: closed without admission", id);
                return Ok(());
            }
        };

    // The write half now belongs to the dispatcher; all further output
    // to this client flows through its queue.
    let dispatcher = tokio::spawn(dispatcher::run(id, outbound, writer));

    let mut interpreter = CommandInterpreter::new(name.clone(), cmd_tx.clone());
    let result = loop {
        match reader.next().await {
            Some(Ok(line)) => match interpreter.handle_line(&line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Disconnect) => break Ok(()),
                Err(e) => break Err(e),
            },
            Some(Err(e)) => {
                warn!("session {}: dirty disconnection from {}: {}", id, addr, e);
                break Ok(());
            }
            None => {
                warn!("session {}: dirty disconnection from {}", id, addr);
                break Ok(());
            }
        }
    };

    // Unregister tears down the queue, which ends the dispatcher.
    let _ = cmd_tx.send(ServerCommand::Remove { name: name.clone() }).await;
    let _ = dispatcher.await;

    info!("session {}: user {} disconnected", id, name);
    result
}
