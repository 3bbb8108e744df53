//! OutputDispatcher: per-session outbound delivery loop
//!
//! One task per admitted session. Awaiting the queue receiver replaces
//! the busy-poll a naive implementation would use: the task sleeps until
//! a line is enqueued or the router drops the sender on unregister, at
//! which point `recv` yields `None` and the loop exits.
//!
//! The dispatcher never mutates the registry; removal is the inbound
//! side's responsibility.

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tracing::debug;

use crate::types::SessionId;

/// Drain a session's outbound queue into its connection
///
/// Terminates on queue teardown or write failure and closes the write
/// path either way.
pub async fn run<W>(
    id: SessionId,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut writer: FramedWrite<W, LinesCodec>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbound.recv().await {
        if let Err(e) = writer.send(line).await {
            debug!("session {}: write failed, dispatcher exiting: {}", id, e);
            break;
        }
    }

    // LinesCodec encodes any AsRef<str>, so the item type must be named
    let _ = SinkExt::<String>::close(&mut writer).await;
    debug!("session {}: dispatcher ended", id);
}
