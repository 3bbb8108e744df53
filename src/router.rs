//! MessageRouter: per-session outbound queues and enqueue operations
//!
//! Each registered session owns exactly one outbound queue, an unbounded
//! mpsc channel. The sender half lives here; the receiver half is drained
//! by that session's output dispatcher. Dropping the sender on `detach` is
//! the queue-teardown signal the dispatcher observes.
//!
//! FIFO ordering within a queue is the channel's ordering; nothing is
//! guaranteed across different recipients' queues.

use std::collections::HashMap;

use tokio::sync::mpsc;

/// Routes lines into per-session outbound queues
///
/// Owned by the `ChatServer` actor together with the registry; attach and
/// detach are only called in the same command that registers or
/// unregisters the name, so a queue exists if and only if its name is
/// registered.
#[derive(Debug, Default)]
pub struct MessageRouter {
    queues: HashMap<String, mpsc::UnboundedSender<String>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the queue handle for a newly registered session
    pub fn attach(&mut self, name: String, tx: mpsc::UnboundedSender<String>) {
        self.queues.insert(name, tx);
    }

    /// Tear down a session's queue; idempotent
    ///
    /// Dropping the sender wakes the session's dispatcher with channel
    /// closure so it exits promptly instead of waiting forever.
    pub fn detach(&mut self, name: &str) -> bool {
        self.queues.remove(name).is_some()
    }

    /// Enqueue a line onto every current queue
    ///
    /// The actor processes no structural change mid-call, so the
    /// membership this iterates is a consistent snapshot: a session
    /// joining concurrently misses the line entirely rather than
    /// observing a partially applied broadcast.
    pub fn broadcast(&self, line: &str) {
        for tx in self.queues.values() {
            // A send failure means the dispatcher already died; its
            // session is about to be removed, so the miss is expected.
            let _ = tx.send(line.to_string());
        }
    }

    /// Enqueue a line for exactly one session
    ///
    /// Returns `false` without side effects if the target is no longer
    /// attached; the caller treats a vanished target as "whisper session
    /// ended".
    pub fn whisper(&self, name: &str, line: String) -> bool {
        match self.queues.get(name) {
            Some(tx) => tx.send(line).is_ok(),
            None => false,
        }
    }

}
