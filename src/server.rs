//! ChatServer actor implementation
//!
//! The central actor that owns the session registry and the message
//! router and processes commands from connection tasks over an mpsc
//! channel. Because all state mutation happens on this single task,
//! registration is atomic under concurrent attempts for the same name,
//! and a broadcast never interleaves with a structural change to the set
//! of queues it targets.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::protocol;
use crate::registry::SessionRegistry;
use crate::router::MessageRouter;
use crate::session::Session;

/// Commands sent from connection tasks to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Proposal-time check: is this name free right now?
    NameAvailable {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    /// Admit a session that completed the handshake: register the name,
    /// attach its outbound queue, and broadcast the join notice.
    /// Uniqueness is re-checked here; a lost race yields `NameTaken`.
    Admit {
        session: Session,
        outbound: mpsc::UnboundedSender<String>,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    /// Remove a session (normal disconnect or forced removal); idempotent
    Remove { name: String },
    /// Reply to `name` with the current roster, via its own queue
    Users { name: String },
    /// Whisper-target validation for `/whisper <name>`
    WhisperTargetExists {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    /// Deliver a whisper chat line to `to` and echo it to `from`.
    /// Replies `false` if the target vanished, in which case nothing was
    /// enqueued and the caller falls back to broadcast.
    WhisperChat {
        from: String,
        to: String,
        content: String,
        reply: oneshot::Sender<bool>,
    },
    /// Broadcast a chat line from `from` to every session
    Broadcast { from: String, content: String },
    /// Route a server reply line to the issuing session's own queue
    SelfNotice { name: String, line: String },
}

/// The main ChatServer actor
///
/// Composes the registry (who is online) and the router (their queues).
/// Register/unregister mutate both in one command, preserving the
/// queue-iff-registered invariant.
pub struct ChatServer {
    registry: SessionRegistry,
    router: MessageRouter,
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            router: MessageRouter::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::NameAvailable { name, reply } => {
                let _ = reply.send(!self.registry.contains(&name));
            }
            ServerCommand::Admit {
                session,
                outbound,
                reply,
            } => {
                let _ = reply.send(self.handle_admit(session, outbound));
            }
            ServerCommand::Remove { name } => {
                self.handle_remove(&name);
            }
            ServerCommand::Users { name } => {
                self.handle_users(&name);
            }
            ServerCommand::WhisperTargetExists { name, reply } => {
                let _ = reply.send(self.registry.contains(&name));
            }
            ServerCommand::WhisperChat {
                from,
                to,
                content,
                reply,
            } => {
                let _ = reply.send(self.handle_whisper_chat(&from, &to, &content));
            }
            ServerCommand::Broadcast { from, content } => {
                self.router.broadcast(&protocol::chat_line(&from, &content));
            }
            ServerCommand::SelfNotice { name, line } => {
                self.router.whisper(&name, line);
            }
        }
    }

    /// Register a session and attach its queue as one atomic step
    fn handle_admit(
        &mut self,
        session: Session,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Result<(), RegistryError> {
        let name = session.name.clone();
        let addr = session.addr;
        self.registry.register(session)?;
        self.router.attach(name.clone(), outbound);

        // Queue attached first, so the joiner sees its own join notice
        self.router.broadcast(&protocol::join_line(&name));

        info!("{} confirmed as user {}", addr, name);
        debug!("total sessions: {}", self.registry.len());
        Ok(())
    }

    /// Unregister a session and tear down its queue; idempotent
    ///
    /// The departure broadcast fires only when an entry was actually
    /// removed, so racing removals (normal `/disconnect` vs. forced
    /// cleanup after a read failure) announce the departure once.
    fn handle_remove(&mut self, name: &str) {
        let Some(session) = self.registry.unregister(name) else {
            return;
        };
        self.router.detach(name);
        self.router.broadcast(&protocol::leave_line(name));

        info!("user {} removed ({})", name, session.addr);
        debug!("total sessions: {}", self.registry.len());
    }

    /// Reply to `/users` through the caller's own queue
    fn handle_users(&mut self, name: &str) {
        let names = self.registry.names();
        self.router.whisper(name, protocol::users_line(&names, name));
    }

    /// Whisper delivery: echo to sender plus tagged line to target
    ///
    /// Both enqueues happen in this one command or not at all, keyed on
    /// whether the target is still registered.
    fn handle_whisper_chat(&mut self, from: &str, to: &str, content: &str) -> bool {
        if !self.registry.contains(to) {
            return false;
        }
        let line = protocol::whisper_line(from, content);
        self.router.whisper(from, line.clone());
        self.router.whisper(to, line);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;
    use std::net::SocketAddr;

    /// Spawn an actor and return its command sender
    fn spawn_server() -> mpsc::Sender<ServerCommand> {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatServer::new(cmd_rx).run());
        cmd_tx
    }

    /// Admit `name` and return its outbound queue receiver
    async fn admit(
        cmd_tx: &mpsc::Sender<ServerCommand>,
        name: &str,
    ) -> (Result<(), RegistryError>, mpsc::UnboundedReceiver<String>) {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let session = Session::new(SessionId::new(), name.to_string(), addr);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Admit {
                session,
                outbound: out_tx,
                reply: reply_tx,
            })
            .await
            .unwrap();
        (reply_rx.await.unwrap(), out_rx)
    }

    #[tokio::test]
    async fn test_admit_duplicate_name_rejected() {
        let cmd_tx = spawn_server();

        let (first, _rx_a) = admit(&cmd_tx, "bob").await;
        assert!(first.is_ok());

        let (second, _rx_b) = admit(&cmd_tx, "bob").await;
        assert_eq!(second, Err(RegistryError::NameTaken("bob".to_string())));

        // Retry with a fresh name succeeds
        let (third, _rx_c) = admit(&cmd_tx, "bob2").await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_join_notice_broadcast() {
        let cmd_tx = spawn_server();

        let (_, mut rx_a) = admit(&cmd_tx, "alice").await;
        // The joiner's queue is attached before the notice goes out
        let line = rx_a.recv().await.unwrap();
        assert!(line.contains("alice has joined the Chat Server"));

        let (_, mut rx_b) = admit(&cmd_tx, "bob").await;
        assert!(rx_a
            .recv()
            .await
            .unwrap()
            .contains("bob has joined the Chat Server"));
        assert!(rx_b
            .recv()
            .await
            .unwrap()
            .contains("bob has joined the Chat Server"));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_once() {
        let cmd_tx = spawn_server();

        let (_, mut rx_a) = admit(&cmd_tx, "a").await;
        let (_, mut rx_b) = admit(&cmd_tx, "b").await;
        let (_, mut rx_c) = admit(&cmd_tx, "c").await;

        cmd_tx
            .send(ServerCommand::Broadcast {
                from: "a".to_string(),
                content: "hi".to_string(),
            })
            .await
            .unwrap();

        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            // Skip join notices, then expect exactly one chat line
            let line = loop {
                let line = rx.recv().await.unwrap();
                if !line.contains("has joined") {
                    break line;
                }
            };
            assert!(line.contains("| a]"));
            assert!(line.ends_with(" hi"));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_whisper_round_trip() {
        let cmd_tx = spawn_server();

        let (_, mut rx_x) = admit(&cmd_tx, "x").await;
        let (_, mut rx_y) = admit(&cmd_tx, "y").await;

        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::WhisperChat {
                from: "x".to_string(),
                to: "y".to_string(),
                content: "hello".to_string(),
                reply: reply_tx,
            })
            .await
            .unwrap();
        assert!(reply_rx.await.unwrap());

        for rx in [&mut rx_x, &mut rx_y] {
            let line = loop {
                let line = rx.recv().await.unwrap();
                if !line.contains("has joined") {
                    break line;
                }
            };
            assert!(line.contains("| x]"));
            assert!(line.contains("(whispering...) hello"));
        }
    }

    #[tokio::test]
    async fn test_whisper_to_vanished_target() {
        let cmd_tx = spawn_server();

        let (_, mut rx_x) = admit(&cmd_tx, "x").await;
        let (_, _rx_y) = admit(&cmd_tx, "y").await;

        cmd_tx
            .send(ServerCommand::Remove {
                name: "y".to_string(),
            })
            .await
            .unwrap();

        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::WhisperChat {
                from: "x".to_string(),
                to: "y".to_string(),
                content: "anyone?".to_string(),
                reply: reply_tx,
            })
            .await
            .unwrap();
        assert!(!reply_rx.await.unwrap());

        // Nothing was echoed to the sender either
        while let Ok(line) = rx_x.try_recv() {
            assert!(!line.contains("anyone?"));
        }
    }

    #[tokio::test]
    async fn test_remove_idempotent_single_notice() {
        let cmd_tx = spawn_server();

        let (_, _rx_gone) = admit(&cmd_tx, "gone").await;
        let (_, mut rx_w) = admit(&cmd_tx, "watcher").await;

        for _ in 0..2 {
            cmd_tx
                .send(ServerCommand::Remove {
                    name: "gone".to_string(),
                })
                .await
                .unwrap();
        }
        // Removing a name that never existed is also a no-op
        cmd_tx
            .send(ServerCommand::Remove {
                name: "never".to_string(),
            })
            .await
            .unwrap();

        cmd_tx
            .send(ServerCommand::Broadcast {
                from: "watcher".to_string(),
                content: "done".to_string(),
            })
            .await
            .unwrap();

        let mut departures = 0;
        loop {
            let line = rx_w.recv().await.unwrap();
            if line.contains("has disconnected") {
                departures += 1;
            }
            if line.ends_with(" done") {
                break;
            }
        }
        assert_eq!(departures, 1);
    }

    #[tokio::test]
    async fn test_users_reply_annotates_caller() {
        let cmd_tx = spawn_server();

        let (_, _rx_a) = admit(&cmd_tx, "alice").await;
        let (_, mut rx_b) = admit(&cmd_tx, "bob").await;

        cmd_tx
            .send(ServerCommand::Users {
                name: "bob".to_string(),
            })
            .await
            .unwrap();

        let line = loop {
            let line = rx_b.recv().await.unwrap();
            if line.starts_with("USERS: ") {
                break line;
            }
        };
        assert_eq!(line, "USERS: alice, bob (YOU)");
    }

    #[tokio::test]
    async fn test_self_notice_routed_through_queue() {
        let cmd_tx = spawn_server();
        let (_, mut rx) = admit(&cmd_tx, "solo").await;

        cmd_tx
            .send(ServerCommand::SelfNotice {
                name: "solo".to_string(),
                line: protocol::HELP_LINE.to_string(),
            })
            .await
            .unwrap();

        let line = loop {
            let line = rx.recv().await.unwrap();
            if !line.contains("has joined") {
                break line;
            }
        };
        assert_eq!(line, protocol::HELP_LINE);
    }

    #[tokio::test]
    async fn test_name_available() {
        let cmd_tx = spawn_server();
        let (_, _rx) = admit(&cmd_tx, "taken").await;

        for (name, expected) in [("taken", false), ("free", true)] {
            let (reply_tx, reply_rx) = oneshot::channel();
            cmd_tx
                .send(ServerCommand::NameAvailable {
                    name: name.to_string(),
                    reply: reply_tx,
                })
                .await
                .unwrap();
            assert_eq!(reply_rx.await.unwrap(), expected);
        }
    }
}
