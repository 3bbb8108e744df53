//! CommandInterpreter: post-admission line dispatch
//!
//! Runs per admitted connection, one inbound line at a time, translating
//! commands and chat text into `ServerCommand`s. Whisper mode is
//! per-connection state held here, never in the registry.
//!
//! Every reply to the issuing connection goes through the router as a
//! whisper to self, so reply lines never bypass the per-session
//! queue/dispatcher pipeline.

use tokio::sync::{mpsc, oneshot};

use crate::error::AppError;
use crate::protocol::{self, Directive};
use crate::server::ServerCommand;

/// What the connection loop should do after a line is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Disconnect,
}

/// Per-connection command dispatcher
#[derive(Debug)]
pub struct CommandInterpreter {
    /// This connection's registered name
    name: String,
    /// Active whisper target, if any
    whisper_to: Option<String>,
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl CommandInterpreter {
    pub fn new(name: String, cmd_tx: mpsc::Sender<ServerCommand>) -> Self {
        Self {
            name,
            whisper_to: None,
            cmd_tx,
        }
    }

    /// Whether whisper mode is currently active
    pub fn is_whispering(&self) -> bool {
        self.whisper_to.is_some()
    }

    /// Handle one inbound line
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow, AppError> {
        match Directive::parse(line) {
            Directive::Disconnect => return Ok(Flow::Disconnect),
            Directive::Users => {
                self.send(ServerCommand::Users {
                    name: self.name.clone(),
                })
                .await?;
            }
            Directive::Whisper(arg) => self.handle_whisper_arg(arg).await?,
            Directive::Help => self.notify_self(protocol::HELP_LINE.to_string()).await?,
            // `/username` has no meaning after admission
            Directive::Unknown | Directive::Username(_) => {
                self.notify_self(protocol::INVALID_COMMAND_LINE.to_string())
                    .await?;
            }
            Directive::Chat(text) => self.handle_chat(text).await?,
            Directive::Empty => {}
        }
        Ok(Flow::Continue)
    }

    /// `/whisper <arg>`: usage error, `off`, or a target name
    async fn handle_whisper_arg(&mut self, arg: String) -> Result<(), AppError> {
        if arg.is_empty() {
            return self.notify_self(protocol::ERR_WHISPER_USAGE.to_string()).await;
        }

        if self.is_whispering() && arg == "off" {
            // take() cannot fail here; is_whispering just checked it
            if let Some(prior) = self.whisper_to.take() {
                self.notify_self(protocol::whisper_stopped_line(&prior)).await?;
            }
            return Ok(());
        }

        if arg == self.name {
            return self.notify_self(protocol::ERR_WHISPER_SELF.to_string()).await;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(ServerCommand::WhisperTargetExists {
            name: arg.clone(),
            reply: reply_tx,
        })
        .await?;
        if !reply_rx.await.map_err(|_| AppError::ChannelSend)? {
            return self.notify_self(protocol::no_such_user_line(&arg)).await;
        }

        self.notify_self(protocol::whisper_started_line(&arg)).await?;
        self.whisper_to = Some(arg);
        Ok(())
    }

    /// Plain text: whisper to the active target, or broadcast
    ///
    /// If the whisper target vanished, whisper mode is deactivated and
    /// the text falls through to a normal broadcast.
    async fn handle_chat(&mut self, text: String) -> Result<(), AppError> {
        if let Some(target) = self.whisper_to.clone() {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.send(ServerCommand::WhisperChat {
                from: self.name.clone(),
                to: target,
                content: text.clone(),
                reply: reply_tx,
            })
            .await?;
            if reply_rx.await.map_err(|_| AppError::ChannelSend)? {
                return Ok(());
            }
            self.whisper_to = None;
        }

        self.send(ServerCommand::Broadcast {
            from: self.name.clone(),
            content: text,
        })
        .await
    }

    /// Reply to this connection via its own outbound queue
    async fn notify_self(&self, line: String) -> Result<(), AppError> {
        self.send(ServerCommand::SelfNotice {
            name: self.name.clone(),
            line,
        })
        .await
    }

    async fn send(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.cmd_tx.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }
}
