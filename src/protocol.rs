//! Wire protocol: inbound directive parsing and outbound line formatting
//!
//! Every application-level message is exactly one text line. Directives are
//! case-sensitive, dispatched on the line's leading `/`-prefixed token.
//! Server control replies reuse the `/` convention (the client filters them
//! from plain display); everything else is human-readable chat text.

use chrono::Local;

/// Handshake acceptance reply, server -> client
pub const NAME_ACCEPTED: &str = "/username accepted";
/// Handshake confirmation token, client -> server (matched as an exact line)
pub const NAME_CONFIRMED: &str = "/username confirmed";

pub const ERR_INVALID_USERNAME: &str = "ERROR: Invalid Username";
pub const ERR_NAME_TAKEN: &str = "ERROR: Username already taken";
pub const ERR_WHISPER_USAGE: &str = "ERROR: Correct usage: /whisper [name|off]";
pub const ERR_WHISPER_SELF: &str = "ERROR: You cannot whisper yourself";
pub const HELP_LINE: &str = "COMMANDS: /disconnect, /help, /users, /whisper [name|off]";
pub const INVALID_COMMAND_LINE: &str = "WARNING: Invalid Command | Use [/help] to see all commands";

/// A parsed inbound line
///
/// `Username` carries the candidate name (possibly empty, which the
/// handshake rejects). `Whisper` carries the raw argument; interpretation
/// ("off", a name, or missing) is the interpreter's job, since it depends
/// on per-connection whisper state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Disconnect,
    Username(String),
    Users,
    Whisper(String),
    Help,
    /// Any other `/`-prefixed token
    Unknown,
    /// Non-empty plain chat text
    Chat(String),
    Empty,
}

impl Directive {
    /// Parse one inbound line (newline already stripped by the codec)
    pub fn parse(line: &str) -> Self {
        if line.is_empty() {
            return Directive::Empty;
        }
        if !line.starts_with('/') {
            return Directive::Chat(line.to_string());
        }

        let (token, rest) = match line.split_once(' ') {
            Some((token, rest)) => (token, rest),
            None => (line, ""),
        };

        match token {
            "/disconnect" => Directive::Disconnect,
            "/username" => Directive::Username(rest.trim().to_string()),
            "/users" => Directive::Users,
            "/whisper" => Directive::Whisper(rest.trim().to_string()),
            "/help" => Directive::Help,
            _ => Directive::Unknown,
        }
    }
}

/// Current local time in the bracketed-prefix format
fn timestamp() -> String {
    Local::now().format("%a %b %e %T %Y").to_string()
}

/// System broadcast for a session joining
pub fn join_line(name: &str) -> String {
    format!("[{}] {} has joined the Chat Server", timestamp(), name)
}

/// System broadcast for a session leaving
pub fn leave_line(name: &str) -> String {
    format!("[{}] {} has disconnected from the Chat Server", timestamp(), name)
}

/// A plain chat line, tagged with sender and timestamp
pub fn chat_line(sender: &str, text: &str) -> String {
    format!("[{} | {}] {}", timestamp(), sender, text)
}

/// A whisper chat line; same shape as `chat_line` plus the whisper tag
pub fn whisper_line(sender: &str, text: &str) -> String {
    format!("[{} | {}] (whispering...) {}", timestamp(), sender, text)
}

/// The `/users` reply: insertion-ordered roster with the caller annotated
pub fn users_line(names: &[String], own: &str) -> String {
    let roster = names
        .iter()
        .map(|name| {
            if name == own {
                format!("{name} (YOU)")
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("USERS: {roster}")
}

pub fn whisper_started_line(target: &str) -> String {
    format!("You are now whispering with [{target}]. To stop whispering use [/whisper off]")
}

pub fn whisper_stopped_line(target: &str) -> String {
    format!("You are no longer whispering with [{target}]")
}

pub fn no_such_user_line(name: &str) -> String {
    format!("ERROR: User [{name}] does not exist")
}
