//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending a message to the
//! active chat.

/// A parsed chat command.
///
/// These commands control the session and are never sent to a chat.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Exchange credentials for a session token.
    Login {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },

    /// Create a new account.
    Register {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },

    /// Refresh and list the chat directory.
    Chats,

    /// Open a chat by id.
    Open(u64),

    /// Create a new group chat.
    Create(String),

    /// Show the online user count.
    Who,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a message to the active chat.
///
/// # Examples
///
/// ```
/// # use palaver::chat::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/open 3"), Some(ChatCommand::Open(3)));
/// assert!(parse_command("hello, everyone").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "login" => parse_credentials(argument, ChatCommand::make_login, "/login"),
        "register" => parse_credentials(argument, ChatCommand::make_register, "/register"),
        "chats" => ChatCommand::Chats,
        "open" => match argument {
            Some(arg) => match arg.parse::<u64>() {
                Ok(id) => ChatCommand::Open(id),
                Err(_) => ChatCommand::Invalid("/open expects a numeric chat id".to_string()),
            },
            None => ChatCommand::Invalid("/open requires a chat id".to_string()),
        },
        "create" => match argument {
            Some(name) => ChatCommand::Create(name.to_string()),
            None => ChatCommand::Invalid("/create requires a chat name".to_string()),
        },
        "who" | "online" => ChatCommand::Who,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

impl ChatCommand {
    fn make_login(username: String, password: String) -> ChatCommand {
        ChatCommand::Login { username, password }
    }

    fn make_register(username: String, password: String) -> ChatCommand {
        ChatCommand::Register { username, password }
    }
}

fn parse_credentials<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(String, String) -> ChatCommand,
{
    let Some(arg) = argument else {
        return ChatCommand::Invalid(format!("{name} requires a username and a password"));
    };

    let mut parts = arg.splitn(2, ' ');
    let username = parts.next().unwrap();
    let Some(password) = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return ChatCommand::Invalid(format!("{name} requires a username and a password"));
    };
    constructor(username.to_string(), password.to_string())
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /login <user> <pass>   Sign in and load your chats
  /register <user> <pass> Create a new account
  /chats                 Refresh and list the chat directory
  /open <id>             Open a chat and follow it live
  /create <name>         Create a new group chat
  /who                   Show how many users are online
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat

Anything that does not start with / is sent to the open chat."#
}
