//! Chat application module for the interactive terminal client.
//!
//! This module provides the session layer and REPL plumbing built on top of
//! the palaver client library. It supports:
//!
//! - Credential exchange and registration with local validation
//! - A chat directory, message history, and message submission
//! - A live feed per open chat, rendered while the prompt is active
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core session state machine and backend interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use session::{ActiveChat, ClientSession, LoginOutcome, SessionStats, SessionView};
