//! Output rendering for the terminal chat client.
//!
//! This module provides the renderer trait and plain-text implementation
//! used by the chat binary, plus the formatting helpers shared with the
//! live-feed printer task.

use std::io::{self, Stdout, Write};

use crate::backend::LiveEvent;
use crate::types::Message;

/// ANSI escape code for cyan text (used for author names).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for dim text (used for notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Formats a message as a transcript line.
pub fn format_message(message: &Message, use_color: bool) -> String {
    if use_color {
        format!(
            "{ANSI_CYAN}{}{ANSI_RESET}: {}",
            message.user.username, message.content
        )
    } else {
        format!("{}: {}", message.user.username, message.content)
    }
}

/// Formats a live event as a transcript line.
pub fn format_live_event(event: &LiveEvent, use_color: bool) -> String {
    match event {
        LiveEvent::Message(message) => format_message(message, use_color),
        LiveEvent::ConnectionLost { retry_in } => dim(
            &format!("[live channel lost; retrying in {}s]", retry_in.as_secs()),
            use_color,
        ),
        LiveEvent::Reconnected => dim("[live channel reconnected]", use_color),
    }
}

fn dim(text: &str, use_color: bool) -> String {
    if use_color {
        format!("{ANSI_DIM}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

/// Trait for rendering chat output.
///
/// This abstraction keeps the session and command handling independent of
/// how output reaches the user (styled stdout, plain stdout for piping, or
/// a capture buffer in tests).
pub trait Renderer: Send {
    /// Print a single transcript line for a message.
    fn print_message(&mut self, message: &Message);

    /// Print a full message history, oldest first.
    fn print_transcript(&mut self, messages: &[Message]) {
        for message in messages {
            self.print_message(message);
        }
    }

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a dimmed, non-critical notice.
    fn print_notice(&mut self, notice: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            use_color: true,
        }
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        println!("{}", format_message(message, self.use_color));
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn print_notice(&mut self, notice: &str) {
        println!("{}", dim(notice, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("Error: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn message(username: &str, content: &str) -> Message {
        Message {
            content: content.to_string(),
            user: User::new(username),
            chat_id: None,
        }
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn message_lines_without_color() {
        let line = format_message(&message("alice", "hello"), false);
        assert_eq!(line, "alice: hello");
    }

    #[test]
    fn message_lines_with_color_wrap_the_author() {
        let line = format_message(&message("alice", "hello"), true);
        assert!(line.starts_with(ANSI_CYAN));
        assert!(line.ends_with(": hello"));
    }

    #[test]
    fn live_event_lines() {
        let event = LiveEvent::Message(message("bob", "hi"));
        assert_eq!(format_live_event(&event, false), "bob: hi");

        let event = LiveEvent::ConnectionLost {
            retry_in: std::time::Duration::from_secs(4),
        };
        assert_eq!(
            format_live_event(&event, false),
            "[live channel lost; retrying in 4s]"
        );

        assert_eq!(
            format_live_event(&LiveEvent::Reconnected, false),
            "[live channel reconnected]"
        );
    }
}
