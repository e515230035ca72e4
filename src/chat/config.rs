//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration for a client run.

use std::time::Duration;

use arrrg_derive::CommandLine;

/// Default HTTP request timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Command-line arguments for the palaver-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat API.
    #[arrrg(optional, "Base URL of the chat API (default: $PALAVER_URL)", "URL")]
    pub url: Option<String>,

    /// HTTP request timeout in seconds.
    #[arrrg(optional, "HTTP request timeout in seconds (default: 30)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a client run.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the chat API. `None` defers to the PALAVER_URL
    /// environment variable.
    pub base_url: Option<String>,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: taken from the environment
    /// - Timeout: 30 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
        }
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            base_url: args.url,
            timeout: Duration::from_secs(args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let args = ChatArgs::default();
        let config = ChatConfig::from(args);
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            url: Some("https://chat.example.com/api".to_string()),
            timeout: Some(5),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(
            config.base_url,
            Some("https://chat.example.com/api".to_string())
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://localhost:8000/api")
            .with_timeout(Duration::from_secs(10))
            .without_color();
        assert_eq!(config.base_url, Some("http://localhost:8000/api".to_string()));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.use_color);
    }
}
