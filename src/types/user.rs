use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum username length, in characters.
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length, in characters.
pub const USERNAME_MAX_LEN: usize = 50;

/// Minimum password length, in characters.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Maximum password length, in characters.
pub const PASSWORD_MAX_LEN: usize = 72;

/// A user as reported by the server.
///
/// The wire shape carries additional fields (numeric id, membership data)
/// which the client does not use and does not model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user's login name.
    pub username: String,
}

impl User {
    /// Creates a new User with the given username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// A username/password pair for credential exchange.
///
/// Credentials are transient: they are constructed from user input, sent in
/// a login or registration request, and dropped. They are never stored in
/// session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// The login name.
    pub username: String,
    /// The password.
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Validates the length constraints on both fields.
    ///
    /// This is a purely local check and must pass before any request is
    /// issued. Lengths are measured in characters, not bytes.
    pub fn validate(&self) -> Result<()> {
        let username_len = self.username.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
            return Err(Error::validation(
                format!(
                    "username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
                ),
                Some("username".to_string()),
            ));
        }
        let password_len = self.password.chars().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password_len) {
            return Err(Error::validation(
                format!(
                    "password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"
                ),
                Some("password".to_string()),
            ));
        }
        Ok(())
    }
}
