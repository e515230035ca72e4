use serde::{Deserialize, Serialize};

/// Response to a successful credential exchange.
///
/// An OK response that carries no token (or an empty one) is still a login
/// failure; the session layer enforces that rule, so `access_token` defaults
/// to empty rather than failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The opaque bearer token.
    #[serde(default)]
    pub access_token: String,
    /// Token scheme reported by the server, typically "bearer".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Creates a response carrying the given bearer token.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Some("bearer".to_string()),
        }
    }
}
