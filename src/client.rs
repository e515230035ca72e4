//! HTTP client for the chat service.
//!
//! [`ChatService`] speaks the service's REST surface: credential exchange,
//! registration, the chat directory, message history and submission, and the
//! online-user count. It also opens live feeds by deriving the WebSocket
//! address from its base URL. Session state (the bearer token, the active
//! chat) lives in [`ClientSession`](crate::chat::ClientSession), not here.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use url::Url;

use crate::backend::{ChatBackend, LiveFeed};
use crate::error::{Error, Result};
use crate::live;
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_ERRORS};
use crate::types::{Chat, ChatCreateParams, Credentials, Message, MessageCreateParams, TokenResponse};

/// Environment variable consulted when no base URL is given explicitly.
const BASE_URL_ENV: &str = "PALAVER_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the chat service HTTP API.
#[derive(Debug, Clone)]
pub struct ChatService {
    base_url: Url,
    client: ReqwestClient,
    timeout: Duration,
}

impl ChatService {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the PALAVER_URL
    /// environment variable.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with a custom request timeout.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).map_err(|_| {
                Error::validation(
                    "base URL not provided and PALAVER_URL environment variable not set",
                    Some("base_url".to_string()),
                )
            })?,
        };
        let base_url = normalize_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    /// The normalized API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Headers for an authenticated request.
    fn bearer_headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            Error::validation(
                "token contains characters not permitted in a header",
                Some("token".to_string()),
            )
        })?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Classify a transport-level failure from reqwest.
    fn transport_error(&self, err: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if err.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", err),
                Some(self.timeout.as_secs_f64()),
            )
        } else if err.is_connect() {
            Error::connection(format!("Connection error: {}", err), Some(Box::new(err)))
        } else {
            Error::http_client(format!("Request failed: {}", err), Some(Box::new(err)))
        }
    }

    /// Process a non-OK response into our Error type.
    ///
    /// The server reports failures as JSON `{"detail": "..."}`. Anything
    /// else (validation error arrays, HTML error pages, empty bodies) falls
    /// back to a generic message for the status.
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: Option<serde_json::Value>,
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.detail)
            .and_then(|d| d.as_str().map(String::from))
            .unwrap_or_else(|| format!("request failed with status {status_code}"));

        match status_code {
            401 | 403 => Error::authentication(detail),
            404 => Error::not_found(detail),
            408 => Error::timeout(detail, None),
            500..=599 => Error::internal_server(detail),
            _ => Error::api(status_code, detail),
        }
    }

    /// Returns the response if OK, otherwise the processed error.
    async fn ok_or_error(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::process_error_response(response).await)
        }
    }

    fn parse_error(what: &str, err: reqwest::Error) -> Error {
        Error::serialization(
            format!("Failed to parse {what}: {err}"),
            Some(Box::new(err)),
        )
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatService {
    /// Exchange credentials for a bearer token.
    ///
    /// The request is form-urlencoded, unlike every other write on this API.
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse> {
        let url = self.endpoint("token")?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .form(credentials)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::ok_or_error(response).await?;
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Self::parse_error("token response", e))
    }

    async fn register(&self, credentials: &Credentials) -> Result<()> {
        let url = self.endpoint("register/")?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        // The success body is ignored beyond the status.
        Self::ok_or_error(response).await.map(|_| ())
    }

    async fn list_chats(&self, token: &str) -> Result<Vec<Chat>> {
        let url = self.endpoint("chats/")?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .get(url)
            .headers(Self::bearer_headers(token)?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::ok_or_error(response).await?;
        response
            .json::<Vec<Chat>>()
            .await
            .map_err(|e| Self::parse_error("chat list", e))
    }

    async fn create_chat(&self, token: &str, params: &ChatCreateParams) -> Result<()> {
        let url = self.endpoint("chats/")?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .headers(Self::bearer_headers(token)?)
            .json(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::ok_or_error(response).await.map(|_| ())
    }

    async fn list_messages(&self, token: &str, chat_id: u64) -> Result<Vec<Message>> {
        let url = self.endpoint(&format!("messages/{chat_id}"))?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .get(url)
            .headers(Self::bearer_headers(token)?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::ok_or_error(response).await?;
        response
            .json::<Vec<Message>>()
            .await
            .map_err(|e| Self::parse_error("message history", e))
    }

    async fn send_message(&self, token: &str, params: &MessageCreateParams) -> Result<()> {
        let url = self.endpoint("messages/")?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .headers(Self::bearer_headers(token)?)
            .json(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::ok_or_error(response).await.map(|_| ())
    }

    /// The count is the length of the returned array; its element shape is
    /// unspecified and ignored.
    async fn online_user_count(&self) -> Result<usize> {
        let url = self.endpoint("online-users/")?;
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::ok_or_error(response).await?;
        let users = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| Self::parse_error("online user list", e))?;
        Ok(users.len())
    }

    async fn open_live(&self, chat_id: u64) -> Result<LiveFeed> {
        let url = live::live_url(&self.base_url, chat_id)?;
        Ok(live::open(url))
    }
}

/// Parses a base URL and ensures its path ends with a slash, so that
/// relative joins extend the path instead of replacing its last segment.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(
            format!("base URL {base_url:?} cannot carry endpoint paths"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ChatService::new(Some("http://localhost:8000/api".to_string())).unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = ChatService::with_options(
            Some("https://chat.example.com/api/".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://chat.example.com/api/");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        assert!(ChatService::new(Some("not a url".to_string())).is_err());
        assert!(ChatService::new(Some("data:text/plain,hi".to_string())).is_err());
    }

    #[test]
    fn test_endpoints_extend_the_base_path() {
        let client = ChatService::new(Some("http://localhost:8000/api".to_string())).unwrap();
        assert_eq!(
            client.endpoint("token").unwrap().as_str(),
            "http://localhost:8000/api/token"
        );
        assert_eq!(
            client.endpoint("chats/").unwrap().as_str(),
            "http://localhost:8000/api/chats/"
        );
        assert_eq!(
            client.endpoint("messages/7").unwrap().as_str(),
            "http://localhost:8000/api/messages/7"
        );
    }

    #[test]
    fn test_bearer_headers() {
        let headers = ChatService::bearer_headers("tok123").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok123");
        assert!(ChatService::bearer_headers("bad\ntoken").is_err());
    }
}
