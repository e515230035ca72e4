//! The backend seam between the session layer and the chat service.
//!
//! [`ChatBackend`] abstracts every server interaction the session performs,
//! so the session state machine can be driven in tests without a network.
//! [`ChatService`](crate::ChatService) is the production implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::types::{Chat, ChatCreateParams, Credentials, Message, MessageCreateParams, TokenResponse};

/// Server interactions required by the session layer.
///
/// Authenticated operations take the bearer token explicitly; the session
/// owns the token and decides when one is available.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse>;

    /// Creates a new user account.
    async fn register(&self, credentials: &Credentials) -> Result<()>;

    /// Lists the chats visible to the authenticated user.
    async fn list_chats(&self, token: &str) -> Result<Vec<Chat>>;

    /// Creates a new chat.
    async fn create_chat(&self, token: &str, params: &ChatCreateParams) -> Result<()>;

    /// Fetches the full message history of a chat.
    async fn list_messages(&self, token: &str, chat_id: u64) -> Result<Vec<Message>>;

    /// Submits a new message.
    async fn send_message(&self, token: &str, params: &MessageCreateParams) -> Result<()>;

    /// Returns the number of users currently online.
    async fn online_user_count(&self) -> Result<usize>;

    /// Opens a live update feed scoped to a chat.
    async fn open_live(&self, chat_id: u64) -> Result<LiveFeed>;
}

#[async_trait::async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse> {
        (**self).login(credentials).await
    }

    async fn register(&self, credentials: &Credentials) -> Result<()> {
        (**self).register(credentials).await
    }

    async fn list_chats(&self, token: &str) -> Result<Vec<Chat>> {
        (**self).list_chats(token).await
    }

    async fn create_chat(&self, token: &str, params: &ChatCreateParams) -> Result<()> {
        (**self).create_chat(token, params).await
    }

    async fn list_messages(&self, token: &str, chat_id: u64) -> Result<Vec<Message>> {
        (**self).list_messages(token, chat_id).await
    }

    async fn send_message(&self, token: &str, params: &MessageCreateParams) -> Result<()> {
        (**self).send_message(token, params).await
    }

    async fn online_user_count(&self) -> Result<usize> {
        (**self).online_user_count().await
    }

    async fn open_live(&self, chat_id: u64) -> Result<LiveFeed> {
        (**self).open_live(chat_id).await
    }
}

/// An event delivered over a live chat feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// A new message pushed by the server.
    Message(Message),

    /// The connection dropped; a reconnect attempt follows after `retry_in`.
    ConnectionLost {
        /// Delay before the next connect attempt.
        retry_in: Duration,
    },

    /// The connection was re-established after a drop.
    Reconnected,
}

/// Handle controlling the lifetime of a live feed's reader task.
///
/// Closing (or dropping) the handle aborts the task. In-flight events on the
/// old connection are not drained.
#[derive(Debug)]
pub struct LiveHandle {
    task: Option<JoinHandle<()>>,
}

impl LiveHandle {
    /// Wraps the reader task of a live feed.
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Aborts the reader task. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Returns true while the reader task has neither finished nor been
    /// closed.
    pub fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// A live update feed: a stream of [`LiveEvent`]s plus the handle that keeps
/// the underlying connection alive.
///
/// Splitting the feed lets the session retain the handle (to enforce the
/// single-connection invariant) while the event receiver moves to whatever
/// task renders the transcript.
#[derive(Debug)]
pub struct LiveFeed {
    events: mpsc::Receiver<LiveEvent>,
    handle: LiveHandle,
}

impl LiveFeed {
    /// Assembles a feed from an event receiver and a reader-task handle.
    pub fn from_parts(events: mpsc::Receiver<LiveEvent>, handle: LiveHandle) -> Self {
        Self { events, handle }
    }

    /// Splits the feed into its event receiver and task handle.
    pub fn split(self) -> (mpsc::Receiver<LiveEvent>, LiveHandle) {
        (self.events, self.handle)
    }

    /// Receives the next event, or `None` once the feed is closed.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }
}
