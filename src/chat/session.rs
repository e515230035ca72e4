//! Core client session management.
//!
//! This module provides [`ClientSession`], which owns the ephemeral session
//! state (bearer token, active chat, live-feed handle) and mediates between
//! user commands and the backend.
//!
//! The session is a small state machine. It starts unauthenticated; a
//! successful credential exchange moves it to the chat directory; opening a
//! chat moves it to the chat view. Any failed authenticated call is
//! interpreted as session expiry and drops the session back to
//! unauthenticated, clearing the token.

use tokio::sync::mpsc;

use crate::backend::{ChatBackend, LiveEvent, LiveHandle};
use crate::client::ChatService;
use crate::error::{Error, Result};
use crate::observability::{PRESENCE_ERRORS, SESSION_EXPIRIES};
use crate::types::{Chat, ChatCreateParams, Credentials, Message, MessageCreateParams};

/// The view a UI should present for the current session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    /// No valid token; show the login/registration surface.
    Unauthenticated,
    /// Authenticated with no chat open; show the chat directory.
    ChatList,
    /// Authenticated with a chat open; show its transcript.
    ChatOpen,
}

/// The chat currently open in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChat {
    /// Server-assigned chat identifier.
    pub id: u64,
    /// Display name of the chat.
    pub name: String,
}

/// Result of a successful login, covering the side-effect loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Number of chats in the freshly loaded directory.
    pub chat_count: usize,
    /// Online user count, when the presence load succeeded.
    pub online_users: Option<usize>,
}

/// Aggregated stats for a client session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The view matching the current state.
    pub view: SessionView,
    /// The open chat, if any.
    pub active_chat: Option<ActiveChat>,
    /// Number of chats in the last loaded directory.
    pub chat_count: usize,
    /// Number of messages in the last loaded history.
    pub history_len: usize,
    /// Total backend requests issued by this session.
    pub request_count: u64,
}

/// A client session over a [`ChatBackend`].
///
/// All durable state lives server-side; the session holds only what is
/// needed to issue the next request and render the current view.
pub struct ClientSession<B: ChatBackend = ChatService> {
    backend: B,
    token: Option<String>,
    active_chat: Option<ActiveChat>,
    live: Option<LiveHandle>,
    chats: Vec<Chat>,
    history: Vec<Message>,
    request_count: u64,
}

impl<B: ChatBackend> ClientSession<B> {
    /// Creates a new, unauthenticated session over the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            token: None,
            active_chat: None,
            live: None,
            chats: Vec::new(),
            history: Vec::new(),
            request_count: 0,
        }
    }

    /// The view a UI should present right now.
    pub fn view(&self) -> SessionView {
        if self.token.is_none() {
            SessionView::Unauthenticated
        } else if self.active_chat.is_some() {
            SessionView::ChatOpen
        } else {
            SessionView::ChatList
        }
    }

    /// Returns true while the session holds a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The last loaded chat directory.
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    /// The last loaded message history of the open chat.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The open chat, if any.
    pub fn active_chat(&self) -> Option<&ActiveChat> {
        self.active_chat.as_ref()
    }

    /// Exchanges credentials for a session token.
    ///
    /// Length constraints are validated locally first; a violation is
    /// rejected without any backend call. On success the chat directory and
    /// the online-user count are loaded as side effects: a directory
    /// failure propagates (and expires the fresh session), while a presence
    /// failure is recorded and reported as `None`.
    ///
    /// On any failure the session is reset to unauthenticated.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginOutcome> {
        let credentials = Credentials::new(username, password);
        credentials.validate()?;

        self.request_count += 1;
        let response = match self.backend.login(&credentials).await {
            Ok(response) => response,
            Err(err) => {
                self.expire();
                return Err(err);
            }
        };
        if response.access_token.is_empty() {
            self.expire();
            return Err(Error::authentication(
                "login succeeded but the response carried no access token",
            ));
        }
        self.token = Some(response.access_token);

        self.load_chats().await?;

        self.request_count += 1;
        let online_users = match self.backend.online_user_count().await {
            Ok(count) => Some(count),
            // Presence is a non-critical indicator; its failure never
            // disturbs a fresh login.
            Err(_) => {
                PRESENCE_ERRORS.click();
                None
            }
        };

        Ok(LoginOutcome {
            chat_count: self.chats.len(),
            online_users,
        })
    }

    /// Creates a new account. Does not log in.
    ///
    /// Applies the same local validation as [`login`](Self::login).
    pub async fn register(&mut self, username: &str, password: &str) -> Result<()> {
        let credentials = Credentials::new(username, password);
        credentials.validate()?;
        self.request_count += 1;
        self.backend.register(&credentials).await
    }

    /// Reloads the chat directory, replacing it entirely.
    ///
    /// Without a token this reverts to the unauthenticated view and issues
    /// no request. A failed request is treated as session expiry.
    pub async fn load_chats(&mut self) -> Result<()> {
        let token = self.require_token()?;
        self.request_count += 1;
        match self.backend.list_chats(&token).await {
            Ok(chats) => {
                self.chats = chats;
                Ok(())
            }
            Err(err) => {
                self.expire();
                Err(err)
            }
        }
    }

    /// Opens a chat: loads its full history and subscribes to its live feed.
    ///
    /// Any previously open live feed is closed before the new one is
    /// opened, so at most one live connection exists at any instant. The
    /// returned receiver delivers the new chat's [`LiveEvent`]s; it ends
    /// when the chat is closed or replaced.
    ///
    /// A failed history load is treated as session expiry.
    pub async fn open_chat(
        &mut self,
        chat_id: u64,
        chat_name: &str,
    ) -> Result<mpsc::Receiver<LiveEvent>> {
        let token = self.require_token()?;

        // Tear down the previous feed before anything else so two live
        // connections never overlap.
        if let Some(mut live) = self.live.take() {
            live.close();
        }
        self.active_chat = None;

        self.request_count += 1;
        match self.backend.list_messages(&token, chat_id).await {
            Ok(messages) => {
                self.history = messages;
            }
            Err(err) => {
                self.expire();
                return Err(err);
            }
        }
        self.active_chat = Some(ActiveChat {
            id: chat_id,
            name: chat_name.to_string(),
        });

        let feed = self.backend.open_live(chat_id).await?;
        let (events, handle) = feed.split();
        self.live = Some(handle);
        Ok(events)
    }

    /// Submits a message to the open chat.
    ///
    /// Returns `Ok(false)` without issuing a request when no chat is open
    /// or the trimmed content is empty. The content is trimmed before
    /// submission. A failed request is treated as session expiry; the
    /// caller decides whether to offer the text for resending.
    pub async fn send_message(&mut self, content: &str) -> Result<bool> {
        let Some(chat_id) = self.active_chat.as_ref().map(|chat| chat.id) else {
            return Ok(false);
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(false);
        }
        let token = self.require_token()?;
        self.request_count += 1;
        let params = MessageCreateParams::new(content, chat_id);
        match self.backend.send_message(&token, &params).await {
            Ok(()) => Ok(true),
            Err(err) => {
                self.expire();
                Err(err)
            }
        }
    }

    /// Creates a new group chat and reloads the directory.
    pub async fn create_chat(&mut self, name: &str) -> Result<()> {
        let token = self.require_token()?;
        self.request_count += 1;
        let params = ChatCreateParams::group(name);
        if let Err(err) = self.backend.create_chat(&token, &params).await {
            self.expire();
            return Err(err);
        }
        self.load_chats().await
    }

    /// Fetches the online user count.
    ///
    /// This is unauthenticated and non-critical: a failure is returned to
    /// the caller but never expires the session.
    pub async fn online_user_count(&mut self) -> Result<usize> {
        self.request_count += 1;
        self.backend.online_user_count().await.inspect_err(|_| {
            PRESENCE_ERRORS.click();
        })
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            view: self.view(),
            active_chat: self.active_chat.clone(),
            chat_count: self.chats.len(),
            history_len: self.history.len(),
            request_count: self.request_count,
        }
    }

    /// Returns the token, or expires the session when none is held.
    fn require_token(&mut self) -> Result<String> {
        match self.token.clone() {
            Some(token) => Ok(token),
            None => {
                self.expire();
                Err(Error::authentication("no session token; log in first"))
            }
        }
    }

    /// Drops the session back to the unauthenticated view, closing the live
    /// feed and discarding everything derived from the token.
    fn expire(&mut self) {
        SESSION_EXPIRIES.click();
        self.token = None;
        self.active_chat = None;
        if let Some(mut live) = self.live.take() {
            live.close();
        }
        self.chats.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::backend::LiveFeed;
    use crate::types::{TokenResponse, User};

    /// Scripted backend that records every call.
    #[derive(Default)]
    struct MockBackend {
        token: String,
        chats: Vec<Chat>,
        messages: Vec<Message>,
        online: usize,
        fail_list_chats: bool,
        fail_send_message: bool,
        fail_online: bool,
        calls: Calls,
        feeds: std::sync::Mutex<Vec<Arc<AtomicBool>>>,
    }

    #[derive(Default)]
    struct Calls {
        login: AtomicUsize,
        register: AtomicUsize,
        list_chats: AtomicUsize,
        create_chat: AtomicUsize,
        list_messages: AtomicUsize,
        send_message: AtomicUsize,
        online: AtomicUsize,
        open_live: AtomicUsize,
    }

    impl MockBackend {
        fn logged_in() -> Self {
            Self {
                token: "tok123".to_string(),
                chats: vec![Chat {
                    id: 1,
                    name: "General".to_string(),
                }],
                messages: vec![Message {
                    content: "hello".to_string(),
                    user: User::new("alice"),
                    chat_id: Some(1),
                }],
                online: 2,
                ..Self::default()
            }
        }

        fn check_token(&self, token: &str) -> Result<()> {
            if token == self.token {
                Ok(())
            } else {
                Err(Error::authentication("invalid token"))
            }
        }

        /// Flags set when the corresponding feed's reader task is torn down.
        fn feed_flags(&self) -> Vec<Arc<AtomicBool>> {
            self.feeds.lock().unwrap().clone()
        }
    }

    /// Sets its flag when dropped, which happens when the feed task aborts.
    struct FeedGuard(Arc<AtomicBool>);

    impl Drop for FeedGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for MockBackend {
        async fn login(&self, credentials: &Credentials) -> Result<TokenResponse> {
            self.calls.login.fetch_add(1, Ordering::SeqCst);
            if credentials.username == "alice" {
                Ok(TokenResponse::bearer(self.token.clone()))
            } else if credentials.username == "tokenless" {
                Ok(TokenResponse::default())
            } else {
                Err(Error::authentication("Invalid credentials"))
            }
        }

        async fn register(&self, _credentials: &Credentials) -> Result<()> {
            self.calls.register.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_chats(&self, token: &str) -> Result<Vec<Chat>> {
            self.calls.list_chats.fetch_add(1, Ordering::SeqCst);
            self.check_token(token)?;
            if self.fail_list_chats {
                return Err(Error::api(502, "bad gateway"));
            }
            Ok(self.chats.clone())
        }

        async fn create_chat(&self, token: &str, _params: &ChatCreateParams) -> Result<()> {
            self.calls.create_chat.fetch_add(1, Ordering::SeqCst);
            self.check_token(token)
        }

        async fn list_messages(&self, token: &str, _chat_id: u64) -> Result<Vec<Message>> {
            self.calls.list_messages.fetch_add(1, Ordering::SeqCst);
            self.check_token(token)?;
            Ok(self.messages.clone())
        }

        async fn send_message(&self, token: &str, params: &MessageCreateParams) -> Result<()> {
            self.calls.send_message.fetch_add(1, Ordering::SeqCst);
            self.check_token(token)?;
            if self.fail_send_message {
                return Err(Error::internal_server("database unavailable"));
            }
            assert_eq!(params.content, params.content.trim());
            Ok(())
        }

        async fn online_user_count(&self) -> Result<usize> {
            self.calls.online.fetch_add(1, Ordering::SeqCst);
            if self.fail_online {
                return Err(Error::api(503, "presence backend down"));
            }
            Ok(self.online)
        }

        async fn open_live(&self, _chat_id: u64) -> Result<LiveFeed> {
            self.calls.open_live.fetch_add(1, Ordering::SeqCst);
            let closed = Arc::new(AtomicBool::new(false));
            self.feeds.lock().unwrap().push(closed.clone());
            let guard = FeedGuard(closed);
            let (tx, rx) = mpsc::channel(4);
            let task = tokio::spawn(async move {
                let _tx = tx;
                let _guard = guard;
                std::future::pending::<()>().await;
            });
            Ok(LiveFeed::from_parts(rx, LiveHandle::new(task)))
        }
    }

    fn session(backend: MockBackend) -> ClientSession<Arc<MockBackend>> {
        ClientSession::new(Arc::new(backend))
    }

    /// Give the runtime a chance to tear down aborted feed tasks.
    async fn settle(flag: &AtomicBool) {
        for _ in 0..100 {
            if flag.load(Ordering::SeqCst) {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn short_username_rejected_without_network() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();

        let err = session.login("ab", "secret1").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.calls.login.load(Ordering::SeqCst), 0);
        assert_eq!(session.view(), SessionView::Unauthenticated);

        let err = session.register("ab", "secret1").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.calls.register.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_loads_chats_and_presence_once() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();

        let outcome = session.login("alice", "secret1").await.unwrap();
        assert_eq!(outcome.chat_count, 1);
        assert_eq!(outcome.online_users, Some(2));
        assert_eq!(session.view(), SessionView::ChatList);
        assert_eq!(session.chats()[0].name, "General");
        assert_eq!(backend.calls.login.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.list_chats.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.online.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_failure_resets_session() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();

        let err = session.login("mallory", "secret1").await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(session.view(), SessionView::Unauthenticated);
        // Neither side-effect load runs after a failed exchange.
        assert_eq!(backend.calls.list_chats.load(Ordering::SeqCst), 0);
        assert_eq!(backend.calls.online.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_free_ok_response_is_a_failure() {
        let mut session = session(MockBackend::logged_in());

        let err = session.login("tokenless", "secret1").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn presence_failure_does_not_fail_login() {
        let mut session = session(MockBackend {
            fail_online: true,
            ..MockBackend::logged_in()
        });

        let outcome = session.login("alice", "secret1").await.unwrap();
        assert_eq!(outcome.online_users, None);
        assert_eq!(session.view(), SessionView::ChatList);
    }

    #[tokio::test]
    async fn load_chats_without_token_issues_no_request() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();

        let err = session.load_chats().await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(backend.calls.list_chats.load(Ordering::SeqCst), 0);
        assert_eq!(session.view(), SessionView::Unauthenticated);
    }

    #[tokio::test]
    async fn failed_directory_load_expires_the_session() {
        let mut session = session(MockBackend {
            fail_list_chats: true,
            ..MockBackend::logged_in()
        });

        let err = session.login("alice", "secret1").await.unwrap_err();
        assert_eq!(err.status_code(), Some(502));
        assert!(!session.is_authenticated());
        assert_eq!(session.view(), SessionView::Unauthenticated);
        assert!(session.chats().is_empty());
    }

    #[tokio::test]
    async fn open_chat_loads_history_and_live_feed() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();
        session.login("alice", "secret1").await.unwrap();

        let _events = session.open_chat(1, "General").await.unwrap();
        assert_eq!(session.view(), SessionView::ChatOpen);
        assert_eq!(session.active_chat().unwrap().id, 1);
        assert_eq!(session.history().len(), 1);
        assert_eq!(backend.calls.list_messages.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.open_live.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn opening_a_chat_closes_the_previous_feed() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();
        session.login("alice", "secret1").await.unwrap();

        let _events_a = session.open_chat(1, "General").await.unwrap();
        let _events_b = session.open_chat(2, "Random").await.unwrap();

        let flags = backend.feed_flags();
        assert_eq!(flags.len(), 2);
        settle(&flags[0]).await;
        assert!(flags[0].load(Ordering::SeqCst), "first feed still open");
        assert!(!flags[1].load(Ordering::SeqCst), "second feed closed");
        assert_eq!(session.active_chat().unwrap().id, 2);
    }

    #[tokio::test]
    async fn blank_messages_are_not_sent() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();
        session.login("alice", "secret1").await.unwrap();

        // No chat open yet.
        assert!(!session.send_message("hello").await.unwrap());

        let _events = session.open_chat(1, "General").await.unwrap();
        assert!(!session.send_message("").await.unwrap());
        assert!(!session.send_message("   \t  ").await.unwrap());
        assert_eq!(backend.calls.send_message.load(Ordering::SeqCst), 0);

        assert!(session.send_message("  hello  ").await.unwrap());
        assert_eq!(backend.calls.send_message.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_send_expires_the_session() {
        let mut session = session(MockBackend {
            fail_send_message: true,
            ..MockBackend::logged_in()
        });
        session.login("alice", "secret1").await.unwrap();
        let _events = session.open_chat(1, "General").await.unwrap();

        let err = session.send_message("hello").await.unwrap_err();
        assert!(matches!(err, Error::InternalServer { .. }));
        assert_eq!(session.view(), SessionView::Unauthenticated);
        assert!(session.active_chat().is_none());
    }

    #[tokio::test]
    async fn expiry_closes_the_live_feed() {
        let mut session = session(MockBackend {
            fail_send_message: true,
            ..MockBackend::logged_in()
        });
        let backend = session.backend.clone();
        session.login("alice", "secret1").await.unwrap();
        let _events = session.open_chat(1, "General").await.unwrap();

        session.send_message("hello").await.unwrap_err();
        let flags = backend.feed_flags();
        settle(&flags[0]).await;
        assert!(flags[0].load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn create_chat_reloads_the_directory() {
        let mut session = session(MockBackend::logged_in());
        let backend = session.backend.clone();
        session.login("alice", "secret1").await.unwrap();

        session.create_chat("Random").await.unwrap();
        assert_eq!(backend.calls.create_chat.load(Ordering::SeqCst), 1);
        // Once at login, once after the create.
        assert_eq!(backend.calls.list_chats.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stats_reflect_the_session() {
        let mut session = session(MockBackend::logged_in());
        session.login("alice", "secret1").await.unwrap();
        let _events = session.open_chat(1, "General").await.unwrap();

        let stats = session.stats();
        assert_eq!(stats.view, SessionView::ChatOpen);
        assert_eq!(stats.active_chat.unwrap().name, "General");
        assert_eq!(stats.chat_count, 1);
        assert_eq!(stats.history_len, 1);
        // login + chats + presence + history.
        assert_eq!(stats.request_count, 4);
    }
}
