//! Live update channel.
//!
//! The server pushes new messages over a chat-scoped WebSocket. This module
//! derives the channel address from the API base URL, reads inbound frames
//! into [`LiveEvent`]s, and keeps the connection alive with capped
//! exponential backoff. The client never sends on this channel.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use url::Url;

use crate::backend::{LiveEvent, LiveFeed, LiveHandle};
use crate::error::{Error, Result};
use crate::observability::{
    LIVE_CONNECTS, LIVE_CONNECT_ERRORS, LIVE_MESSAGES, LIVE_PARSE_ERRORS, LIVE_STREAM_ERRORS,
};
use crate::types::Message;

/// Delay before the first reconnect attempt.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Ceiling for the reconnect delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Buffered events before the reader applies backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Derives the live channel address for a chat from the API base URL.
///
/// The channel lives on the same authority as the API, at path
/// `/ws/{chat_id}`, with the scheme matching the base URL's transport
/// security: `http` becomes `ws` and `https` becomes `wss`.
pub fn live_url(base_url: &Url, chat_id: u64) -> Result<Url> {
    let scheme = match base_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::url(
                format!("cannot derive a live channel address from scheme {other:?}"),
                None,
            ));
        }
    };
    let mut url = base_url.clone();
    url.set_scheme(scheme)
        .map_err(|_| Error::url(format!("cannot apply scheme {scheme:?} to {base_url}"), None))?;
    url.set_path(&format!("/ws/{chat_id}"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Opens a live feed for the given channel address.
///
/// The returned feed's reader task owns the connection; closing the feed's
/// handle aborts it. Connect failures and drops are retried internally, so
/// this function itself does not fail.
pub fn open(url: Url) -> LiveFeed {
    let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let task = tokio::spawn(run(url, events));
    LiveFeed::from_parts(receiver, LiveHandle::new(task))
}

/// Connect loop: connect, drain frames, back off, repeat.
///
/// Exits only when the event receiver is dropped.
async fn run(url: Url, events: mpsc::Sender<LiveEvent>) {
    let mut backoff = INITIAL_BACKOFF;
    let mut connected_before = false;
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                LIVE_CONNECTS.click();
                if connected_before
                    && events.send(LiveEvent::Reconnected).await.is_err()
                {
                    return;
                }
                connected_before = true;
                backoff = INITIAL_BACKOFF;
                if !read_frames(stream, &events).await {
                    return;
                }
            }
            Err(_) => {
                LIVE_CONNECT_ERRORS.click();
            }
        }
        if events
            .send(LiveEvent::ConnectionLost { retry_in: backoff })
            .await
            .is_err()
        {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

/// Reads frames until the connection ends.
///
/// Returns false when the event receiver is gone and the loop should stop.
async fn read_frames<S>(mut stream: S, events: &mpsc::Sender<LiveEvent>) -> bool
where
    S: Stream<Item = std::result::Result<WsFrame, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsFrame::Text(text)) => match serde_json::from_str::<Message>(&text) {
                Ok(message) => {
                    LIVE_MESSAGES.click();
                    if events.send(LiveEvent::Message(message)).await.is_err() {
                        return false;
                    }
                }
                // Malformed payloads are counted and skipped, never fatal.
                Err(_) => {
                    LIVE_PARSE_ERRORS.click();
                }
            },
            Ok(WsFrame::Close(_)) => break,
            // Binary and control frames carry nothing for us.
            Ok(_) => {}
            Err(_) => {
                LIVE_STREAM_ERRORS.click();
                break;
            }
        }
    }
    true
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}
