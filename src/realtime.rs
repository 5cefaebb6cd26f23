//! Push-channel subscription for out-of-band order updates.
//!
//! Wraps a long-lived WebSocket subscription to the order service's push
//! endpoint. The server has published order upserts under three historical
//! event spellings; all of them are normalized here into one
//! [`PushEvent::Upsert`] so the cache never special-cases event names.
//!
//! Connection trouble is never fatal: the periodic snapshot refresh remains
//! the fallback consistency mechanism, so connect and read errors are logged
//! and the subscription retried with exponential backoff. No replay is
//! requested on (re)connect — the snapshot fetches own backfill.

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Event spellings the server publishes order upserts under. All three carry
/// one order payload and mean the same thing.
const UPSERT_EVENTS: &[&str] = &["newOrder", "new-order", "orderUpdated"];

/// Semantic content of a push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A single order was created or updated; upsert it into the cache.
    Upsert(Value),
}

/// Decode one text frame (`{"event": <name>, "data": <order>}`) into its
/// semantic event. Unknown event names and malformed frames yield `None` —
/// the channel drops them without disturbing the cache.
pub fn parse_push_frame(text: &str) -> Option<PushEvent> {
    let frame: Value = serde_json::from_str(text).ok()?;
    let event = frame.get("event").and_then(Value::as_str)?;
    if !UPSERT_EVENTS.contains(&event) {
        debug!(event, "ignoring unrecognized push event");
        return None;
    }
    let data = frame.get("data")?;
    if data.is_null() {
        return None;
    }
    Some(PushEvent::Upsert(data.clone()))
}

/// Handle on a live push subscription.
///
/// Receive normalized events with [`recv`](Self::recv) and feed them to
/// `OrderCache::apply_event` (or `OrderDesk::apply_push`). Dropping the
/// handle, or calling [`close`](Self::close) any number of times, tears the
/// connection down and unsubscribes.
pub struct SyncChannel {
    events: mpsc::UnboundedReceiver<PushEvent>,
    shutdown: CancellationToken,
}

impl SyncChannel {
    /// Spawn the subscription task. Returns immediately; the task connects in
    /// the background and keeps reconnecting until the handle is closed.
    pub fn connect(url: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        tokio::spawn(run_subscription(
            url.to_string(),
            tx,
            shutdown.clone(),
        ));
        Self {
            events: rx,
            shutdown,
        }
    }

    /// Next push event; `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv) for event-loop polling.
    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.events.try_recv().ok()
    }

    /// Tear the subscription down. Safe to call multiple times.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_subscription(
    url: String,
    tx: mpsc::UnboundedSender<PushEvent>,
    shutdown: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let connected = tokio::select! {
            _ = shutdown.cancelled() => return,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((mut stream, _)) => {
                info!(%url, "push channel connected");
                backoff = INITIAL_BACKOFF;
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            let _ = stream.close(None).await;
                            return;
                        }
                        frame = stream.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(event) = parse_push_frame(&text) {
                                    if tx.send(event).is_err() {
                                        // Receiver gone; nobody left to feed.
                                        return;
                                    }
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(error = %e, "push channel read error");
                                break;
                            }
                            None => {
                                warn!("push channel closed by server");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "push channel connect failed");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_upsert_spellings_normalize() {
        for event in ["newOrder", "new-order", "orderUpdated"] {
            let frame = json!({"event": event, "data": {"id": "o1"}}).to_string();
            let parsed = parse_push_frame(&frame);
            assert_eq!(
                parsed,
                Some(PushEvent::Upsert(json!({"id": "o1"}))),
                "spelling {event} must map to an upsert"
            );
        }
    }

    #[test]
    fn test_unknown_events_and_garbage_are_dropped() {
        let unknown = json!({"event": "menuUpdated", "data": {"id": "m1"}}).to_string();
        assert_eq!(parse_push_frame(&unknown), None);

        assert_eq!(parse_push_frame("not json"), None);
        assert_eq!(parse_push_frame(r#"{"data": {"id": "o1"}}"#), None);
        assert_eq!(
            parse_push_frame(r#"{"event": "newOrder", "data": null}"#),
            None
        );
        assert_eq!(parse_push_frame(r#"{"event": "newOrder"}"#), None);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        // Nothing listens on this port; the task stays in its retry loop
        // until closed.
        let mut channel = SyncChannel::connect("ws://127.0.0.1:9");
        channel.close();
        channel.close();
        assert_eq!(channel.recv().await, None);
    }
}
