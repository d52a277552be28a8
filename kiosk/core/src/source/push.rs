//! Push Channel
//!
//! Websocket listeners that keep reconnecting with exponential backoff. The
//! backend push channel and the local scanning agent share the same reader
//! loop; each maps frames into its own event type.
//!
//! Frames carry no state. A notification only means "re-fetch now", and a
//! reconnect means notifications may have been missed, so consumers resync on
//! [`PushEvent::Connected`].

use std::time::Duration;

use futures::StreamExt;
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{Notification, PushEvent};

/// Reconnect timing for websocket listeners
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Doubling, capped retry delay
#[derive(Debug)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current: Duration,
}

impl Backoff {
    /// Start at the policy's initial delay
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            current: policy.initial_delay,
        }
    }

    /// Delay to wait now; the following call waits twice as long (capped)
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.policy.max_delay);
        self.current = self.current.saturating_mul(2).min(self.policy.max_delay);
        delay
    }

    /// Back to the initial delay after a successful connect
    pub fn reset(&mut self) {
        self.current = self.policy.initial_delay;
    }
}

/// Websocket URL of the kiosk push channel
///
/// `http` becomes `ws` and `https` becomes `wss`; any base path is kept.
/// Returns `None` for URLs that are not http(s).
pub fn push_url(base_url: &str, kiosk_id: &str) -> Option<Url> {
    let mut url = Url::parse(base_url).ok()?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return None,
    };
    url.set_scheme(scheme).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["ws", "kiosk", kiosk_id]);
    Some(url)
}

#[derive(Deserialize)]
struct NotificationFrame {
    #[serde(rename = "type")]
    kind: String,
}

/// Decode a push frame; unknown or unparseable frames yield `None`
fn parse_notification(text: &str) -> Option<Notification> {
    let frame: NotificationFrame = serde_json::from_str(text).ok()?;
    let notification = Notification::from_tag(&frame.kind);
    if notification.is_none() {
        debug!(kind = %frame.kind, "ignoring unknown push frame");
    }
    notification
}

/// Listen to the backend push channel until `tx` is dropped
pub fn spawn_push_listener(
    url: Url,
    policy: ReconnectPolicy,
    tx: mpsc::Sender<PushEvent>,
) -> JoinHandle<()> {
    spawn_frame_reader(url.to_string(), policy, tx, |frame| match frame {
        Frame::Connected => Some(PushEvent::Connected),
        Frame::Disconnected => Some(PushEvent::Disconnected),
        Frame::Text(text) => parse_notification(text).map(PushEvent::Notification),
    })
}

/// What the shared reader loop observed
pub(crate) enum Frame<'a> {
    /// Socket opened
    Connected,
    /// A text frame arrived
    Text(&'a str),
    /// Socket closed or failed
    Disconnected,
}

/// Connect, read text frames, reconnect; stops once `tx` is closed
pub(crate) fn spawn_frame_reader<T, F>(
    url: String,
    policy: ReconnectPolicy,
    tx: mpsc::Sender<T>,
    mut map: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnMut(Frame<'_>) -> Option<T> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = Backoff::new(policy);

        while !tx.is_closed() {
            let mut ws = match connect_async(url.as_str()).await {
                Ok((ws, _)) => ws,
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(%url, error = %err, ?delay, "websocket connect failed");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            backoff.reset();
            info!(%url, "websocket connected");
            if !forward(&tx, map(Frame::Connected)).await {
                break;
            }

            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if !forward(&tx, map(Frame::Text(&text))).await {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }

            info!(%url, "websocket disconnected");
            if !forward(&tx, map(Frame::Disconnected)).await {
                break;
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
        debug!(%url, "websocket reader stopped");
    })
}

/// Send a mapped frame; `false` once the receiver is gone
async fn forward<T>(tx: &mpsc::Sender<T>, item: Option<T>) -> bool {
    match item {
        Some(item) => tx.send(item).await.is_ok(),
        None => true,
    }
}
