//! HTTP Backend Implementation
//!
//! Talks to the kiosk REST API with a shared `reqwest` client. Every response
//! body is read as text and decoded with `serde_json` here, so a body that does
//! not have the expected structure becomes [`FetchError::Malformed`] instead of
//! a transport error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{FetchError, KioskActions, RemoteQueueSource};
use crate::config::BackendSettings;
use crate::model::{
    DevEnqueueOutcome, HistoryEntry, KioskStatus, LeaveOutcome, Player, PlayerId, PlayerUpdate,
    QueueSnapshot, ScanOutcome, SessionStart, StatusReport,
};

/// Header carrying the kiosk API key
const API_KEY_HEADER: &str = "X-API-Key";

// =============================================================================
// Wire Payloads
// =============================================================================

#[derive(Deserialize)]
struct QueuePayload {
    queue: Vec<Option<QueueEntryPayload>>,
}

#[derive(Deserialize)]
struct QueueEntryPayload {
    #[serde(default)]
    player: Option<Player>,
}

#[derive(Deserialize)]
struct StatusPayload {
    status: String,
    #[serde(default)]
    session_id: Option<i64>,
    #[serde(default)]
    modes: Option<Vec<String>>,
    #[serde(default)]
    objectives: Option<Vec<String>>,
    #[serde(default)]
    traits: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct ScanPayload {
    known: bool,
    #[serde(default)]
    player_id: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct OkPayload {
    ok: bool,
    #[serde(default)]
    player_id: Option<i64>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    sessions: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    detail: serde_json::Value,
}

/// Decode a queue payload into a snapshot of at most `capacity` entries
///
/// `null` entries and entries without a player are open slots.
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] if the `queue` array is missing, an entry
/// is not an object, or a player lacks an integer `id`.
pub fn parse_queue_payload(body: &str, capacity: usize) -> Result<QueueSnapshot, FetchError> {
    let payload: QueuePayload =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let entries = payload
        .queue
        .into_iter()
        .map(|entry| entry.and_then(|e| e.player))
        .collect();
    Ok(QueueSnapshot::new(entries).truncated(capacity))
}

/// Decode a status payload
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] if `status` is missing or a field has the
/// wrong shape.
pub fn parse_status_payload(body: &str) -> Result<StatusReport, FetchError> {
    let payload: StatusPayload =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(StatusReport {
        status: KioskStatus::from_wire(&payload.status),
        session_id: payload.session_id,
        modes: payload.modes.unwrap_or_default(),
        objectives: payload.objectives.unwrap_or_default(),
        traits: payload.traits.unwrap_or_default(),
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Pull the `detail` field out of an error body, else use the raw text
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorPayload { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no detail".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn leave_outcome(payload: OkPayload) -> LeaveOutcome {
    if payload.ok {
        LeaveOutcome::Left
    } else {
        LeaveOutcome::Refused {
            detail: payload
                .detail
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Could not leave queue.".to_string()),
        }
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Kiosk REST API client
#[derive(Clone)]
pub struct HttpBackend {
    /// Backend root
    base_url: Url,
    /// Identity of this kiosk
    kiosk_id: String,
    /// Kiosk API key
    api_key: Option<String>,
    /// Visible slots; snapshots are truncated to this
    capacity: usize,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend from resolved settings
    ///
    /// # Errors
    ///
    /// Fails if the base URL cannot be parsed or the HTTP client cannot be
    /// built.
    pub fn from_config(settings: &BackendSettings, capacity: usize) -> anyhow::Result<Self> {
        let base_url = Url::parse(&settings.base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("backend URL cannot be a base: {}", settings.base_url);
        }
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            base_url,
            kiosk_id: settings.kiosk_id.clone(),
            api_key: settings.api_key.clone(),
            capacity,
            http_client,
        })
    }

    /// Kiosk this backend speaks for
    pub fn kiosk_id(&self) -> &str {
        &self.kiosk_id
    }

    /// Build an endpoint URL from raw path segments (each is percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        let builder = self.http_client.request(method, url);
        match self.api_key {
            Some(ref key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Send a request and return the success body as text
    async fn send(&self, builder: RequestBuilder) -> Result<String, FetchError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            debug!(status = status.as_u16(), "backend request rejected");
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl RemoteQueueSource for HttpBackend {
    async fn fetch_snapshot(&self) -> Result<QueueSnapshot, FetchError> {
        let body = self
            .send(self.request(Method::GET, &["kiosks", self.kiosk_id.as_str(), "queue"]))
            .await?;
        parse_queue_payload(&body, self.capacity)
    }

    async fn fetch_status(&self) -> Result<StatusReport, FetchError> {
        let body = self
            .send(self.request(Method::GET, &["kiosks", self.kiosk_id.as_str(), "status"]))
            .await?;
        parse_status_payload(&body)
    }
}

#[async_trait]
impl KioskActions for HttpBackend {
    async fn submit_scan(&self, uid: &str) -> Result<ScanOutcome, FetchError> {
        let body = self
            .send(
                self.request(Method::POST, &["rfid", "scan"])
                    .json(&json!({ "kiosk_id": self.kiosk_id, "rfid_uid": uid })),
            )
            .await?;
        let payload: ScanPayload = decode(&body)?;
        match (payload.known, payload.player_id) {
            (true, Some(id)) => Ok(ScanOutcome::Known {
                player_id: PlayerId(id),
            }),
            (true, None) => Err(FetchError::Malformed(
                "known scan without player_id".to_string(),
            )),
            (false, _) => Ok(ScanOutcome::Unknown {
                message: payload
                    .message
                    .unwrap_or_else(|| "Unknown tag.".to_string()),
            }),
        }
    }

    async fn start_session(&self, mode: Option<&str>) -> Result<SessionStart, FetchError> {
        let body = self
            .send(
                self.request(Method::POST, &["sessions", "start"])
                    .json(&json!({ "kiosk_id": self.kiosk_id, "mode": mode })),
            )
            .await?;
        decode(&body)
    }

    async fn enqueue_dev_player(&self) -> Result<DevEnqueueOutcome, FetchError> {
        let body = self
            .send(self.request(Method::POST, &["kiosks", self.kiosk_id.as_str(), "queue", "dev_add"]))
            .await?;
        let payload: OkPayload = decode(&body)?;
        match (payload.ok, payload.player_id) {
            (true, Some(id)) => Ok(DevEnqueueOutcome::Queued {
                player_id: PlayerId(id),
            }),
            _ => Ok(DevEnqueueOutcome::Rejected {
                detail: payload
                    .detail
                    .unwrap_or_else(|| "Unable to add a dev player.".to_string()),
            }),
        }
    }

    async fn leave_queue(&self, player_id: PlayerId) -> Result<LeaveOutcome, FetchError> {
        let body = self
            .send(
                self.request(Method::POST, &["kiosks", self.kiosk_id.as_str(), "queue", "remove"])
                    .json(&json!({ "player_id": player_id })),
            )
            .await?;
        Ok(leave_outcome(decode(&body)?))
    }

    async fn player(&self, player_id: PlayerId) -> Result<Player, FetchError> {
        let id = player_id.to_string();
        let body = self
            .send(self.request(Method::GET, &["players", id.as_str()]))
            .await?;
        decode(&body)
    }

    async fn player_history(&self, player_id: PlayerId) -> Result<Vec<HistoryEntry>, FetchError> {
        let id = player_id.to_string();
        let body = self
            .send(self.request(Method::GET, &["players", id.as_str(), "history"]))
            .await?;
        let payload: HistoryPayload = decode(&body)?;
        Ok(payload.sessions)
    }

    async fn update_player(
        &self,
        player_id: PlayerId,
        update: &PlayerUpdate,
    ) -> Result<Player, FetchError> {
        let id = player_id.to_string();
        let body = self
            .send(self.request(Method::PATCH, &["players", id.as_str()]).json(&update_body(update)))
            .await?;
        decode(&body)
    }
}

/// PATCH body for a profile change
fn update_body(update: &PlayerUpdate) -> serde_json::Value {
    match update {
        PlayerUpdate::Rename(name) => json!({ "name": name }),
        PlayerUpdate::RandomAvatar => json!({ "random_avatar": true }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn backend(base_url: &str, kiosk_id: &str) -> HttpBackend {
        let settings = BackendSettings {
            base_url: base_url.to_string(),
            kiosk_id: kiosk_id.to_string(),
            api_key: Some("k".to_string()),
            request_timeout: Duration::from_secs(1),
        };
        HttpBackend::from_config(&settings, 6).unwrap()
    }

    #[test]
    fn test_queue_payload_with_open_slots() {
        let body = r#"{"queue": [
            {"player": {"id": 1, "username": "neon_fox", "name": "Ada"}},
            null,
            {"player": null},
            {},
            {"player": {"id": 5, "username": "zeta", "avatar_url": "/a.png"}}
        ]}"#;
        let snapshot = parse_queue_payload(body, 6).unwrap();

        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.occupant_count(), 2);
        assert_eq!(snapshot.entry(0).map(|p| p.id), Some(PlayerId(1)));
        assert!(snapshot.entry(1).is_none());
        assert!(snapshot.entry(3).is_none());
        assert_eq!(
            snapshot.entry(4).and_then(|p| p.avatar_url.clone()),
            Some("/a.png".to_string())
        );
    }

    #[test]
    fn test_queue_payload_truncated_to_capacity() {
        let entries: Vec<String> = (1..=9)
            .map(|i| format!(r#"{{"player": {{"id": {i}, "username": "p{i}"}}}}"#))
            .collect();
        let body = format!(r#"{{"queue": [{}]}}"#, entries.join(","));
        let snapshot = parse_queue_payload(&body, 6).unwrap();
        assert_eq!(snapshot.len(), 6);
        assert!(!snapshot.contains(PlayerId(7)));
    }

    #[test]
    fn test_malformed_queue_payloads() {
        for body in [
            "",
            "not json",
            "{}",
            r#"{"queue": null}"#,
            r#"{"queue": "abc"}"#,
            r#"{"queue": [42]}"#,
            r#"{"queue": [{"player": {"username": "no_id"}}]}"#,
            r#"{"queue": [{"player": {"id": "7", "username": "string_id"}}]}"#,
        ] {
            let result = parse_queue_payload(body, 6);
            assert!(
                matches!(result, Err(FetchError::Malformed(_))),
                "expected malformed for {body:?}"
            );
        }
    }

    #[test]
    fn test_status_payload() {
        let body = r#"{
            "kiosk_id": "arena-1",
            "status": "running",
            "session_id": 12,
            "modes": ["solo", "team"],
            "objectives": ["Beat your best score"],
            "traits": {"physical": 3, "mental": 0}
        }"#;
        let report = parse_status_payload(body).unwrap();
        assert_eq!(report.status, KioskStatus::Running);
        assert_eq!(report.session_id, Some(12));
        assert_eq!(report.modes(), vec!["solo".to_string(), "team".to_string()]);
        assert_eq!(report.visible_traits().len(), 1);
    }

    #[test]
    fn test_status_payload_nulls_and_unknown_status() {
        let body = r#"{"status": "ended", "session_id": null, "modes": null}"#;
        let report = parse_status_payload(body).unwrap();
        assert_eq!(report.status, KioskStatus::Idle);
        assert_eq!(report.modes(), vec!["default".to_string()]);
        assert!(report.objectives.is_empty());
    }

    #[test]
    fn test_status_payload_requires_status() {
        assert!(parse_status_payload(r#"{"modes": []}"#)
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_leave_outcome_keeps_backend_detail() {
        let refused: OkPayload = decode(r#"{"ok": false, "detail": "Player not in queue"}"#).unwrap();
        assert_eq!(
            leave_outcome(refused),
            LeaveOutcome::Refused {
                detail: "Player not in queue".to_string()
            }
        );

        let bare: OkPayload = decode(r#"{"ok": false}"#).unwrap();
        assert_eq!(
            leave_outcome(bare),
            LeaveOutcome::Refused {
                detail: "Could not leave queue.".to_string()
            }
        );

        let left: OkPayload = decode(r#"{"ok": true}"#).unwrap();
        assert_eq!(leave_outcome(left), LeaveOutcome::Left);
    }

    #[test]
    fn test_update_bodies() {
        assert_eq!(
            update_body(&PlayerUpdate::Rename("Ada".to_string())),
            json!({"name": "Ada"})
        );
        assert_eq!(
            update_body(&PlayerUpdate::RandomAvatar),
            json!({"random_avatar": true})
        );
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(error_detail(r#"{"detail": "Kiosk not found"}"#), "Kiosk not found");
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_detail(""), "no detail");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let backend = backend("http://127.0.0.1:8000/api/", "arena 1/b");
        let url = backend.endpoint(&["kiosks", backend.kiosk_id(), "queue"]);
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/kiosks/arena%201%2Fb/queue"
        );
    }

    #[test]
    fn test_endpoint_without_base_path() {
        let backend = backend("http://localhost:8000", "k1");
        let url = backend.endpoint(&["rfid", "scan"]);
        assert_eq!(url.as_str(), "http://localhost:8000/rfid/scan");
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let settings = BackendSettings {
            base_url: "not a url".to_string(),
            ..BackendSettings::default()
        };
        assert!(HttpBackend::from_config(&settings, 6).is_err());
    }
}
