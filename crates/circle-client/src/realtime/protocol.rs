//! # Realtime Wire Protocol
//!
//! The realtime surface speaks Phoenix channels (JSON serializer, protocol
//! `vsn=1.0.0`) over a websocket. Each frame is one [`PhoenixMessage`]:
//!
//! ```text
//! {"topic": "realtime:profile:..", "event": "phx_join", "payload": {..}, "ref": "1", "join_ref": "1"}
//! ```
//!
//! Outbound: `phx_join` (with a `postgres_changes` config), `phx_leave`,
//! and `heartbeat` on the `phoenix` topic. Inbound: `phx_reply` (join/leave
//! acknowledgements), `postgres_changes` (row changes), `phx_error`,
//! `phx_close` and `system`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

/// Topic used for socket-level heartbeats.
pub const PHOENIX_TOPIC: &str = "phoenix";

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

/// One Phoenix channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    /// Join `topic`, listening for the given row changes.
    pub fn join(
        topic: &str,
        changes: &[PostgresChangeFilter],
        access_token: &str,
        reference: String,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload: serde_json::json!({
                "config": {
                    "broadcast": {"self": false},
                    "presence": {"key": ""},
                    "postgres_changes": changes,
                },
                "access_token": access_token,
            }),
            join_ref: Some(reference.clone()),
            reference: Some(reference),
        }
    }

    /// Leave `topic`.
    pub fn leave(topic: &str, reference: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: serde_json::json!({}),
            reference: Some(reference),
            join_ref: None,
        }
    }

    /// Socket keep-alive.
    pub fn heartbeat(reference: String) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: serde_json::json!({}),
            reference: Some(reference),
            join_ref: None,
        }
    }

    /// `Some(status)` for a `phx_reply` frame.
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != EVENT_REPLY {
            return None;
        }
        self.payload.get("status").and_then(|s| s.as_str())
    }
}

/// Which row changes a channel listens for.
///
/// `filter` uses the same `column=eq.value` syntax as the REST surface;
/// only one column can be filtered per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresChangeFilter {
    /// `INSERT`, `UPDATE`, `DELETE` or `*`.
    pub event: String,
    pub schema: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl PostgresChangeFilter {
    /// All change kinds on `public.{table}` where `column = value`.
    pub fn all_where(table: &str, column: &str, value: impl std::fmt::Display) -> Self {
        Self {
            event: "*".to_string(),
            schema: "public".to_string(),
            table: table.to_string(),
            filter: Some(format!("{column}=eq.{value}")),
        }
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A row change delivered to subscription callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// New row image (absent for deletes).
    #[serde(default)]
    pub record: Option<serde_json::Value>,
    /// Previous row image (absent for inserts; may only carry the primary
    /// key unless the table uses full replica identity).
    #[serde(default)]
    pub old_record: Option<serde_json::Value>,
    #[serde(default)]
    pub commit_timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PostgresChangesPayload {
    data: ChangeEvent,
}

/// Extract the row change carried by a `postgres_changes` frame.
///
/// Returns `Ok(None)` for any other event.
pub fn parse_change(msg: &PhoenixMessage) -> Result<Option<ChangeEvent>, ApiError> {
    if msg.event != EVENT_POSTGRES_CHANGES {
        return Ok(None);
    }
    let payload: PostgresChangesPayload = serde_json::from_value(msg.payload.clone())
        .map_err(|e| ApiError::Realtime(format!("malformed postgres_changes payload: {e}")))?;
    Ok(Some(payload.data))
}

/// Websocket endpoint for a project URL: `ws(s)://{host}/realtime/v1/websocket?apikey=..&vsn=1.0.0`.
pub fn socket_url(base_url: &Url, anon_key: &str) -> Result<Url, ApiError> {
    let mut url = base_url
        .join("realtime/v1/websocket")
        .map_err(|e| ApiError::Realtime(format!("cannot build socket URL: {e}")))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ApiError::Realtime(format!(
                "unsupported URL scheme for realtime: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ApiError::Realtime(format!("cannot switch URL scheme to {scheme}")))?;
    url.query_pairs_mut()
        .append_pair("apikey", anon_key)
        .append_pair("vsn", "1.0.0");
    Ok(url)
}
