//! Typed client for the `profiles` table.
//!
//! Context path: `/rest/v1`
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/profiles?id=eq.{id}` | Get by id |
//! | PATCH  | `/profiles?id=eq.{id}` | Partial update |
//! | GET    | `/profiles?or=(..ilike..)&limit=n` | Search by name |
//! | GET    | `/profiles?username=eq.{name}&select=id` | Username availability |
//!
//! Follower/following/post counts are maintained by backend triggers and are
//! read-only here.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use circle_core::{UserId, Username, UsernameAvailability};

use crate::error::ApiError;
use crate::transport::{Transport, REST_PREFIX};

/// Default row cap for [`ProfileClient::search`].
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

// -- Row types ----------------------------------------------------------------

/// A row of the `profiles` table.
///
/// Optional columns use `#[serde(default)]` so rows created before a column
/// existed still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// "First Last", falling back to the username when no name is set.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Partial update for a profile. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl ProfileUpdate {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the `profiles` table.
#[derive(Debug, Clone)]
pub struct ProfileClient {
    transport: Transport,
}

impl ProfileClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Get a profile by user id.
    ///
    /// Calls `GET {base_url}/rest/v1/profiles?id=eq.{id}`. Returns
    /// [`ApiError::NotFound`] when no row matches.
    pub async fn get(&self, user_id: UserId) -> Result<Profile, ApiError> {
        let endpoint = format!("GET /profiles/{user_id}");
        let mut url = self.transport.url(REST_PREFIX, "profiles")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{user_id}"));

        let rows: Vec<Profile> = self
            .transport
            .send_json(&endpoint, self.transport.request(Method::GET, url))
            .await?;
        rows.into_iter()
            .next()
            .ok_or(ApiError::NotFound { endpoint })
    }

    /// Apply a partial update and return the updated row.
    ///
    /// Calls `PATCH {base_url}/rest/v1/profiles?id=eq.{id}` with
    /// `Prefer: return=representation`. An empty update performs no write
    /// and returns the current row.
    pub async fn update(&self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        if update.is_empty() {
            return self.get(user_id).await;
        }

        let endpoint = format!("PATCH /profiles/{user_id}");
        let mut url = self.transport.url(REST_PREFIX, "profiles")?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"));

        let rows: Vec<Profile> = self
            .transport
            .send_json(
                &endpoint,
                self.transport
                    .request(Method::PATCH, url)
                    .header("Prefer", "return=representation")
                    .json(update),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or(ApiError::NotFound { endpoint })
    }

    /// Case-insensitive substring search over username, first and last name.
    ///
    /// Calls `GET {base_url}/rest/v1/profiles?or=(...)&limit={limit}`.
    /// A blank query returns no rows without calling the backend.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Profile>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = "GET /profiles?search";
        let mut url = self.transport.url(REST_PREFIX, "profiles")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("or", &search_filter(query))
            .append_pair("limit", &limit.to_string());

        self.transport
            .send_json(endpoint, self.transport.request(Method::GET, url))
            .await
    }

    /// Check whether a username is free.
    ///
    /// The name is lower-cased before lookup. Any failure is logged and
    /// reported as [`UsernameAvailability::Unknown`]; it never claims the
    /// name is taken.
    pub async fn check_username_availability(&self, username: &str) -> UsernameAvailability {
        match self.lookup_username(&Username::new(username)).await {
            Ok(true) => UsernameAvailability::Taken,
            Ok(false) => UsernameAvailability::Available,
            Err(e) => {
                tracing::warn!(username, "username availability check failed: {e}");
                UsernameAvailability::Unknown
            }
        }
    }

    async fn lookup_username(&self, username: &Username) -> Result<bool, ApiError> {
        let endpoint = "GET /profiles?username";
        let mut url = self.transport.url(REST_PREFIX, "profiles")?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("username", &format!("eq.{}", username.lookup_key()))
            .append_pair("limit", "1");

        let rows: Vec<serde_json::Value> = self
            .transport
            .send_json(endpoint, self.transport.request(Method::GET, url))
            .await?;
        Ok(!rows.is_empty())
    }
}

/// Build the `or=(...)` filter for a name search.
///
/// The query is matched literally: `%` and `_` are escaped for `ilike`,
/// and `*` (the filter syntax's wildcard, with no escaped form) is
/// narrowed to `_`, matching exactly one character. The pattern is then
/// double-quoted so that commas, dots and parentheses in user input cannot
/// alter the filter expression.
fn search_filter(query: &str) -> String {
    let mut literal = String::with_capacity(query.len());
    for c in query.chars() {
        match c {
            '%' | '_' | '\\' => {
                literal.push('\\');
                literal.push(c);
            }
            '*' => literal.push('_'),
            _ => literal.push(c),
        }
    }
    let escaped = literal.replace('\\', "\\\\").replace('"', "\\\"");
    let pattern = format!("\"*{escaped}*\"");
    format!("(username.ilike.{pattern},first_name.ilike.{pattern},last_name.ilike.{pattern})")
}
