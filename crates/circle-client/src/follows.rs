//! Typed client for the `follows` table (the follow graph).
//!
//! Context path: `/rest/v1`
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/follows` | Follow (caller → target) |
//! | DELETE | `/follows?follower_id=eq.{me}&following_id=eq.{id}` | Unfollow |
//! | GET    | `/follows?following_id=eq.{id}&order=created_at.desc` | Followers |
//! | GET    | `/follows?follower_id=eq.{id}&order=created_at.desc` | Following |
//! | GET    | `/follows?follower_id=eq.{me}&following_id=eq.{id}&select=id` | Is following |
//!
//! Edges are keyed by `(follower_id, following_id)`. The backend rejects
//! duplicate edges with a unique violation (HTTP 409) and self-follows with a
//! check constraint; the self-follow case is also caught here before any
//! request is made.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use circle_core::UserId;

use crate::error::ApiError;
use crate::transport::{Transport, REST_PREFIX};

/// Default row cap for follower/following listings.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Embedded follower profile, resolved through the `follower_id` foreign key.
const FOLLOWERS_SELECT: &str = "id,follower_id,following_id,created_at,\
profile:profiles!follows_follower_id_fkey(id,username,first_name,last_name,avatar_url,is_verified)";

/// Embedded followed profile, resolved through the `following_id` foreign key.
const FOLLOWING_SELECT: &str = "id,follower_id,following_id,created_at,\
profile:profiles!follows_following_id_fkey(id,username,first_name,last_name,avatar_url,is_verified)";

// -- Row types ----------------------------------------------------------------

/// A row of the `follows` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub id: Uuid,
    pub follower_id: UserId,
    pub following_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Public columns of the counterpart profile in a follow listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// A follow edge joined with the counterpart's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowListEntry {
    pub id: Uuid,
    pub follower_id: UserId,
    pub following_id: UserId,
    pub created_at: DateTime<Utc>,
    pub profile: PublicProfile,
}

#[derive(Serialize)]
struct NewFollow {
    follower_id: UserId,
    following_id: UserId,
}

// -- Client -------------------------------------------------------------------

/// Client for the `follows` table.
#[derive(Debug, Clone)]
pub struct FollowClient {
    transport: Transport,
}

impl FollowClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Follow `following_id` as the signed-in user.
    ///
    /// Calls `POST {base_url}/rest/v1/follows`. Fails with
    /// [`ApiError::SelfFollow`] for the caller's own id and with
    /// [`ApiError::Conflict`] when the edge already exists.
    pub async fn follow(&self, following_id: UserId) -> Result<FollowEdge, ApiError> {
        let follower_id = self.caller()?;
        if follower_id == following_id {
            return Err(ApiError::SelfFollow);
        }

        let endpoint = "POST /follows";
        let url = self.transport.url(REST_PREFIX, "follows")?;
        let rows: Vec<FollowEdge> = self
            .transport
            .send_json(
                endpoint,
                self.transport
                    .request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(&NewFollow {
                        follower_id,
                        following_id,
                    }),
            )
            .await?;

        let edge = rows.into_iter().next().ok_or(ApiError::NotFound {
            endpoint: endpoint.into(),
        })?;
        tracing::info!(%follower_id, %following_id, "followed");
        Ok(edge)
    }

    /// Remove the signed-in user's edge to `following_id`.
    ///
    /// Calls `DELETE {base_url}/rest/v1/follows?follower_id=eq.{me}&following_id=eq.{id}`.
    /// Returns [`ApiError::NotFound`] when there was no such edge.
    pub async fn unfollow(&self, following_id: UserId) -> Result<(), ApiError> {
        let follower_id = self.caller()?;

        let endpoint = "DELETE /follows";
        let mut url = self.transport.url(REST_PREFIX, "follows")?;
        url.query_pairs_mut()
            .append_pair("follower_id", &format!("eq.{follower_id}"))
            .append_pair("following_id", &format!("eq.{following_id}"));

        let rows: Vec<FollowEdge> = self
            .transport
            .send_json(
                endpoint,
                self.transport
                    .request(Method::DELETE, url)
                    .header("Prefer", "return=representation"),
            )
            .await?;

        if rows.is_empty() {
            return Err(ApiError::NotFound {
                endpoint: endpoint.into(),
            });
        }
        tracing::info!(%follower_id, %following_id, "unfollowed");
        Ok(())
    }

    /// Users following `user_id`, most recent first.
    pub async fn followers(&self, user_id: UserId, limit: u32) -> Result<Vec<FollowListEntry>, ApiError> {
        self.list("GET /follows?followers", "following_id", FOLLOWERS_SELECT, user_id, limit)
            .await
    }

    /// Users `user_id` follows, most recent first.
    pub async fn following(&self, user_id: UserId, limit: u32) -> Result<Vec<FollowListEntry>, ApiError> {
        self.list("GET /follows?following", "follower_id", FOLLOWING_SELECT, user_id, limit)
            .await
    }

    /// Whether the signed-in user follows `following_id`.
    ///
    /// No matching edge is `false`, not an error.
    pub async fn is_following(&self, following_id: UserId) -> Result<bool, ApiError> {
        let follower_id = self.caller()?;

        let endpoint = "GET /follows?exists";
        let mut url = self.transport.url(REST_PREFIX, "follows")?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("follower_id", &format!("eq.{follower_id}"))
            .append_pair("following_id", &format!("eq.{following_id}"))
            .append_pair("limit", "1");

        let rows: Vec<serde_json::Value> = self
            .transport
            .send_json(endpoint, self.transport.request(Method::GET, url))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn list(
        &self,
        endpoint: &str,
        column: &str,
        select: &str,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<FollowListEntry>, ApiError> {
        let mut url = self.transport.url(REST_PREFIX, "follows")?;
        url.query_pairs_mut()
            .append_pair("select", select)
            .append_pair(column, &format!("eq.{user_id}"))
            .append_pair("order", "created_at.desc")
            .append_pair("limit", &limit.to_string());

        self.transport
            .send_json(endpoint, self.transport.request(Method::GET, url))
            .await
    }

    fn caller(&self) -> Result<UserId, ApiError> {
        self.transport
            .session()
            .user_id()
            .ok_or(ApiError::NotAuthenticated)
    }
}
