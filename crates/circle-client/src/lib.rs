//! # circle-client -- Typed Rust client for the Circle hosted backend
//!
//! Provides typed access to the three surfaces of the managed backend:
//! - **Auth** via `/auth/v1` (sign up, sign in, sign out, current user)
//! - **Tables** via `/rest/v1` (`profiles`, `follows`)
//! - **Realtime** via `/realtime/v1/websocket` (row change streams)
//!
//! ## Architecture
//!
//! Every data operation is one request/response call. Username uniqueness,
//! follower/following counts and profile creation for new accounts are
//! enforced by backend constraints and triggers; this crate never computes
//! them. There are no automatic retries: a failed call returns its error and
//! the user decides whether to repeat the action.
//!
//! The sub-clients share one HTTP connection pool and one session store.
//! Signing in through [`AuthClient`](auth::AuthClient) switches every later
//! request to the user's access token.

pub mod auth;
pub mod config;
pub mod error;
pub mod follows;
pub mod profiles;
pub mod realtime;
pub mod session;
pub(crate) mod transport;

pub use config::{ClientConfig, RealtimeConfig};
pub use error::ApiError;
pub use session::{AuthUser, Session, SessionStore, SessionWatch};

use std::time::Duration;

use transport::{Transport, AUTH_PREFIX, REST_PREFIX};

/// Top-level backend client. Holds sub-clients for each surface.
#[derive(Debug, Clone)]
pub struct CircleClient {
    auth: auth::AuthClient,
    profiles: profiles::ProfileClient,
    follows: follows::FollowClient,
    realtime: realtime::RealtimeClient,
    transport: Transport,
}

/// Result of a health check across backend surfaces.
#[derive(Debug)]
pub struct HealthCheckResult {
    /// Surfaces that answered.
    pub reachable: Vec<&'static str>,
    /// Surfaces that did not answer, with the reason.
    pub unreachable: Vec<(&'static str, String)>,
}

impl HealthCheckResult {
    /// Whether every probed surface answered.
    pub fn all_healthy(&self) -> bool {
        self.unreachable.is_empty()
    }
}

impl CircleClient {
    /// Create a new backend client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let session = SessionStore::new();
        let transport = Transport::new(
            http,
            config.base_url.clone(),
            config.anon_key.clone(),
            session.clone(),
        );

        Ok(Self {
            auth: auth::AuthClient::new(transport.clone()),
            profiles: profiles::ProfileClient::new(transport.clone()),
            follows: follows::FollowClient::new(transport.clone()),
            realtime: realtime::RealtimeClient::new(
                config.base_url,
                config.anon_key.as_str().to_owned(),
                session,
                config.realtime,
            ),
            transport,
        })
    }

    /// Access the auth client.
    pub fn auth(&self) -> &auth::AuthClient {
        &self.auth
    }

    /// Access the `profiles` table client.
    pub fn profiles(&self) -> &profiles::ProfileClient {
        &self.profiles
    }

    /// Access the `follows` table client.
    pub fn follows(&self) -> &follows::FollowClient {
        &self.follows
    }

    /// Access the realtime client.
    pub fn realtime(&self) -> &realtime::RealtimeClient {
        &self.realtime
    }

    /// Probe the REST and auth surfaces.
    ///
    /// A surface counts as reachable when it answers at all; the status code
    /// is not inspected, since the REST root may require a signed-in user.
    pub async fn health_check(&self) -> HealthCheckResult {
        let probes = [("rest", REST_PREFIX, ""), ("auth", AUTH_PREFIX, "health")];
        let mut result = HealthCheckResult {
            reachable: Vec::new(),
            unreachable: Vec::new(),
        };

        for (name, prefix, path) in probes {
            let url = match self.transport.url(prefix, path) {
                Ok(url) => url,
                Err(e) => {
                    result.unreachable.push((name, e.to_string()));
                    continue;
                }
            };
            match self
                .transport
                .request(reqwest::Method::GET, url)
                .send()
                .await
            {
                Ok(_) => result.reachable.push(name),
                Err(e) => {
                    tracing::warn!(service = name, "health check failed: {e}");
                    result.unreachable.push((name, e.to_string()));
                }
            }
        }
        result
    }
}
