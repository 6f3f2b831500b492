//! Shared request plumbing for the REST and auth surfaces.
//!
//! Every request carries `apikey: <anon key>` and a bearer token: the
//! signed-in user's access token when there is one, otherwise the anon key.
//! Row-level-security policies on the backend key off that token.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use zeroize::Zeroizing;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::session::SessionStore;

/// Path prefix of the table (PostgREST-style) surface.
pub(crate) const REST_PREFIX: &str = "rest/v1";

/// Path prefix of the auth surface.
pub(crate) const AUTH_PREFIX: &str = "auth/v1";

#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
    anon_key: Arc<Zeroizing<String>>,
    session: Arc<SessionStore>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl Transport {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: Url,
        anon_key: Zeroizing<String>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            http,
            base_url,
            anon_key: Arc::new(anon_key),
            session,
        }
    }

    pub(crate) fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Resolve `{prefix}/{path}` against the project URL.
    pub(crate) fn url(&self, prefix: &str, path: &str) -> Result<Url, ApiError> {
        let joined = format!("{prefix}/{path}");
        self.base_url
            .join(&joined)
            .map_err(|e| ApiError::Config(ConfigError::InvalidUrl(joined, e.to_string())))
    }

    /// Start a request with the `apikey` and bearer headers attached.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .session
            .access_token()
            .unwrap_or_else(|| Zeroizing::new(self.anon_key.as_str().to_owned()));
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(bearer.as_str())
    }

    /// Send a request and turn non-2xx statuses into errors.
    ///
    /// 409 becomes [`ApiError::Conflict`]; any other failure status becomes
    /// [`ApiError::Api`] with the response body attached.
    pub(crate) async fn send(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<Response, ApiError> {
        tracing::debug!(endpoint, "sending backend request");

        let resp = builder.send().await.map_err(|e| {
            tracing::warn!(endpoint, "backend request failed: {e}");
            ApiError::Http {
                endpoint: endpoint.into(),
                source: e,
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(endpoint, status = status.as_u16(), "backend returned error status");
        if status == StatusCode::CONFLICT {
            return Err(ApiError::Conflict {
                endpoint: endpoint.into(),
                body,
            });
        }
        Err(ApiError::Api {
            endpoint: endpoint.into(),
            status: status.as_u16(),
            body,
        })
    }

    /// Send a request and deserialize the JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.send(endpoint, builder).await?;
        resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }
}
