//! Typed client for the auth surface.
//!
//! Context path: `/auth/v1`
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/signup` | Create an account (profile fields travel as user metadata) |
//! | POST   | `/token?grant_type=password` | Sign in with email + password |
//! | POST   | `/logout` | Revoke the current session |
//! | GET    | `/user` | Fetch the user for the current access token |
//!
//! A successful sign-in (or a sign-up on a backend with auto-confirm) installs
//! the returned session in the shared session store, which notifies every
//! [`SessionWatch`](crate::session::SessionWatch) observer.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::{AuthUser, Session, SessionWatch};
use crate::transport::{Transport, AUTH_PREFIX};

// -- Request/Response types ---------------------------------------------------

/// Profile fields submitted with a new account.
///
/// Stored by the auth surface as user metadata; the backend's new-user
/// trigger creates the `profiles` row from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpProfile {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub age: u8,
    pub country: String,
    pub username: String,
    pub interests: Vec<String>,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SignUpProfile,
}

#[derive(Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// The signup endpoint answers with a full session when the backend
/// auto-confirms accounts, or with the bare user when email confirmation
/// is pending.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

// -- Client -------------------------------------------------------------------

/// Client for the auth surface.
#[derive(Debug, Clone)]
pub struct AuthClient {
    transport: Transport,
}

impl AuthClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Create an account.
    ///
    /// Calls `POST {base_url}/auth/v1/signup`. When the response carries a
    /// session, the caller is signed in immediately.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> Result<AuthUser, ApiError> {
        let endpoint = "POST /auth/v1/signup";
        let url = self.transport.url(AUTH_PREFIX, "signup")?;
        let body = SignUpRequest {
            email,
            password,
            data: profile,
        };

        let resp: SignUpResponse = self
            .transport
            .send_json(endpoint, self.transport.request(Method::POST, url).json(&body))
            .await?;

        let user = match resp {
            SignUpResponse::Session(session) => {
                let user = session.user.clone();
                self.transport.session().set(session);
                user
            }
            SignUpResponse::User(user) => user,
        };
        tracing::info!(user_id = %user.id, username = %profile.username, "account created");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// Calls `POST {base_url}/auth/v1/token?grant_type=password`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ApiError> {
        let endpoint = "POST /auth/v1/token";
        let mut url = self.transport.url(AUTH_PREFIX, "token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let session: Session = self
            .transport
            .send_json(
                endpoint,
                self.transport
                    .request(Method::POST, url)
                    .json(&PasswordGrantRequest { email, password }),
            )
            .await?;

        let user = session.user.clone();
        self.transport.session().set(session);
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    /// Revoke the current session.
    ///
    /// Calls `POST {base_url}/auth/v1/logout`. The local session is cleared
    /// even when the backend call fails, so the user is never left half
    /// signed-in.
    pub async fn sign_out(&self) -> Result<(), ApiError> {
        let endpoint = "POST /auth/v1/logout";
        if self.transport.session().session().is_none() {
            return Ok(());
        }
        let url = self.transport.url(AUTH_PREFIX, "logout")?;
        let result = self
            .transport
            .send(endpoint, self.transport.request(Method::POST, url))
            .await;
        self.transport.session().clear();
        tracing::info!("signed out");
        result.map(|_| ())
    }

    /// Fetch the user for the current access token.
    ///
    /// Calls `GET {base_url}/auth/v1/user`.
    pub async fn get_user(&self) -> Result<AuthUser, ApiError> {
        let endpoint = "GET /auth/v1/user";
        if self.transport.session().access_token().is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        let url = self.transport.url(AUTH_PREFIX, "user")?;
        self.transport
            .send_json(endpoint, self.transport.request(Method::GET, url))
            .await
    }

    /// The current session, if signed in.
    pub fn session(&self) -> Option<Session> {
        self.transport.session().session()
    }

    /// Observe the current user.
    pub fn watch(&self) -> SessionWatch {
        self.transport.session().watch()
    }
}
