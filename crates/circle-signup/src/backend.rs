//! The wizard's view of the hosted backend.
//!
//! The sequencer only ever needs three calls. Abstracting them behind
//! [`SignupBackend`] lets tests drive the wizard against an in-memory fake
//! and lets the CLI plug in the real [`CircleClient`].

use async_trait::async_trait;

use circle_client::auth::SignUpProfile;
use circle_client::{ApiError, AuthUser, CircleClient};
use circle_core::UsernameAvailability;

/// Backend calls made by the signup/login wizard.
#[async_trait]
pub trait SignupBackend: Send + Sync + 'static {
    /// Create an account with the collected profile fields.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> Result<AuthUser, ApiError>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ApiError>;

    /// Look up whether `username` is free. Failures are `Unknown`.
    async fn check_username_availability(&self, username: &str) -> UsernameAvailability;
}

#[async_trait]
impl SignupBackend for CircleClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> Result<AuthUser, ApiError> {
        self.auth().sign_up(email, password, profile).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ApiError> {
        self.auth().sign_in(email, password).await
    }

    async fn check_username_availability(&self, username: &str) -> UsernameAvailability {
        self.profiles().check_username_availability(username).await
    }
}
