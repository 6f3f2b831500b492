//! # Signup/Login Sequencer
//!
//! [`SignupFlow`] owns the whole wizard state: the active mode, the current
//! signup step, the accumulated [`AuthFormData`] and the username probe.
//! It is the only writer of that state; callers mutate it exclusively
//! through the operations below.
//!
//! ## Transitions
//!
//! | Operation | From | To |
//! |-----------|------|----|
//! | `set_mode(Signup)` | any | Signup / `email`, empty form |
//! | `set_mode(Login)` | any | Login, empty form |
//! | `set_mode(Welcome)` | any | Welcome, empty form |
//! | `advance()` | Signup / step N (valid) | Signup / step N+1 |
//! | `advance()` | Signup / `interests` (valid) | create account, then Welcome |
//! | `retreat()` | Signup / step N | Signup / step N-1 |
//! | `retreat()` | Signup / `email`, Login | Welcome |
//!
//! A failed backend call leaves mode, step and form untouched and records
//! a pending alert for the caller to show.
//!
//! Login success is not applied here. The authenticated transition is
//! observed through the injected [`SessionWatch`].

use std::sync::Arc;
use std::time::Duration;

use circle_client::{AuthUser, SessionWatch};
use circle_core::{
    validate_age, validate_confirm_password, validate_email, validate_interests,
    validate_password, validate_required, validate_username, ValidationError,
};

use crate::backend::SignupBackend;
use crate::error::SignupError;
use crate::form::{AuthFormData, FormField};
use crate::step::{AuthMode, SignupStep};
use crate::username::{UsernameProbe, UsernameStatus, DEFAULT_USERNAME_DEBOUNCE};

/// Tunables for the wizard.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Settling delay between the last username keystroke and the
    /// availability query.
    pub username_debounce: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            username_debounce: DEFAULT_USERNAME_DEBOUNCE,
        }
    }
}

/// Outcome of a successful [`SignupFlow::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved to the given step.
    Moved(SignupStep),
    /// The account was created and the wizard returned to Welcome.
    AccountCreated(AuthUser),
}

/// The signup/login wizard.
pub struct SignupFlow {
    mode: AuthMode,
    step: SignupStep,
    form: AuthFormData,
    probe: UsernameProbe,
    backend: Arc<dyn SignupBackend>,
    session: SessionWatch,
    alert: Option<String>,
}

impl std::fmt::Debug for SignupFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupFlow")
            .field("mode", &self.mode)
            .field("step", &self.step)
            .field("form", &self.form)
            .field("probe", &self.probe)
            .field("alert", &self.alert)
            .finish()
    }
}

impl SignupFlow {
    /// Create a wizard on the Welcome screen.
    pub fn new(backend: Arc<dyn SignupBackend>, session: SessionWatch, config: SequencerConfig) -> Self {
        Self {
            mode: AuthMode::Welcome,
            step: SignupStep::Email,
            form: AuthFormData::default(),
            probe: UsernameProbe::new(Arc::clone(&backend), config.username_debounce),
            backend,
            session,
            alert: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn step(&self) -> SignupStep {
        self.step
    }

    pub fn form(&self) -> &AuthFormData {
        &self.form
    }

    pub fn username_status(&self) -> UsernameStatus {
        self.probe.status()
    }

    /// Take the pending user-visible notification, if any.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Whether the session watch currently reports a signed-in user.
    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session.borrow().clone()
    }

    /// Wait until the session watch reports a signed-in user.
    ///
    /// Returns `None` if the session store was dropped.
    pub async fn authenticated(&mut self) -> Option<AuthUser> {
        match self.session.wait_for(Option::is_some).await {
            Ok(user) => user.clone(),
            Err(_) => None,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Switch mode. Every mode change starts from an empty form.
    pub fn set_mode(&mut self, mode: AuthMode) {
        tracing::info!(from = %self.mode, to = %mode, "auth mode changed");
        self.reset();
        self.mode = mode;
    }

    /// Set one form field.
    ///
    /// Editing the username while on the username step restarts the
    /// debounced availability check.
    pub fn update_field(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value.into());
        if field.is_secret() {
            tracing::debug!(field = %field, "form field updated");
        } else {
            tracing::debug!(field = %field, value = self.form.get(field), "form field updated");
        }

        if field == FormField::Username
            && self.mode == AuthMode::Signup
            && self.step == SignupStep::Username
        {
            self.probe.submit(&self.form.username);
        }
    }

    /// Add or remove an interest tag. Returns whether it is now selected.
    pub fn toggle_interest(&mut self, tag: &str) -> bool {
        self.form.toggle_interest(tag)
    }

    /// Wait for the pending username check to finish.
    pub async fn username_settled(&mut self) -> UsernameStatus {
        self.probe.settled().await;
        self.probe.status()
    }

    // ── Validation ───────────────────────────────────────────────────

    /// The inline validation error for `step`, or `None` if it is complete.
    pub fn validation_error(&self, step: SignupStep) -> Option<ValidationError> {
        let form = &self.form;
        let result = match step {
            SignupStep::Email => validate_email(&form.email),
            SignupStep::Password => validate_password(&form.password),
            SignupStep::ConfirmPassword => {
                validate_confirm_password(&form.password, &form.confirm_password)
            }
            SignupStep::Name => validate_required("first name", &form.first_name)
                .and_then(|()| validate_required("last name", &form.last_name)),
            SignupStep::Gender => validate_required("gender", &form.gender),
            SignupStep::Age => validate_age(&form.age).map(|_| ()),
            SignupStep::Country => validate_required("country", &form.country),
            SignupStep::Username => {
                validate_username(&form.username, self.probe.availability_for(&form.username))
            }
            SignupStep::Interests => validate_interests(form.interests.len()),
        };
        result.err()
    }

    pub fn can_advance(&self, step: SignupStep) -> bool {
        self.validation_error(step).is_none()
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Move to the next step, or create the account from the last one.
    pub async fn advance(&mut self) -> Result<Advance, SignupError> {
        self.require_mode(AuthMode::Signup, "advance")?;

        let step = self.step;
        if let Some(source) = self.validation_error(step) {
            return Err(SignupError::Incomplete { step, source });
        }

        match step.next() {
            Some(next) => {
                self.step = next;
                tracing::info!(from = %step, to = %next, "signup step advanced");
                if next == SignupStep::Username && !self.probe.is_tracking(&self.form.username) {
                    self.probe.submit(&self.form.username);
                }
                Ok(Advance::Moved(next))
            }
            None => self.create_account().await,
        }
    }

    /// Go back one step, or to Welcome from the first step and from Login.
    pub fn retreat(&mut self) {
        match self.mode {
            AuthMode::Welcome => {}
            AuthMode::Login => self.set_mode(AuthMode::Welcome),
            AuthMode::Signup => match self.step.previous() {
                Some(previous) => {
                    tracing::info!(from = %self.step, to = %previous, "signup step retreated");
                    self.step = previous;
                }
                None => self.set_mode(AuthMode::Welcome),
            },
        }
    }

    /// Send the login credentials.
    ///
    /// Wizard state is not changed on success.
    pub async fn submit_login(&mut self) -> Result<AuthUser, SignupError> {
        self.require_mode(AuthMode::Login, "log in")?;
        if self.form.email.is_empty() || self.form.password.is_empty() {
            return Err(SignupError::MissingCredentials);
        }

        match self
            .backend
            .sign_in(&self.form.email, &self.form.password)
            .await
        {
            Ok(user) => Ok(user),
            Err(e) => {
                tracing::warn!("sign-in failed: {e}");
                self.alert = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn create_account(&mut self) -> Result<Advance, SignupError> {
        // Earlier steps may have been edited after they were passed.
        for step in SignupStep::ORDER {
            if let Some(source) = self.validation_error(step) {
                return Err(SignupError::Incomplete { step, source });
            }
        }
        let profile = self
            .form
            .to_profile()
            .map_err(|source| SignupError::Incomplete {
                step: SignupStep::Age,
                source,
            })?;

        match self
            .backend
            .sign_up(&self.form.email, &self.form.password, &profile)
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, username = %profile.username, "signup completed");
                self.set_mode(AuthMode::Welcome);
                Ok(Advance::AccountCreated(user))
            }
            Err(e) => {
                tracing::warn!("account creation failed: {e}");
                self.alert = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    fn require_mode(&self, expected: AuthMode, action: &'static str) -> Result<(), SignupError> {
        if self.mode != expected {
            return Err(SignupError::WrongMode {
                action,
                mode: self.mode,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.step = SignupStep::Email;
        self.form = AuthFormData::default();
        self.probe.reset();
        self.alert = None;
    }
}
