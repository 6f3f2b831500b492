//! Wizard tests against an in-memory backend.
//!
//! Time is paused: sleeps complete instantly, in timer order, once every
//! task is idle. That makes debounce timing deterministic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use zeroize::Zeroizing;

use circle_client::auth::SignUpProfile;
use circle_client::{ApiError, AuthUser, Session, SessionStore};
use circle_core::{UserId, UsernameAvailability, ValidationError};
use circle_signup::{
    Advance, AuthMode, FormField, SequencerConfig, SignupBackend, SignupError, SignupFlow,
    SignupStep, UsernameStatus,
};

// ── Fake backend ─────────────────────────────────────────────────────

#[derive(Default)]
struct FakeBackend {
    taken: Vec<&'static str>,
    lookup_delay: Duration,
    fail_lookups: bool,
    fail_sign_up: AtomicBool,
    queries: Mutex<Vec<String>>,
    sign_ups: Mutex<Vec<(String, String, SignUpProfile)>>,
    sign_ins: Mutex<Vec<String>>,
    session: Option<Arc<SessionStore>>,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            taken: vec!["admin"],
            session: Some(SessionStore::new()),
            ..Default::default()
        }
    }

    fn store(&self) -> &Arc<SessionStore> {
        self.session.as_ref().unwrap()
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    fn user(email: &str) -> AuthUser {
        AuthUser {
            id: UserId::new(),
            email: Some(email.to_string()),
            user_metadata: serde_json::Value::Null,
            created_at: None,
        }
    }

    fn failure(endpoint: &str) -> ApiError {
        ApiError::Api {
            endpoint: endpoint.to_string(),
            status: 500,
            body: "backend unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SignupBackend for FakeBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> Result<AuthUser, ApiError> {
        self.sign_ups
            .lock()
            .push((email.to_string(), password.to_string(), profile.clone()));
        if self.fail_sign_up.load(Ordering::SeqCst) {
            return Err(Self::failure("POST /auth/v1/signup"));
        }
        Ok(Self::user(email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ApiError> {
        self.sign_ins.lock().push(email.to_string());
        if password != "password123" {
            return Err(ApiError::Api {
                endpoint: "POST /auth/v1/token".to_string(),
                status: 400,
                body: "Invalid login credentials".to_string(),
            });
        }
        let user = Self::user(email);
        self.store().set(Session {
            access_token: Zeroizing::new("token".to_string()),
            refresh_token: None,
            token_type: None,
            expires_in: None,
            user: user.clone(),
        });
        Ok(user)
    }

    async fn check_username_availability(&self, username: &str) -> UsernameAvailability {
        self.queries.lock().push(username.to_string());
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        if self.fail_lookups {
            return UsernameAvailability::Unknown;
        }
        if self.taken.iter().any(|t| t.eq_ignore_ascii_case(username)) {
            UsernameAvailability::Taken
        } else {
            UsernameAvailability::Available
        }
    }
}

fn flow_with(backend: &Arc<FakeBackend>) -> SignupFlow {
    SignupFlow::new(
        backend.clone(),
        backend.store().watch(),
        SequencerConfig::default(),
    )
}

async fn advance_ok(flow: &mut SignupFlow) -> Advance {
    match flow.advance().await {
        Ok(outcome) => outcome,
        Err(e) => panic!("advance from {} failed: {e}", flow.step()),
    }
}

/// Fill and pass every step before `username`.
async fn walk_to_username(flow: &mut SignupFlow) {
    flow.set_mode(AuthMode::Signup);
    flow.update_field(FormField::Email, "a@b.com");
    advance_ok(flow).await;
    flow.update_field(FormField::Password, "password123");
    advance_ok(flow).await;
    flow.update_field(FormField::ConfirmPassword, "password123");
    advance_ok(flow).await;
    flow.update_field(FormField::FirstName, "Jo");
    flow.update_field(FormField::LastName, "Doe");
    advance_ok(flow).await;
    flow.update_field(FormField::Gender, "female");
    advance_ok(flow).await;
    flow.update_field(FormField::Age, "25");
    advance_ok(flow).await;
    flow.update_field(FormField::Country, "Canada");
    assert_eq!(advance_ok(flow).await, Advance::Moved(SignupStep::Username));
}

// ── End to end ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn full_signup_creates_account_once_and_returns_to_welcome() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);

    walk_to_username(&mut flow).await;
    flow.update_field(FormField::Username, "uniqueName42");
    assert_eq!(flow.username_status(), UsernameStatus::Checking);
    assert!(!flow.can_advance(SignupStep::Username));

    assert_eq!(
        flow.username_settled().await,
        UsernameStatus::Resolved(UsernameAvailability::Available)
    );
    assert_eq!(advance_ok(&mut flow).await, Advance::Moved(SignupStep::Interests));

    assert!(!flow.can_advance(SignupStep::Interests));
    assert!(flow.toggle_interest("music"));
    match advance_ok(&mut flow).await {
        Advance::AccountCreated(user) => assert_eq!(user.email.as_deref(), Some("a@b.com")),
        other => panic!("expected account creation, got {other:?}"),
    }

    let sign_ups = backend.sign_ups.lock().clone();
    assert_eq!(sign_ups.len(), 1);
    let (email, password, profile) = &sign_ups[0];
    assert_eq!(email, "a@b.com");
    assert_eq!(password, "password123");
    assert_eq!(
        profile,
        &SignUpProfile {
            first_name: "Jo".into(),
            last_name: "Doe".into(),
            gender: "female".into(),
            age: 25,
            country: "Canada".into(),
            username: "uniqueName42".into(),
            interests: vec!["music".into()],
        }
    );

    assert_eq!(flow.mode(), AuthMode::Welcome);
    assert_eq!(flow.step(), SignupStep::Email);
    assert!(flow.form().email.is_empty());
    assert!(flow.form().interests.is_empty());
    assert_eq!(flow.username_status(), UsernameStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn failed_sign_up_keeps_data_and_allows_retry() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_sign_up.store(true, Ordering::SeqCst);
    let mut flow = flow_with(&backend);

    walk_to_username(&mut flow).await;
    flow.update_field(FormField::Username, "jodoe");
    flow.username_settled().await;
    advance_ok(&mut flow).await;
    flow.toggle_interest("travel");

    let err = flow.advance().await.unwrap_err();
    assert!(matches!(err, SignupError::Backend(ApiError::Api { status: 500, .. })));
    assert!(flow.take_alert().unwrap().contains("backend unavailable"));
    assert!(flow.take_alert().is_none());
    assert_eq!(flow.mode(), AuthMode::Signup);
    assert_eq!(flow.step(), SignupStep::Interests);
    assert_eq!(flow.form().username, "jodoe");

    backend.fail_sign_up.store(false, Ordering::SeqCst);
    assert!(matches!(advance_ok(&mut flow).await, Advance::AccountCreated(_)));
    assert_eq!(backend.sign_ups.lock().len(), 2);
}

// ── Navigation ───────────────────────────────────────────────────────

#[tokio::test]
async fn advance_is_rejected_until_step_is_valid() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);

    flow.update_field(FormField::Email, "not-an-email");
    match flow.advance().await.unwrap_err() {
        SignupError::Incomplete { step, source } => {
            assert_eq!(step, SignupStep::Email);
            assert_eq!(source, ValidationError::InvalidEmail);
        }
        other => panic!("expected Incomplete, got {other:?}"),
    }
    assert_eq!(flow.step(), SignupStep::Email);

    flow.update_field(FormField::Email, "a@b.com");
    assert_eq!(advance_ok(&mut flow).await, Advance::Moved(SignupStep::Password));

    flow.update_field(FormField::Password, "short");
    assert_eq!(
        flow.validation_error(SignupStep::Password),
        Some(ValidationError::PasswordTooShort { min: 8 })
    );
    flow.update_field(FormField::Password, "password123");
    advance_ok(&mut flow).await;

    flow.update_field(FormField::ConfirmPassword, "password124");
    assert_eq!(
        flow.validation_error(SignupStep::ConfirmPassword),
        Some(ValidationError::PasswordMismatch)
    );
}

#[tokio::test]
async fn advance_outside_signup_is_wrong_mode() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    assert!(matches!(
        flow.advance().await,
        Err(SignupError::WrongMode { mode: AuthMode::Welcome, .. })
    ));
}

#[tokio::test]
async fn retreat_walks_back_then_leaves_to_welcome() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);
    flow.update_field(FormField::Email, "a@b.com");
    advance_ok(&mut flow).await;

    flow.retreat();
    assert_eq!(flow.step(), SignupStep::Email);
    assert_eq!(flow.form().email, "a@b.com");

    flow.retreat();
    assert_eq!(flow.mode(), AuthMode::Welcome);
    assert!(flow.form().email.is_empty());

    flow.set_mode(AuthMode::Login);
    flow.retreat();
    assert_eq!(flow.mode(), AuthMode::Welcome);
}

#[tokio::test]
async fn entering_signup_resets_form_and_step() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);
    flow.update_field(FormField::Email, "a@b.com");
    advance_ok(&mut flow).await;
    flow.toggle_interest("music");

    flow.set_mode(AuthMode::Signup);
    assert_eq!(flow.step(), SignupStep::Email);
    assert!(flow.form().email.is_empty());
    assert!(flow.form().interests.is_empty());
}

#[tokio::test]
async fn age_bounds_are_inclusive() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);

    for (age, ok) in [("12", false), ("13", true), ("120", true), ("121", false), ("abc", false), ("", false)] {
        flow.update_field(FormField::Age, age);
        assert_eq!(flow.can_advance(SignupStep::Age), ok, "age {age:?}");
    }
}

#[tokio::test]
async fn name_requires_both_parts() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);

    flow.update_field(FormField::FirstName, "Jo");
    assert_eq!(
        flow.validation_error(SignupStep::Name),
        Some(ValidationError::Required { field: "last name" })
    );
    flow.update_field(FormField::LastName, "Doe");
    assert!(flow.can_advance(SignupStep::Name));
}

// ── Username probe ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_issue_one_query_for_final_value() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    walk_to_username(&mut flow).await;

    flow.update_field(FormField::Username, "uniq");
    tokio::time::sleep(Duration::from_millis(100)).await;
    flow.update_field(FormField::Username, "uniqueName");
    tokio::time::sleep(Duration::from_millis(100)).await;
    flow.update_field(FormField::Username, "uniqueName42");

    flow.username_settled().await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.queries(), vec!["uniqueName42".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn settled_keystrokes_each_query() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    walk_to_username(&mut flow).await;

    flow.update_field(FormField::Username, "first");
    tokio::time::sleep(Duration::from_millis(600)).await;
    flow.update_field(FormField::Username, "second");
    flow.username_settled().await;

    assert_eq!(backend.queries(), vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn in_flight_query_is_superseded_by_newer_keystroke() {
    let backend = Arc::new(FakeBackend {
        lookup_delay: Duration::from_secs(1),
        ..FakeBackend::new()
    });
    let mut flow = flow_with(&backend);
    walk_to_username(&mut flow).await;

    // "jodoe" is free, but its answer is still in flight when "admin" is typed.
    flow.update_field(FormField::Username, "jodoe");
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(backend.queries(), vec!["jodoe".to_string()]);

    flow.update_field(FormField::Username, "admin");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(
        flow.username_status(),
        UsernameStatus::Resolved(UsernameAvailability::Taken)
    );
    assert_eq!(
        flow.validation_error(SignupStep::Username),
        Some(ValidationError::UsernameTaken)
    );
}

#[tokio::test(start_paused = true)]
async fn short_username_is_not_queried() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    walk_to_username(&mut flow).await;

    flow.update_field(FormField::Username, "ab");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(flow.username_status(), UsernameStatus::Idle);
    assert!(backend.queries().is_empty());
    assert_eq!(
        flow.validation_error(SignupStep::Username),
        Some(ValidationError::UsernameTooShort { min: 3 })
    );
}

#[tokio::test(start_paused = true)]
async fn lookup_failure_blocks_without_claiming_taken() {
    let backend = Arc::new(FakeBackend {
        fail_lookups: true,
        ..FakeBackend::new()
    });
    let mut flow = flow_with(&backend);
    walk_to_username(&mut flow).await;

    flow.update_field(FormField::Username, "jodoe");
    flow.username_settled().await;

    assert_eq!(
        flow.validation_error(SignupStep::Username),
        Some(ValidationError::UsernameUnconfirmed {
            last_known: Some(UsernameAvailability::Unknown)
        })
    );
    assert!(matches!(
        flow.advance().await,
        Err(SignupError::Incomplete { step: SignupStep::Username, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn username_typed_early_is_checked_on_arrival() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);
    flow.update_field(FormField::Username, "jodoe");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(backend.queries().is_empty());

    // walk_to_username resets the form, so fill it by hand here.
    for (field, value) in [
        (FormField::Email, "a@b.com"),
        (FormField::Password, "password123"),
        (FormField::ConfirmPassword, "password123"),
    ] {
        flow.update_field(field, value);
        advance_ok(&mut flow).await;
    }
    flow.update_field(FormField::FirstName, "Jo");
    flow.update_field(FormField::LastName, "Doe");
    advance_ok(&mut flow).await;
    for (field, value) in [
        (FormField::Gender, "male"),
        (FormField::Age, "30"),
        (FormField::Country, "Peru"),
    ] {
        flow.update_field(field, value);
        advance_ok(&mut flow).await;
    }
    assert_eq!(flow.step(), SignupStep::Username);

    assert_eq!(
        flow.username_settled().await,
        UsernameStatus::Resolved(UsernameAvailability::Available)
    );
    assert_eq!(backend.queries(), vec!["jodoe".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn editing_resolved_username_requires_new_check() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    walk_to_username(&mut flow).await;

    flow.update_field(FormField::Username, "jodoe");
    flow.username_settled().await;
    assert!(flow.can_advance(SignupStep::Username));

    flow.update_field(FormField::Username, "jodoe2");
    assert!(!flow.can_advance(SignupStep::Username));
    flow.username_settled().await;
    assert!(flow.can_advance(SignupStep::Username));
}

// ── Login ────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_requires_both_credentials() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Login);
    flow.update_field(FormField::Email, "a@b.com");

    assert!(matches!(
        flow.submit_login().await,
        Err(SignupError::MissingCredentials)
    ));
    assert!(backend.sign_ins.lock().is_empty());
}

#[tokio::test]
async fn login_success_is_observed_through_session_watch() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Login);
    flow.update_field(FormField::Email, "a@b.com");
    flow.update_field(FormField::Password, "password123");
    assert!(!flow.is_authenticated());

    let user = flow.submit_login().await.unwrap();

    assert!(flow.is_authenticated());
    assert_eq!(flow.current_user().map(|u| u.id), Some(user.id));
    assert_eq!(flow.authenticated().await.map(|u| u.id), Some(user.id));
    assert_eq!(flow.mode(), AuthMode::Login);
    assert_eq!(flow.form().email, "a@b.com");
}

#[tokio::test]
async fn login_failure_raises_alert() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Login);
    flow.update_field(FormField::Email, "a@b.com");
    flow.update_field(FormField::Password, "wrong-password");

    assert!(flow.submit_login().await.is_err());
    assert!(!flow.is_authenticated());
    assert!(flow.take_alert().unwrap().contains("Invalid login credentials"));
}

#[tokio::test]
async fn login_outside_login_mode_is_rejected() {
    let backend = Arc::new(FakeBackend::new());
    let mut flow = flow_with(&backend);
    flow.set_mode(AuthMode::Signup);
    assert!(matches!(
        flow.submit_login().await,
        Err(SignupError::WrongMode { mode: AuthMode::Signup, .. })
    ));
}
