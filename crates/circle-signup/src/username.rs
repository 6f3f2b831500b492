//! # Debounced Username Availability Probe
//!
//! Every keystroke on the username step calls [`UsernameProbe::submit`].
//! The probe waits for the input to settle for the debounce interval, then
//! issues exactly one availability query for the value typed last.
//!
//! Two mechanisms keep stale answers out:
//!
//! - Each submit aborts the previous pending task, so a superseded query is
//!   cancelled whether it is still sleeping or already in flight.
//! - Each submit bumps a generation counter. A task only writes its result
//!   if its generation is still current when the answer arrives.
//!
//! A lookup failure resolves to [`UsernameAvailability::Unknown`], which
//! blocks advancement exactly like an unresolved check.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use circle_core::{UsernameAvailability, MIN_USERNAME_LEN};

use crate::backend::SignupBackend;

/// Default settling delay after the last keystroke.
pub const DEFAULT_USERNAME_DEBOUNCE: Duration = Duration::from_millis(500);

/// Where the availability check for the current value stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsernameStatus {
    /// Nothing to check (empty or too short).
    #[default]
    Idle,
    /// Waiting for input to settle, or waiting for the backend.
    Checking,
    /// The backend answered for the current value.
    Resolved(UsernameAvailability),
}

#[derive(Debug, Default)]
struct ProbeState {
    generation: u64,
    value: String,
    status: UsernameStatus,
}

/// Debounced, supersedable username availability check.
///
/// Must be used from within a tokio runtime; each submit spawns a task.
pub struct UsernameProbe {
    backend: Arc<dyn SignupBackend>,
    debounce: Duration,
    state: Arc<Mutex<ProbeState>>,
    pending: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for UsernameProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("UsernameProbe")
            .field("debounce", &self.debounce)
            .field("generation", &state.generation)
            .field("value", &state.value)
            .field("status", &state.status)
            .finish()
    }
}

impl UsernameProbe {
    pub fn new(backend: Arc<dyn SignupBackend>, debounce: Duration) -> Self {
        Self {
            backend,
            debounce,
            state: Arc::new(Mutex::new(ProbeState::default())),
            pending: None,
        }
    }

    /// Restart the check for a new username value.
    pub fn submit(&mut self, username: &str) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let too_short = username.chars().count() < MIN_USERNAME_LEN;
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.value = username.to_string();
            state.status = if too_short {
                UsernameStatus::Idle
            } else {
                UsernameStatus::Checking
            };
            state.generation
        };
        if too_short {
            return;
        }

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let debounce = self.debounce;
        let name = username.to_string();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if state.lock().generation != generation {
                return;
            }

            tracing::debug!(username = %name, generation, "checking username availability");
            let availability = backend.check_username_availability(&name).await;

            let mut guard = state.lock();
            if guard.generation == generation {
                guard.status = UsernameStatus::Resolved(availability);
            } else {
                tracing::debug!(username = %name, generation, "discarding stale availability result");
            }
        }));
    }

    pub fn status(&self) -> UsernameStatus {
        self.state.lock().status
    }

    /// The resolved availability, but only if it was resolved for `username`.
    pub fn availability_for(&self, username: &str) -> Option<UsernameAvailability> {
        let state = self.state.lock();
        match state.status {
            UsernameStatus::Resolved(availability) if state.value == username => Some(availability),
            _ => None,
        }
    }

    /// Whether the probe is already tracking `username` (checking or resolved).
    pub fn is_tracking(&self, username: &str) -> bool {
        let state = self.state.lock();
        state.value == username && state.status != UsernameStatus::Idle
    }

    /// Cancel any pending check and forget the last result.
    pub fn reset(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let mut state = self.state.lock();
        state.generation += 1;
        state.value.clear();
        state.status = UsernameStatus::Idle;
    }

    /// Wait until the pending check (if any) has finished or been cancelled.
    pub async fn settled(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for UsernameProbe {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
