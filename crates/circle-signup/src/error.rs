use thiserror::Error;

use circle_client::ApiError;
use circle_core::ValidationError;

use crate::step::{AuthMode, SignupStep};

/// Errors from driving the signup/login wizard.
#[derive(Error, Debug)]
pub enum SignupError {
    /// The current step's field(s) do not pass validation. The wizard did
    /// not move.
    #[error("{step} step is incomplete: {source}")]
    Incomplete {
        step: SignupStep,
        #[source]
        source: ValidationError,
    },

    /// Login needs both email and password.
    #[error("email and password are required")]
    MissingCredentials,

    /// The operation is not available in the current mode.
    #[error("cannot {action} while in {mode} mode")]
    WrongMode {
        action: &'static str,
        mode: AuthMode,
    },

    /// The backend call failed. Entered data is kept so the user can retry.
    #[error("backend call failed: {0}")]
    Backend(#[from] ApiError),
}
