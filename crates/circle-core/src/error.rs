//! # Error Types: Field Validation
//!
//! Validation failures are local and recoverable: they block wizard
//! progression and are rendered next to the offending field. Each variant
//! names the field and the rule it broke, so the message can be shown to the
//! user as-is.

use thiserror::Error;

use crate::availability::UsernameAvailability;

/// A signup field failed its validation rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{field} is required")]
    Required {
        /// Human-readable field name.
        field: &'static str,
    },

    /// The email address does not look like one.
    #[error("please enter a valid email address")]
    InvalidEmail,

    /// The password is shorter than the minimum length.
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum accepted length, in characters.
        min: usize,
    },

    /// The confirmation does not match the password.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The age is not an integer.
    #[error("age must be a whole number")]
    AgeNotANumber,

    /// The age is outside the accepted range.
    #[error("age must be between {min} and {max}")]
    AgeOutOfRange {
        /// Lowest accepted age.
        min: u8,
        /// Highest accepted age.
        max: u8,
    },

    /// The username is shorter than the minimum length.
    #[error("username must be at least {min} characters")]
    UsernameTooShort {
        /// Minimum accepted length, in characters.
        min: usize,
    },

    /// The username is already in use.
    #[error("username is already taken")]
    UsernameTaken,

    /// Availability has not been confirmed for the current username, either
    /// because the check is still pending or because it failed.
    #[error("username availability has not been confirmed")]
    UsernameUnconfirmed {
        /// Last known availability, if a check has resolved.
        last_known: Option<UsernameAvailability>,
    },

    /// No interest has been selected.
    #[error("select at least one interest")]
    NoInterests,
}
