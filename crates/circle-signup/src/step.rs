//! # Wizard Modes and Steps
//!
//! ```text
//! Welcome ──▶ Login ──▶ Welcome
//!    │
//!    ▼
//! Signup: email ──▶ password ──▶ confirm-password ──▶ name ──▶ gender
//!           │                                                    │
//!           ▼ (retreat)                                          ▼
//!        Welcome       interests ◀── username ◀── country ◀──── age
//!                          │
//!                          ▼ (account created)
//!                       Welcome
//! ```
//!
//! Transitions only ever move to the adjacent step or back to Welcome.
//! There are no skips.

use serde::{Deserialize, Serialize};

/// Which screen of the auth flow is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Welcome,
    Login,
    Signup,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "WELCOME",
            Self::Login => "LOGIN",
            Self::Signup => "SIGNUP",
        };
        f.write_str(s)
    }
}

// ─── Signup Steps ────────────────────────────────────────────────────

/// The nine signup steps, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum SignupStep {
    #[default]
    Email = 1,
    Password = 2,
    ConfirmPassword = 3,
    Name = 4,
    Gender = 5,
    Age = 6,
    Country = 7,
    Username = 8,
    Interests = 9,
}

impl SignupStep {
    /// Every step, first to last.
    pub const ORDER: [SignupStep; 9] = [
        Self::Email,
        Self::Password,
        Self::ConfirmPassword,
        Self::Name,
        Self::Gender,
        Self::Age,
        Self::Country,
        Self::Username,
        Self::Interests,
    ];

    /// 1-based position in the wizard.
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// The following step, or `None` on the last one.
    pub fn next(&self) -> Option<SignupStep> {
        match self {
            Self::Email => Some(Self::Password),
            Self::Password => Some(Self::ConfirmPassword),
            Self::ConfirmPassword => Some(Self::Name),
            Self::Name => Some(Self::Gender),
            Self::Gender => Some(Self::Age),
            Self::Age => Some(Self::Country),
            Self::Country => Some(Self::Username),
            Self::Username => Some(Self::Interests),
            Self::Interests => None,
        }
    }

    /// The preceding step, or `None` on the first one (retreat goes to Welcome).
    pub fn previous(&self) -> Option<SignupStep> {
        match self {
            Self::Email => None,
            Self::Password => Some(Self::Email),
            Self::ConfirmPassword => Some(Self::Password),
            Self::Name => Some(Self::ConfirmPassword),
            Self::Gender => Some(Self::Name),
            Self::Age => Some(Self::Gender),
            Self::Country => Some(Self::Age),
            Self::Username => Some(Self::Country),
            Self::Interests => Some(Self::Username),
        }
    }

    /// Whether advancing from this step submits the account.
    pub fn is_last(&self) -> bool {
        matches!(self, Self::Interests)
    }

    /// Kebab-case tag, as shown to the user.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirm-password",
            Self::Name => "name",
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Country => "country",
            Self::Username => "username",
            Self::Interests => "interests",
        }
    }

    /// Total number of steps.
    pub const STEP_COUNT: u8 = 9;
}

impl std::fmt::Display for SignupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
