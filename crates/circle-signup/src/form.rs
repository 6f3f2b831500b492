//! Accumulated wizard input.

use std::collections::BTreeSet;
use std::str::FromStr;

use zeroize::Zeroizing;

use circle_client::auth::SignUpProfile;
use circle_core::{validate_age, ValidationError};

/// A single-valued form field.
///
/// Interests are set-valued and go through
/// [`SignupFlow::toggle_interest`](crate::SignupFlow::toggle_interest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Email,
    Password,
    ConfirmPassword,
    FirstName,
    LastName,
    Gender,
    Age,
    Country,
    Username,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirm-password",
            Self::FirstName => "first-name",
            Self::LastName => "last-name",
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Country => "country",
            Self::Username => "username",
        }
    }

    /// Whether the value must never be echoed or logged.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Password | Self::ConfirmPassword)
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown form field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for FormField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "password" => Ok(Self::Password),
            "confirm-password" => Ok(Self::ConfirmPassword),
            "first-name" => Ok(Self::FirstName),
            "last-name" => Ok(Self::LastName),
            "gender" => Ok(Self::Gender),
            "age" => Ok(Self::Age),
            "country" => Ok(Self::Country),
            "username" => Ok(Self::Username),
            other => Err(UnknownField(other.to_string())),
        }
    }
}

/// Everything the user has typed so far.
///
/// Passwords are held in [`Zeroizing`] buffers and wiped when the form is
/// reset or dropped. Age stays a string until submission so that the user
/// can type freely; it is parsed by the age validator.
#[derive(Clone, Default)]
pub struct AuthFormData {
    pub email: String,
    pub password: Zeroizing<String>,
    pub confirm_password: Zeroizing<String>,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub age: String,
    pub country: String,
    pub username: String,
    pub interests: BTreeSet<String>,
}

impl std::fmt::Debug for AuthFormData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFormData")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("gender", &self.gender)
            .field("age", &self.age)
            .field("country", &self.country)
            .field("username", &self.username)
            .field("interests", &self.interests)
            .finish()
    }
}

impl AuthFormData {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Email => &self.email,
            FormField::Password => self.password.as_str(),
            FormField::ConfirmPassword => self.confirm_password.as_str(),
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Gender => &self.gender,
            FormField::Age => &self.age,
            FormField::Country => &self.country,
            FormField::Username => &self.username,
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Email => self.email = value,
            FormField::Password => self.password = Zeroizing::new(value),
            FormField::ConfirmPassword => self.confirm_password = Zeroizing::new(value),
            FormField::FirstName => self.first_name = value,
            FormField::LastName => self.last_name = value,
            FormField::Gender => self.gender = value,
            FormField::Age => self.age = value,
            FormField::Country => self.country = value,
            FormField::Username => self.username = value,
        }
    }

    /// Add `tag` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle_interest(&mut self, tag: &str) -> bool {
        if self.interests.remove(tag) {
            false
        } else {
            self.interests.insert(tag.to_string());
            true
        }
    }

    /// Profile payload for account creation.
    ///
    /// Interests are emitted in sorted order.
    pub fn to_profile(&self) -> Result<SignUpProfile, ValidationError> {
        Ok(SignUpProfile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            age: validate_age(&self.age)?,
            country: self.country.clone(),
            username: self.username.clone(),
            interests: self.interests.iter().cloned().collect(),
        })
    }
}
