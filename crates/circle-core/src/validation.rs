//! # Field Validators
//!
//! One pure function per signup field. Each returns `Ok(())` when the value
//! satisfies its rule, or the [`ValidationError`] to render inline.
//!
//! | field | rule |
//! |---|---|
//! | email | non-empty, contains `@` |
//! | password | at least [`MIN_PASSWORD_LEN`] characters |
//! | confirm password | non-empty, equals password |
//! | first/last name, gender, country | non-empty |
//! | age | integer in [`MIN_AGE`]..=[`MAX_AGE`] |
//! | username | at least [`MIN_USERNAME_LEN`] characters and confirmed available |
//! | interests | at least one selected |

use crate::availability::UsernameAvailability;
use crate::error::ValidationError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Minimum username length, in characters.
pub const MIN_USERNAME_LEN: usize = 3;

/// Youngest accepted age.
pub const MIN_AGE: u8 = 13;

/// Oldest accepted age.
pub const MAX_AGE: u8 = 120;

/// Email must be non-empty and contain `@`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Password must be at least [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Confirmation must be non-empty and identical to the password.
pub fn validate_confirm_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if confirm.is_empty() {
        return Err(ValidationError::Required {
            field: "password confirmation",
        });
    }
    if confirm != password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Generic non-empty check for free-text fields.
pub fn validate_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Age must parse as an integer within [`MIN_AGE`]..=[`MAX_AGE`].
///
/// Returns the parsed age on success.
pub fn validate_age(age: &str) -> Result<u8, ValidationError> {
    if age.trim().is_empty() {
        return Err(ValidationError::Required { field: "age" });
    }
    let parsed: i64 = age
        .trim()
        .parse()
        .map_err(|_| ValidationError::AgeNotANumber)?;
    if parsed < i64::from(MIN_AGE) || parsed > i64::from(MAX_AGE) {
        return Err(ValidationError::AgeOutOfRange {
            min: MIN_AGE,
            max: MAX_AGE,
        });
    }
    // Range-checked above.
    Ok(parsed as u8)
}

/// Username must be long enough and confirmed available.
///
/// `availability` is the resolved result for the *current* value, or `None`
/// while no check has resolved.
pub fn validate_username(
    username: &str,
    availability: Option<UsernameAvailability>,
) -> Result<(), ValidationError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort {
            min: MIN_USERNAME_LEN,
        });
    }
    match availability {
        Some(UsernameAvailability::Available) => Ok(()),
        Some(UsernameAvailability::Taken) => Err(ValidationError::UsernameTaken),
        last_known => Err(ValidationError::UsernameUnconfirmed { last_known }),
    }
}

/// At least one interest must be selected.
pub fn validate_interests(selected: usize) -> Result<(), ValidationError> {
    if selected == 0 {
        return Err(ValidationError::NoInterests);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn email_requires_at_sign() {
        assert_eq!(
            validate_email(""),
            Err(ValidationError::Required { field: "email" })
        );
        assert_eq!(validate_email("ab.com"), Err(ValidationError::InvalidEmail));
        assert!(validate_email("a@b.com").is_ok());
    }

    #[test]
    fn password_length_boundary() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        // 8 characters, 16 bytes.
        assert!(validate_password("éééééééé").is_ok());
        // 7 characters, 14 bytes.
        assert!(validate_password("ééééééé").is_err());
    }

    #[test]
    fn confirm_password_must_match_and_be_present() {
        assert!(matches!(
            validate_confirm_password("", ""),
            Err(ValidationError::Required { .. })
        ));
        assert_eq!(
            validate_confirm_password("password123", "password124"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_confirm_password("password123", "password123").is_ok());
    }

    #[test]
    fn age_boundaries() {
        assert_eq!(validate_age("13"), Ok(13));
        assert_eq!(validate_age("120"), Ok(120));
        assert!(matches!(
            validate_age("12"),
            Err(ValidationError::AgeOutOfRange { .. })
        ));
        assert!(matches!(
            validate_age("121"),
            Err(ValidationError::AgeOutOfRange { .. })
        ));
    }

    #[test]
    fn age_rejects_non_numeric() {
        assert_eq!(validate_age("twenty"), Err(ValidationError::AgeNotANumber));
        assert_eq!(validate_age("25.5"), Err(ValidationError::AgeNotANumber));
        assert!(matches!(
            validate_age(""),
            Err(ValidationError::Required { field: "age" })
        ));
    }

    #[test]
    fn username_needs_length_and_confirmed_availability() {
        assert!(matches!(
            validate_username("ab", Some(UsernameAvailability::Available)),
            Err(ValidationError::UsernameTooShort { min: 3 })
        ));
        assert_eq!(
            validate_username("abc", Some(UsernameAvailability::Taken)),
            Err(ValidationError::UsernameTaken)
        );
        assert_eq!(
            validate_username("abc", Some(UsernameAvailability::Unknown)),
            Err(ValidationError::UsernameUnconfirmed {
                last_known: Some(UsernameAvailability::Unknown)
            })
        );
        assert_eq!(
            validate_username("abc", None),
            Err(ValidationError::UsernameUnconfirmed { last_known: None })
        );
        assert!(validate_username("abc", Some(UsernameAvailability::Available)).is_ok());
    }

    #[test]
    fn interests_need_one_selection() {
        assert_eq!(validate_interests(0), Err(ValidationError::NoInterests));
        assert!(validate_interests(1).is_ok());
    }

    proptest! {
        #[test]
        fn every_age_in_range_is_accepted(age in 13u8..=120) {
            prop_assert_eq!(validate_age(&age.to_string()), Ok(age));
        }

        #[test]
        fn every_age_out_of_range_is_rejected(age in prop_oneof![-1000i64..13, 121i64..10_000]) {
            prop_assert!(validate_age(&age.to_string()).is_err());
        }

        #[test]
        fn any_email_with_at_sign_is_accepted(local in "[a-z]{1,10}", domain in "[a-z]{1,10}") {
            let email = format!("{local}@{domain}");
            prop_assert!(validate_email(&email).is_ok());
        }
    }
}
