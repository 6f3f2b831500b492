//! # circle-core: Foundational Types for Circle
//!
//! The leaf of the workspace dependency graph. Defines the small set of
//! types that both the signup wizard (`circle-signup`) and the hosted
//! backend client (`circle-client`) need to agree on:
//!
//! 1. **Identifier newtypes.** `UserId` wraps the backend's UUID primary
//!    key; `Username` carries the case-folding rule used for uniqueness
//!    lookups. No bare strings for identifiers.
//!
//! 2. **`UsernameAvailability`.** The tri-state result of an availability
//!    check. A failed lookup is `Unknown`, never `Taken`.
//!
//! 3. **Field validators.** Pure functions for every signup field, each
//!    returning a structured [`ValidationError`] so callers can render the
//!    failure inline next to the field.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `circle-*` crates.
//! - No I/O, no async.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod availability;
pub mod error;
pub mod identity;
pub mod validation;

pub use availability::UsernameAvailability;
pub use error::ValidationError;
pub use identity::{UserId, Username};
pub use validation::{
    validate_age, validate_confirm_password, validate_email, validate_interests,
    validate_password, validate_required, validate_username, MAX_AGE, MIN_AGE,
    MIN_PASSWORD_LEN, MIN_USERNAME_LEN,
};
