//! # circle-signup -- Signup/Login Wizard
//!
//! Drives new users through the nine-step account wizard and returning
//! users through the login form:
//!
//! - [`step`]: modes, the fixed step order and its transition table.
//! - [`form`]: the accumulated form fields.
//! - [`username`]: the debounced, supersedable availability probe.
//! - [`sequencer`]: [`SignupFlow`], which owns all of the above.
//! - [`backend`]: the [`SignupBackend`] port, implemented for
//!   [`circle_client::CircleClient`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use circle_client::{CircleClient, ClientConfig};
//! use circle_signup::{AuthMode, FormField, SequencerConfig, SignupFlow};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CircleClient::new(ClientConfig::from_env()?)?;
//! let session = client.auth().watch();
//! let mut flow = SignupFlow::new(Arc::new(client), session, SequencerConfig::default());
//!
//! flow.set_mode(AuthMode::Signup);
//! flow.update_field(FormField::Email, "a@b.com");
//! flow.advance().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod form;
pub mod sequencer;
pub mod step;
pub mod username;

pub use backend::SignupBackend;
pub use error::SignupError;
pub use form::{AuthFormData, FormField};
pub use sequencer::{Advance, SequencerConfig, SignupFlow};
pub use step::{AuthMode, SignupStep};
pub use username::{UsernameProbe, UsernameStatus, DEFAULT_USERNAME_DEBOUNCE};
