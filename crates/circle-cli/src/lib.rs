//! # circle-cli -- Command-Line Front End for Circle
//!
//! Provides the `circle` command.
//!
//! ## Subcommands
//!
//! - `circle signup` / `circle login`: the interactive account wizard.
//! - `circle profile get|search|update`: the `profiles` table.
//! - `circle username check`: one-shot availability lookup.
//! - `circle follow|unfollow|followers|following`: the follow graph.
//! - `circle watch profile|follows`: live row changes, one JSON line each.
//! - `circle health`: reachability of the REST and auth surfaces.
//!
//! Connection settings come from flags or the environment:
//!
//! ```bash
//! export CIRCLE_URL=https://abc.example.co
//! export CIRCLE_ANON_KEY=...
//! circle profile search jo --limit 5
//! CIRCLE_EMAIL=me@example.com CIRCLE_PASSWORD=... circle follow <user-id>
//! ```

pub mod account;
pub mod follow;
pub mod health;
pub mod profile;
pub mod watch;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use circle_client::config::{DEFAULT_TIMEOUT_SECS, DEFAULT_URL};
use circle_client::{AuthUser, CircleClient, ClientConfig};

/// Where the backend lives.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Project URL of the hosted backend.
    #[arg(long, env = "CIRCLE_URL", default_value = DEFAULT_URL, global = true)]
    pub url: String,

    /// Public anonymous API key.
    #[arg(long, env = "CIRCLE_ANON_KEY", hide_env_values = true, global = true)]
    pub anon_key: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "CIRCLE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,
}

impl ConnectionArgs {
    pub fn config(&self) -> Result<ClientConfig> {
        let anon_key = self
            .anon_key
            .clone()
            .context("no anon key: pass --anon-key or set CIRCLE_ANON_KEY")?;
        let mut config = ClientConfig::new(&self.url, anon_key).context("invalid connection settings")?;
        config.timeout_secs = self.timeout_secs;
        Ok(config)
    }

    pub fn client(&self) -> Result<CircleClient> {
        CircleClient::new(self.config()?).context("failed to build backend client")
    }
}

/// Account used by commands that act as a signed-in user.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Account email.
    #[arg(long, env = "CIRCLE_EMAIL")]
    pub email: String,

    /// Account password.
    #[arg(long, env = "CIRCLE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl Credentials {
    pub async fn sign_in(&self, client: &CircleClient) -> Result<AuthUser> {
        client
            .auth()
            .sign_in(&self.email, &self.password)
            .await
            .with_context(|| format!("sign-in failed for {}", self.email))
    }
}

/// End the session opened by [`Credentials::sign_in`]. Every command that
/// signs in calls this once its work is done, whatever the outcome. A
/// failed sign-out is logged; the command's own result stands.
pub async fn sign_out(client: &CircleClient) {
    if let Err(e) = client.auth().sign_out().await {
        tracing::debug!("sign-out failed: {e}");
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
