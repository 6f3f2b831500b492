//! # Profile and Username Subcommands

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use circle_client::profiles::{ProfileUpdate, DEFAULT_SEARCH_LIMIT};
use circle_core::{UserId, UsernameAvailability};

use crate::{print_json, sign_out, ConnectionArgs, Credentials};

/// Arguments for `circle profile`.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show one profile by user id.
    Get {
        /// User id (UUID).
        id: UserId,
    },

    /// Search usernames and names (case-insensitive substring).
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },

    /// Update the signed-in user's own profile.
    Update {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        /// Make the profile private (`true`) or public (`false`).
        #[arg(long)]
        private: Option<bool>,
        /// Replace the interest list (comma-separated).
        #[arg(long, value_delimiter = ',')]
        interests: Option<Vec<String>>,
    },
}

/// Arguments for `circle username`.
#[derive(Args, Debug)]
pub struct UsernameArgs {
    #[command(subcommand)]
    pub command: UsernameCommand,
}

#[derive(Subcommand, Debug)]
pub enum UsernameCommand {
    /// Check whether a username is free. Exit code 0 if available, 1 if
    /// taken, 2 if the lookup failed.
    Check { username: String },
}

/// Execute `circle profile`.
pub async fn run_profile(args: &ProfileArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;

    match &args.command {
        ProfileCommand::Get { id } => {
            let profile = client
                .profiles()
                .get(*id)
                .await
                .with_context(|| format!("failed to load profile {id}"))?;
            print_json(&profile)?;
        }

        ProfileCommand::Search { query, limit } => {
            let rows = client
                .profiles()
                .search(query, *limit)
                .await
                .context("profile search failed")?;
            print_json(&rows)?;
        }

        ProfileCommand::Update {
            credentials,
            first_name,
            last_name,
            bio,
            avatar_url,
            private,
            interests,
        } => {
            let user = credentials.sign_in(&client).await?;
            let update = ProfileUpdate {
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                bio: bio.clone(),
                avatar_url: avatar_url.clone(),
                is_private: *private,
                interests: interests.clone(),
                ..Default::default()
            };
            let result = client.profiles().update(user.id, &update).await;
            sign_out(&client).await;
            print_json(&result.context("profile update failed")?)?;
        }
    }
    Ok(0)
}

/// Execute `circle username`.
pub async fn run_username(args: &UsernameArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;

    match &args.command {
        UsernameCommand::Check { username } => {
            let availability = client.profiles().check_username_availability(username).await;
            println!("{username}: {availability}");
            Ok(exit_code_for(availability))
        }
    }
}

fn exit_code_for(availability: UsernameAvailability) -> u8 {
    match availability {
        UsernameAvailability::Available => 0,
        UsernameAvailability::Taken => 1,
        UsernameAvailability::Unknown => 2,
    }
}
