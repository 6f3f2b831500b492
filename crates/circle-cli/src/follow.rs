//! # Follow-Graph Subcommands
//!
//! - `follow <id>` / `unfollow <id>`: act as the signed-in user.
//! - `followers <id>` / `following <id>`: public listings, newest first.

use anyhow::{Context, Result};
use clap::Args;

use circle_client::follows::DEFAULT_LIST_LIMIT;
use circle_client::ApiError;
use circle_core::UserId;

use crate::{print_json, sign_out, ConnectionArgs, Credentials};

/// Arguments for `circle follow` and `circle unfollow`.
#[derive(Args, Debug)]
pub struct EdgeArgs {
    /// The user to follow or unfollow.
    pub target: UserId,
    #[command(flatten)]
    pub credentials: Credentials,
}

/// Arguments for `circle followers` and `circle following`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Whose edges to list.
    pub user: UserId,
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: u32,
}

/// Which side of the edge a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Followers,
    Following,
}

/// Execute `circle follow`.
pub async fn run_follow(args: &EdgeArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;
    let me = args.credentials.sign_in(&client).await?;

    let result = client.follows().follow(args.target).await;
    sign_out(&client).await;

    match result {
        Ok(edge) => {
            println!("OK: {} now follows {}", me.id, edge.following_id);
            Ok(0)
        }
        Err(ApiError::Conflict { .. }) => {
            println!("already following {}", args.target);
            Ok(1)
        }
        Err(e) => Err(e).context("follow failed"),
    }
}

/// Execute `circle unfollow`.
pub async fn run_unfollow(args: &EdgeArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;
    args.credentials.sign_in(&client).await?;

    let result = client.follows().unfollow(args.target).await;
    sign_out(&client).await;

    match result {
        Ok(()) => {
            println!("OK: unfollowed {}", args.target);
            Ok(0)
        }
        Err(ApiError::NotFound { .. }) => {
            println!("not following {}", args.target);
            Ok(1)
        }
        Err(e) => Err(e).context("unfollow failed"),
    }
}

/// Execute `circle followers` / `circle following`.
pub async fn run_list(args: &ListArgs, direction: Direction, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;
    let follows = client.follows();

    let rows = match direction {
        Direction::Followers => follows.followers(args.user, args.limit).await,
        Direction::Following => follows.following(args.user, args.limit).await,
    }
    .with_context(|| format!("failed to list {direction:?} of {}", args.user))?;

    print_json(&rows)?;
    Ok(0)
}
