//! # circle CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use circle_cli::account::{run_login, run_signup, LoginArgs, SignupArgs};
use circle_cli::follow::{run_follow, run_list, run_unfollow, Direction, EdgeArgs, ListArgs};
use circle_cli::health::run_health;
use circle_cli::profile::{run_profile, run_username, ProfileArgs, UsernameArgs};
use circle_cli::watch::{run_watch, WatchArgs};
use circle_cli::ConnectionArgs;

/// Circle: accounts, profiles and the follow graph from the terminal.
#[derive(Parser, Debug)]
#[command(name = "circle", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account with the interactive wizard.
    Signup(SignupArgs),

    /// Sign in with email and password.
    Login(LoginArgs),

    /// Read, search, or update profiles.
    Profile(ProfileArgs),

    /// Username availability.
    Username(UsernameArgs),

    /// Follow a user as the signed-in account.
    Follow(EdgeArgs),

    /// Stop following a user.
    Unfollow(EdgeArgs),

    /// List a user's followers, newest first.
    Followers(ListArgs),

    /// List the users someone follows, newest first.
    Following(ListArgs),

    /// Stream live row changes.
    Watch(WatchArgs),

    /// Check that the backend is reachable.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(url = %cli.connection.url, "circle CLI starting");

    let conn = &cli.connection;
    let result = match &cli.command {
        Commands::Signup(args) => run_signup(args, conn).await,
        Commands::Login(args) => run_login(args, conn).await,
        Commands::Profile(args) => run_profile(args, conn).await,
        Commands::Username(args) => run_username(args, conn).await,
        Commands::Follow(args) => run_follow(args, conn).await,
        Commands::Unfollow(args) => run_unfollow(args, conn).await,
        Commands::Followers(args) => run_list(args, Direction::Followers, conn).await,
        Commands::Following(args) => run_list(args, Direction::Following, conn).await,
        Commands::Watch(args) => run_watch(args, conn).await,
        Commands::Health => run_health(conn).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
