//! # Signup and Login Subcommands
//!
//! Both commands drive [`SignupFlow`] from line-based terminal input.
//! Typing `:back` on any prompt retreats one step (or leaves the wizard
//! from the first step). End of input aborts.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use circle_client::AuthUser;
use circle_core::UsernameAvailability;
use circle_signup::{
    Advance, AuthMode, FormField, SequencerConfig, SignupBackend, SignupError, SignupFlow,
    SignupStep, UsernameStatus,
};

use crate::{sign_out, ConnectionArgs};

/// Input that retreats one step.
pub const BACK: &str = ":back";

/// Arguments for `circle signup`.
#[derive(Args, Debug)]
pub struct SignupArgs {
    /// Settling delay before the username availability check, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub debounce_ms: u64,
}

/// Arguments for `circle login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email. Prompted for when omitted.
    #[arg(long)]
    pub email: Option<String>,
}

/// Execute `circle signup`.
pub async fn run_signup(args: &SignupArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;
    let session = client.auth().watch();
    let config = SequencerConfig {
        username_debounce: std::time::Duration::from_millis(args.debounce_ms),
    };
    let mut flow = SignupFlow::new(Arc::new(client), session, config);

    let mut input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    match run_signup_wizard(&mut flow, &mut input, &mut out).await? {
        Some(user) => {
            println!("OK: account created for {}", user.email.as_deref().unwrap_or("new user"));
            Ok(0)
        }
        None => {
            println!("signup cancelled");
            Ok(1)
        }
    }
}

/// Execute `circle login`.
pub async fn run_login(args: &LoginArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = Arc::new(conn.client()?);
    let session = client.auth().watch();
    let backend: Arc<dyn SignupBackend> = client.clone();
    let mut flow = SignupFlow::new(backend, session, SequencerConfig::default());

    let mut input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    match run_login_prompt(&mut flow, args.email.as_deref(), &mut input, &mut out).await? {
        Some(user) => {
            println!("OK: signed in as {}", user.id);
            sign_out(&client).await;
            Ok(0)
        }
        None => Ok(1),
    }
}

/// Walk the signup wizard to completion.
///
/// Returns the created user, or `None` if the user backed out or input ended.
pub async fn run_signup_wizard<R, W>(
    flow: &mut SignupFlow,
    input: &mut R,
    out: &mut W,
) -> Result<Option<AuthUser>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    flow.set_mode(AuthMode::Signup);

    loop {
        let step = flow.step();
        writeln!(out, "[{}/{}] {step}", step.number(), SignupStep::STEP_COUNT)?;

        let mut back = false;
        if step == SignupStep::Interests {
            let Some(line) = prompt(input, out, "interests (comma-separated)").await? else {
                return Ok(None);
            };
            if line == BACK {
                back = true;
            } else {
                select_interests(flow, &line);
            }
        } else {
            for (field, label) in fields_for(step) {
                let Some(line) = prompt(input, out, label).await? else {
                    return Ok(None);
                };
                if line == BACK {
                    back = true;
                    break;
                }
                flow.update_field(*field, line);
            }
            if step == SignupStep::Username && !back {
                let status = flow.username_settled().await;
                writeln!(out, "  {}", describe_username(status))?;
            }
        }

        if back {
            flow.retreat();
            if flow.mode() == AuthMode::Welcome {
                return Ok(None);
            }
            continue;
        }

        match flow.advance().await {
            Ok(Advance::Moved(_)) => {}
            Ok(Advance::AccountCreated(user)) => return Ok(Some(user)),
            Err(SignupError::Incomplete { source, .. }) => writeln!(out, "  {source}")?,
            Err(e) => {
                let alert = flow.take_alert().unwrap_or_else(|| e.to_string());
                writeln!(out, "  error: {alert}")?;
            }
        }
    }
}

/// Prompt for credentials and sign in.
///
/// Returns the signed-in user as reported by the session watch, or `None`
/// if input ended.
pub async fn run_login_prompt<R, W>(
    flow: &mut SignupFlow,
    email: Option<&str>,
    input: &mut R,
    out: &mut W,
) -> Result<Option<AuthUser>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    flow.set_mode(AuthMode::Login);

    let email = match email {
        Some(email) => email.to_string(),
        None => match prompt(input, out, "email").await? {
            Some(line) => line,
            None => return Ok(None),
        },
    };
    let Some(password) = prompt(input, out, "password").await? else {
        return Ok(None);
    };
    flow.update_field(FormField::Email, email);
    flow.update_field(FormField::Password, password);

    if let Err(e) = flow.submit_login().await {
        let alert = flow.take_alert().unwrap_or_else(|| e.to_string());
        bail!("login failed: {alert}");
    }
    Ok(flow.authenticated().await)
}

fn fields_for(step: SignupStep) -> &'static [(FormField, &'static str)] {
    match step {
        SignupStep::Email => &[(FormField::Email, "email")],
        SignupStep::Password => &[(FormField::Password, "password (8+ characters)")],
        SignupStep::ConfirmPassword => &[(FormField::ConfirmPassword, "confirm password")],
        SignupStep::Name => &[
            (FormField::FirstName, "first name"),
            (FormField::LastName, "last name"),
        ],
        SignupStep::Gender => &[(FormField::Gender, "gender")],
        SignupStep::Age => &[(FormField::Age, "age")],
        SignupStep::Country => &[(FormField::Country, "country")],
        SignupStep::Username => &[(FormField::Username, "username")],
        SignupStep::Interests => &[],
    }
}

/// Make the selected interests exactly the comma-separated tags in `line`.
fn select_interests(flow: &mut SignupFlow, line: &str) {
    let wanted: BTreeSet<&str> = line
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect();
    let current: Vec<String> = flow.form().interests.iter().cloned().collect();

    for tag in &current {
        if !wanted.contains(tag.as_str()) {
            flow.toggle_interest(tag);
        }
    }
    for tag in wanted {
        if !flow.form().interests.contains(tag) {
            flow.toggle_interest(tag);
        }
    }
}

fn describe_username(status: UsernameStatus) -> &'static str {
    match status {
        UsernameStatus::Idle => "username too short",
        UsernameStatus::Checking => "checking availability...",
        UsernameStatus::Resolved(UsernameAvailability::Available) => "username is available",
        UsernameStatus::Resolved(UsernameAvailability::Taken) => "username is taken",
        UsernameStatus::Resolved(UsernameAvailability::Unknown) => {
            "could not check availability, try again"
        }
    }
}

async fn prompt<R, W>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{label}: ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
