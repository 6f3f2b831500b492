//! # Watch Subcommand
//!
//! Streams row changes from the realtime surface as JSON lines until
//! Ctrl-C or until `--count` events have been printed. If the realtime
//! socket cannot be restored the stream ends early and the command fails.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use tokio::sync::mpsc;

use circle_client::realtime::protocol::ChangeEvent;
use circle_core::UserId;

use crate::ConnectionArgs;

/// Arguments for `circle watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(subcommand)]
    pub command: WatchCommand,

    /// Stop after this many events.
    #[arg(long, global = true)]
    pub count: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum WatchCommand {
    /// Changes to one user's profile row.
    Profile { user: UserId },
    /// Follow edges created or removed on either side of a user.
    Follows { user: UserId },
}

/// Execute `circle watch`.
pub async fn run_watch(args: &WatchArgs, conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;
    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let forward = move |event: ChangeEvent| {
        let _ = tx.send(event);
    };

    let realtime = client.realtime();
    let subscription = match args.command {
        WatchCommand::Profile { user } => realtime.subscribe_to_profile(user, forward).await,
        WatchCommand::Follows { user } => realtime.subscribe_to_follows(user, forward).await,
    }
    .context("failed to open change stream")?;
    tracing::info!(topic = subscription.topic(), "watching for changes");

    let printed = tokio::select! {
        n = print_events(&mut rx, args.count) => Some(n?),
        _ = tokio::signal::ctrl_c() => None,
    };
    tracing::debug!(?printed, "watch finished");

    subscription.unsubscribe().await;
    client.realtime().shutdown().await;

    if let Some(printed) = printed {
        if below_limit(printed, args.count) {
            bail!("change stream ended after {printed} event(s): realtime connection lost");
        }
    }
    Ok(0)
}

/// Whether fewer than `limit` events have been printed.
fn below_limit(printed: usize, limit: Option<usize>) -> bool {
    limit.map_or(true, |limit| printed < limit)
}

/// Print events as JSON lines. Returns how many were printed.
async fn print_events(rx: &mut mpsc::UnboundedReceiver<ChangeEvent>, limit: Option<usize>) -> Result<usize> {
    let mut printed = 0;
    while below_limit(printed, limit) {
        let Some(event) = rx.recv().await else {
            break;
        };
        println!("{}", serde_json::to_string(&event)?);
        printed += 1;
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use circle_client::realtime::protocol::ChangeKind;

    fn event(kind: ChangeKind) -> ChangeEvent {
        ChangeEvent {
            table: "follows".into(),
            kind,
            record: None,
            old_record: None,
            commit_timestamp: None,
        }
    }

    #[tokio::test]
    async fn print_events_stops_at_limit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for kind in [ChangeKind::Insert, ChangeKind::Delete, ChangeKind::Insert] {
            tx.send(event(kind)).unwrap();
        }
        assert_eq!(print_events(&mut rx, Some(2)).await.unwrap(), 2);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn below_limit_respects_optional_limit() {
        assert!(below_limit(1, Some(2)));
        assert!(below_limit(4, None));
        assert!(!below_limit(2, Some(2)));
    }

    #[tokio::test]
    async fn print_events_ends_when_stream_closes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(event(ChangeKind::Update)).unwrap();
        drop(tx);
        assert_eq!(print_events(&mut rx, None).await.unwrap(), 1);
    }
}
