//! `circle health`: probe the REST and auth surfaces.

use anyhow::Result;

use crate::ConnectionArgs;

/// Execute `circle health`. Exits 1 if any surface is unreachable.
pub async fn run_health(conn: &ConnectionArgs) -> Result<u8> {
    let client = conn.client()?;
    let result = client.health_check().await;

    for name in &result.reachable {
        println!("{name}: ok");
    }
    for (name, reason) in &result.unreachable {
        println!("{name}: unreachable ({reason})");
    }
    Ok(if result.all_healthy() { 0 } else { 1 })
}
