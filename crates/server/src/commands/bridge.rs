//! Handler for the `bridge` command.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::runtime::Runtime;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use zkmcp_state::{load_gate, load_snapshot};

use super::{approvals_path, build_bridge, print_json};
use crate::bridge::{Bridge, ReconcileReport};
use crate::config::Settings;
use crate::feed::parse_feed_line;
use crate::registry::InMemoryToolRegistry;

/// What a bridge session did.
#[derive(Debug, Default, Serialize)]
pub(crate) struct BridgeSummary {
    /// Provider events applied.
    pub events: usize,
    /// Feed lines that could not be parsed.
    pub bad_lines: usize,
    /// Final reconcile pass.
    pub reconcile: ReconcileReport,
    /// Tools visible when the session ended.
    pub tools: Vec<String>,
}

/// Handle the `bridge` command.
pub(crate) fn handle_bridge_command(settings: &Settings) -> Result<()> {
    let (bridge, registry) = build_bridge(settings)?;
    let approvals = approvals_path(settings)?;
    let bridge = bridge.with_gate(load_gate(&approvals)?);
    info!(
        target: "zkmcp::bridge",
        approvals = %approvals.display(),
        interval_secs = settings.reconcile_interval.as_secs(),
        "bridge started; reading provider events from stdin"
    );

    let rt = Runtime::new()?;
    let summary = rt.block_on(run_bridge(
        &bridge,
        &registry,
        &approvals,
        settings.reconcile_interval,
        tokio::io::stdin(),
    ))?;
    print_json(&summary)
}

/// Applies feed lines until the input closes or the process is interrupted,
/// reloading approvals and reconciling on every tick.
pub(crate) async fn run_bridge<R>(
    bridge: &Bridge,
    registry: &InMemoryToolRegistry,
    approvals: &Path,
    interval: Duration,
    input: R,
) -> Result<BridgeSummary>
where
    R: AsyncRead + Unpin,
{
    let mut summary = BridgeSummary::default();
    let mut lines = BufReader::new(input).lines();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => match parse_feed_line(&line) {
                    Ok(Some(event)) => {
                        bridge.handle_event(&event);
                        summary.events += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(target: "zkmcp::feed", error = %e, "skipping feed line");
                        summary.bad_lines += 1;
                    }
                },
                None => {
                    info!(target: "zkmcp::bridge", "provider feed closed");
                    break;
                }
            },
            _ = ticker.tick() => refresh(bridge, approvals),
            _ = tokio::signal::ctrl_c() => {
                info!(target: "zkmcp::bridge", "interrupted");
                break;
            }
        }
    }

    summary.reconcile = bridge.reconcile();
    summary.tools = registry
        .list_tools()
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();
    Ok(summary)
}

fn refresh(bridge: &Bridge, approvals: &Path) {
    match load_snapshot(approvals) {
        Ok(snapshot) => {
            bridge.reload_approvals(snapshot);
        }
        Err(e) => {
            warn!(
                target: "zkmcp::bridge",
                error = %e,
                "approvals unreadable; keeping current decisions"
            );
            bridge.reconcile();
        }
    }
}
