//! Continuously refreshing terminal view
//!
//! Lines typed on stdin replace the filter. `:retry` fetches immediately and
//! `:quit` exits. With `--output json|yaml` one document is written per new
//! dataset or filter, and one error document per failed refresh.

use super::CommandContext;
use crate::output::{colorize_status, format_duration, OutputFormatter};
use anyhow::{Context, Result};
use chrono::Utc;
use leaderboard_core::{
    sort_rows, FetchOutcome, FetchPhase, RefreshScheduler, RefreshSnapshot, SortKey, SortOrder,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// What a line typed on stdin asks for
#[derive(Debug, PartialEq, Eq)]
pub enum WatchInput {
    Filter(String),
    Retry,
    Quit,
}

impl WatchInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            ":r" | ":retry" => WatchInput::Retry,
            ":q" | ":quit" => WatchInput::Quit,
            _ => WatchInput::Filter(line.to_string()),
        }
    }
}

/// Something structured output has not reported yet
#[derive(Debug, PartialEq, Eq)]
enum Update {
    Rows,
    Failed(String),
}

/// What structured output has already reported
#[derive(Debug, Default)]
struct Reported {
    generation: u64,
    filter: Option<String>,
    failed_attempt: u64,
}

impl Reported {
    /// The update `snapshot` carries that was not reported before, if any.
    /// Snapshots taken mid-fetch or for connectivity changes carry none.
    fn next(&mut self, snapshot: &RefreshSnapshot) -> Option<Update> {
        if snapshot.phase != FetchPhase::Idle {
            return None;
        }

        if snapshot.last_outcome == Some(FetchOutcome::Failed)
            && snapshot.attempts != self.failed_attempt
        {
            self.failed_attempt = snapshot.attempts;
            let message = snapshot
                .error
                .clone()
                .unwrap_or_else(|| "refresh failed".to_string());
            return Some(Update::Failed(message));
        }

        let filter_changed = self.filter.as_deref() != Some(snapshot.filter.as_str());
        if snapshot.is_loaded() && (snapshot.generation != self.generation || filter_changed) {
            self.generation = snapshot.generation;
            self.filter = Some(snapshot.filter.clone());
            return Some(Update::Rows);
        }

        None
    }
}

/// Run the refresh loop until `:quit`, Ctrl-C, or the scheduler stops
pub async fn watch(
    ctx: &CommandContext,
    filter: String,
    sort: Option<String>,
    ascending: bool,
    interval_ms: Option<u64>,
) -> Result<()> {
    let formatter = ctx.formatter();
    let (key, order) = ctx.sort(sort.as_deref(), ascending)?;
    let period = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.refresh_interval());

    let handle = RefreshScheduler::new(ctx.source()?, period)
        .context("Invalid refresh interval")?
        .with_filter(filter)
        .with_refetch_on_reconnect(ctx.config.refresh.refetch_on_reconnect)
        .spawn();
    let mut snapshots = handle.subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut reported = Reported::default();

    let initial = snapshots.borrow_and_update().clone();
    render(&formatter, &initial, key, order, period, &mut reported)?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&formatter, &snapshot, key, order, period, &mut reported)?;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match WatchInput::parse(&line) {
                    WatchInput::Quit => break,
                    WatchInput::Retry => handle.retry(),
                    WatchInput::Filter(text) => handle.set_filter(text),
                },
                None => {
                    debug!("stdin closed, filter is now fixed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown();
    Ok(())
}

fn render(
    formatter: &OutputFormatter,
    snapshot: &RefreshSnapshot,
    key: SortKey,
    order: SortOrder,
    period: Duration,
    reported: &mut Reported,
) -> Result<()> {
    if !formatter.format().is_interactive() {
        match reported.next(snapshot) {
            Some(Update::Rows) => {
                let mut rows = snapshot.rows.as_ref().clone();
                sort_rows(&mut rows, key, order);
                formatter.print_rows(&rows)?;
            }
            Some(Update::Failed(message)) => formatter.print_error(&message)?,
            None => {}
        }
        return Ok(());
    }

    formatter.clear_screen();
    println!("{}", status_line(snapshot, period));

    if let Some(error) = &snapshot.error {
        let message = if snapshot.is_loaded() {
            format!("Refresh failed, showing previous data: {}", error)
        } else {
            format!("Could not load the leaderboard: {}", error)
        };
        formatter.print_warning(&message)?;
        println!("Type :retry to try again");
    }

    if !snapshot.is_loaded() {
        if snapshot.error.is_none() {
            println!("Loading leaderboard...");
        }
        return Ok(());
    }

    let mut rows = snapshot.rows.as_ref().clone();
    sort_rows(&mut rows, key, order);
    formatter.print_rows(&rows)?;
    println!("Filter: '{}' (type node addresses, :retry, :quit)", snapshot.filter);
    Ok(())
}

fn status_line(snapshot: &RefreshSnapshot, period: Duration) -> String {
    let state = match (snapshot.phase, snapshot.is_error()) {
        (FetchPhase::Fetching, _) => "fetching",
        (FetchPhase::Idle, true) => "stale",
        (FetchPhase::Idle, false) if snapshot.is_loaded() => "ok",
        _ => "loading",
    };
    let updated = snapshot
        .last_success
        .map(|at| {
            let age = (Utc::now() - at).num_seconds().max(0) as u64;
            format!("updated {} ago", format_duration(age))
        })
        .unwrap_or_else(|| "never updated".to_string());

    format!(
        "Leaderboard [{}] {} nodes, {} shown, {}, refresh every {}",
        colorize_status(state),
        snapshot.node_count(),
        snapshot.rows.len(),
        updated,
        format_duration(period.as_secs().max(1))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::scheduler::RefreshState;
    use leaderboard_core::{Error, RawDataset, RawNodeRecord, Task};

    #[test]
    fn test_watch_input() {
        assert_eq!(WatchInput::parse(":retry"), WatchInput::Retry);
        assert_eq!(WatchInput::parse(" :q "), WatchInput::Quit);
        assert_eq!(
            WatchInput::parse("node1, node2"),
            WatchInput::Filter("node1, node2".to_string())
        );
        assert_eq!(WatchInput::parse(""), WatchInput::Filter(String::new()));
    }

    fn loaded_state() -> RefreshState {
        let mut state = RefreshState::new(None, "");
        state.begin_fetch();
        let mut raw = RawDataset::new();
        raw.insert("node1", RawNodeRecord::new().with_metric(Task::Average, 0.5, 0.01));
        raw.insert("node2", RawNodeRecord::new().with_metric(Task::Average, 0.6, 0.01));
        state.complete_fetch(Ok(raw));
        state
    }

    #[test]
    fn test_structured_updates_follow_datasets_and_failures() {
        let mut reported = Reported::default();

        let mut state = RefreshState::new(None, "");
        assert_eq!(reported.next(&state.snapshot()), None);

        // Failing before any data reports the failure only
        state.begin_fetch();
        assert_eq!(reported.next(&state.snapshot()), None);
        state.complete_fetch(Err(Error::parse("expected value at line 1 column 1")));
        let failed = state.snapshot();
        match reported.next(&failed) {
            Some(Update::Failed(message)) => assert!(message.contains("line 1 column 1")),
            other => panic!("expected a failure, got {:?}", other),
        }
        assert_eq!(reported.next(&failed), None);

        let mut state = loaded_state();
        let mut reported = Reported::default();
        assert_eq!(reported.next(&state.snapshot()), Some(Update::Rows));
        assert_eq!(reported.next(&state.snapshot()), None);

        // A failed refresh keeps the old rows but is not a new dataset
        state.begin_fetch();
        state.complete_fetch(Err(Error::fetch("connection refused")));
        assert!(matches!(reported.next(&state.snapshot()), Some(Update::Failed(_))));

        // Connectivity changes republish the same data
        state.set_online(false);
        assert_eq!(reported.next(&state.snapshot()), None);

        // Each further failure is reported once
        state.begin_fetch();
        state.complete_fetch(Err(Error::fetch("connection refused")));
        assert!(matches!(reported.next(&state.snapshot()), Some(Update::Failed(_))));
        assert_eq!(reported.next(&state.snapshot()), None);

        state.set_filter("node1");
        assert_eq!(reported.next(&state.snapshot()), Some(Update::Rows));

        state.begin_fetch();
        state.complete_fetch(Ok(RawDataset::new()));
        assert_eq!(reported.next(&state.snapshot()), Some(Update::Rows));
    }

    #[test]
    fn test_status_line() {
        colored::control::set_override(false);
        let period = Duration::from_secs(60);

        let mut state = RefreshState::new(None, "");
        assert!(status_line(&state.snapshot(), period).contains("[loading]"));

        state.begin_fetch();
        let mut raw = RawDataset::new();
        raw.insert("node1", RawNodeRecord::new().with_metric(Task::Average, 0.5, 0.01));
        raw.insert("node2", RawNodeRecord::new().with_metric(Task::Average, 0.6, 0.01));
        state.complete_fetch(Ok(raw));
        state.set_filter("node2");

        let line = status_line(&state.snapshot(), period);
        assert!(line.contains("[ok]"));
        assert!(line.contains("2 nodes, 1 shown"));
        assert!(line.contains("refresh every 1m 0s"));

        state.begin_fetch();
        state.complete_fetch(Err(Error::fetch("timeout")));
        assert!(status_line(&state.snapshot(), period).contains("[stale]"));
    }
}
