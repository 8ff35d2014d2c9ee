//! One-shot leaderboard listing

use super::CommandContext;
use anyhow::Result;
use leaderboard_core::{project, sort_rows};
use tracing::debug;

/// Fetch once, project with `filter` and print the rows
pub async fn show_rows(
    ctx: &CommandContext,
    filter: &str,
    sort: Option<String>,
    ascending: bool,
) -> Result<()> {
    let formatter = ctx.formatter();
    let (key, order) = ctx.sort(sort.as_deref(), ascending)?;
    let source = ctx.source()?;

    formatter.print_progress(&format!("Fetching leaderboard from {}", source.describe()));
    let fetched = source.fetch().await;
    formatter.clear_progress();

    let dataset = match fetched {
        Ok(dataset) => dataset,
        Err(e) => {
            formatter.print_error(&format!("Could not load the leaderboard: {}", e))?;
            return Err(e.into());
        }
    };

    let mut rows = project(&dataset, filter);
    debug!(
        "Projected {} of {} nodes with filter '{}'",
        rows.len(),
        dataset.len(),
        filter
    );
    sort_rows(&mut rows, key, order);

    formatter.print_rows(&rows)
}
