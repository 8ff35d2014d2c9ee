//! Command implementations for the board CLI

pub mod bootstrap;
pub mod config;
pub mod describe;
pub mod rows;
pub mod serve;
pub mod watch;

use crate::output::{OutputFormat, OutputFormatter};
use anyhow::{Context, Result};
use leaderboard_core::{
    Config, DataSource, FileDataSource, HttpDataSource, SortKey, SortOrder,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub config: Config,
    pub file: Option<PathBuf>,
    pub output: OutputFormat,
}

impl CommandContext {
    pub fn new(config: Config, file: Option<PathBuf>, output: OutputFormat) -> Self {
        Self {
            config,
            file,
            output,
        }
    }

    /// Where leaderboard data comes from: a saved snapshot when `--file` was
    /// given, the configured endpoint otherwise
    pub fn source(&self) -> Result<Arc<dyn DataSource>> {
        match &self.file {
            Some(path) => Ok(Arc::new(FileDataSource::new(path))),
            None => {
                let source = HttpDataSource::new(
                    &self.config.source.endpoint_url,
                    self.config.request_timeout(),
                )
                .context("Failed to create leaderboard client")?;
                Ok(Arc::new(source))
            }
        }
    }

    pub fn formatter(&self) -> OutputFormatter {
        OutputFormatter::new(self.output).with_stderr(self.config.display.show_stderr)
    }

    /// Sort column and direction from flags, falling back to configuration
    pub fn sort(&self, sort: Option<&str>, ascending: bool) -> Result<(SortKey, SortOrder)> {
        let key = match sort {
            Some(text) => text.parse::<SortKey>().map_err(anyhow::Error::msg)?,
            None => self.config.sort_key()?,
        };
        let order = if ascending {
            SortOrder::Ascending
        } else {
            self.config.sort_order()
        };
        Ok((key, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::Task;

    #[test]
    fn test_sort_resolution() {
        let ctx = CommandContext::new(Config::default(), None, OutputFormat::Table);

        let (key, order) = ctx.sort(None, false).unwrap();
        assert_eq!(key, SortKey::Task(Task::Average));
        assert_eq!(order, SortOrder::Descending);

        let (key, order) = ctx.sort(Some("error_rate"), true).unwrap();
        assert_eq!(key, SortKey::ErrorRate);
        assert_eq!(order, SortOrder::Ascending);

        assert!(ctx.sort(Some("popularity"), false).is_err());
    }

    #[test]
    fn test_source_selection() {
        let ctx = CommandContext::new(
            Config::default(),
            Some(PathBuf::from("snapshot.json")),
            OutputFormat::Json,
        );
        assert_eq!(ctx.source().unwrap().describe(), "snapshot.json");

        let ctx = CommandContext::new(Config::default(), None, OutputFormat::Json);
        assert_eq!(
            ctx.source().unwrap().describe(),
            "http://localhost:8000/leaderboard"
        );
    }
}
