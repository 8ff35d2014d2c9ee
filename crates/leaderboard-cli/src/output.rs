//! Output formatting for the board CLI

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use leaderboard_core::{round2, DisplayRow, ScaledMetric, Task};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Compact text format
    Text,
}

impl OutputFormat {
    /// Whether output is meant for a person watching a terminal
    pub fn is_interactive(&self) -> bool {
        matches!(self, OutputFormat::Table | OutputFormat::Text)
    }
}

/// Types that can be shown as a detailed key/value listing
pub trait Formattable {
    fn key_value_pairs(&self) -> Vec<(String, String)>;
}

impl Formattable for DisplayRow {
    fn key_value_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("Node".to_string(), self.node.to_string())];
        for task in Task::ALL {
            if let Some(score) = self.score(task) {
                pairs.push((task.header().to_string(), format_score(score, true)));
            }
        }
        if let Some(ms) = self.response_time {
            pairs.push(("Resp. time".to_string(), format_latency(ms)));
        }
        if let Some(rate) = self.error_rate {
            pairs.push(("Error rate".to_string(), format_percentage(rate)));
        }
        pairs
    }
}

/// Output formatter
pub struct OutputFormatter {
    format: OutputFormat,
    show_stderr: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            show_stderr: false,
        }
    }

    /// Show `mean ± stderr` in table cells
    pub fn with_stderr(mut self, show_stderr: bool) -> Self {
        self.show_stderr = show_stderr;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format and print a single item
    pub fn print_item<T>(&self, item: &T) -> Result<()>
    where
        T: Serialize + Formattable,
    {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(item)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(item)?);
            }
            OutputFormat::Table => {
                for (key, value) in item.key_value_pairs() {
                    println!("{}: {}", key.bold().cyan(), value);
                }
            }
            OutputFormat::Text => {
                for (key, value) in item.key_value_pairs() {
                    println!("{}: {}", key, value);
                }
            }
        }
        Ok(())
    }

    /// Format and print leaderboard rows
    pub fn print_rows(&self, rows: &[DisplayRow]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(rows)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(rows)?);
            }
            OutputFormat::Table if rows.is_empty() => {
                println!("{}", "No nodes match the current filter".dimmed());
            }
            OutputFormat::Table => {
                println!("{}", self.render_table(rows));
            }
            OutputFormat::Text => {
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    for (key, value) in row.key_value_pairs() {
                        println!("{}: {}", key, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Build the leaderboard table. Resp. time and Error rate columns appear
    /// only when some row carries QoS figures.
    pub fn render_table(&self, rows: &[DisplayRow]) -> Table {
        let show_qos = rows.iter().any(DisplayRow::has_qos);

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let mut headers = vec!["Node".to_string()];
        headers.extend(Task::ALL.iter().map(|t| t.header().to_string()));
        if show_qos {
            headers.push("Resp. time".to_string());
            headers.push("Error rate".to_string());
        }
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );

        for row in rows {
            let mut cells = vec![Cell::new(row.node.as_str())];
            for task in Task::ALL {
                let text = row
                    .score(task)
                    .map(|score| format_score(score, self.show_stderr))
                    .unwrap_or_else(|| "-".to_string());
                cells.push(Cell::new(text).set_alignment(CellAlignment::Right));
            }
            if show_qos {
                let latency = row.response_time.map(format_latency).unwrap_or_else(|| "-".to_string());
                let errors = row.error_rate.map(format_percentage).unwrap_or_else(|| "-".to_string());
                cells.push(Cell::new(latency).set_alignment(CellAlignment::Right));
                cells.push(Cell::new(errors).set_alignment(CellAlignment::Right));
            }
            table.add_row(cells);
        }

        table
    }

    /// Print a success message
    pub fn print_success(&self, message: &str) -> Result<()> {
        self.print_status("success", message, || {
            println!("{} {}", "✓".green().bold(), message.green())
        })
    }

    /// Print an error message
    pub fn print_error(&self, message: &str) -> Result<()> {
        self.print_status("error", message, || {
            eprintln!("{} {}", "✗".red().bold(), message.red())
        })
    }

    /// Print a warning message
    pub fn print_warning(&self, message: &str) -> Result<()> {
        self.print_status("warning", message, || {
            eprintln!("{} {}", "⚠".yellow().bold(), message.yellow())
        })
    }

    /// Print an info message
    pub fn print_info(&self, message: &str) -> Result<()> {
        self.print_status("info", message, || {
            println!("{} {}", "ℹ".blue().bold(), message.blue())
        })
    }

    fn print_status(&self, status: &str, message: &str, interactive: impl FnOnce()) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let result = serde_json::json!({
                    "status": status,
                    "message": message
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            OutputFormat::Yaml => {
                println!("status: {}", status);
                println!("message: {}", message);
            }
            OutputFormat::Table | OutputFormat::Text => interactive(),
        }
        Ok(())
    }

    /// Print a progress message (only for interactive formats)
    pub fn print_progress(&self, message: &str) {
        if self.format.is_interactive() {
            eprint!("{} {}...\r", "⏳".yellow(), message);
        }
    }

    /// Clear progress message (only for interactive formats)
    pub fn clear_progress(&self) {
        if self.format.is_interactive() {
            eprint!("\r{}\r", " ".repeat(80));
        }
    }

    /// Clear the terminal before a redraw
    pub fn clear_screen(&self) {
        if self.format.is_interactive() {
            print!("\x1B[2J\x1B[1;1H");
        }
    }
}

/// `82.3` or `82.3 ± 1.2`. The stderr is shown whenever it is non-zero
/// before rounding, so a tiny one reads `± 0`.
pub fn format_score(score: &ScaledMetric, show_stderr: bool) -> String {
    if show_stderr && score.stderr != 0.0 {
        format!("{} ± {}", score.display_value(), score.display_stderr())
    } else {
        score.display_value().to_string()
    }
}

/// Response time in milliseconds
pub fn format_latency(ms: f64) -> String {
    format!("{} ms", round2(ms))
}

/// Helper function to format percentage
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Helper function to format duration
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        format!("{}d {}h", days, hours)
    }
}

/// Helper function to colorize refresh status
pub fn colorize_status(status: &str) -> ColoredString {
    match status.to_lowercase().as_str() {
        "ok" | "idle" | "succeeded" | "online" => status.green(),
        "failed" | "error" | "offline" => status.red(),
        "fetching" | "loading" | "stale" => status.yellow(),
        _ => status.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::{project, RawDataset, RawNodeRecord};

    fn rows() -> Vec<DisplayRow> {
        let mut raw = RawDataset::new();
        raw.insert(
            "node1",
            RawNodeRecord::new()
                .with_metric(Task::Average, 0.823, 0.012)
                .with_metric(Task::Mmlu, 0.7, 0.0)
                .with_qos(300.0, 0.01),
        );
        raw.insert("node2", RawNodeRecord::new().with_metric(Task::Average, 0.5, 0.02));
        project(&raw, "")
    }

    #[test]
    fn test_output_format_enum() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
        assert!(OutputFormat::Text.is_interactive());
        assert!(!OutputFormat::Json.is_interactive());
    }

    #[test]
    fn test_format_score() {
        let score = ScaledMetric {
            value: 82.3,
            stderr: 1.2,
        };
        assert_eq!(format_score(&score, true), "82.3 ± 1.2");
        assert_eq!(format_score(&score, false), "82.3");

        let exact = ScaledMetric {
            value: 70.0,
            stderr: 0.0,
        };
        assert_eq!(format_score(&exact, true), "70");

        let tiny = ScaledMetric {
            value: 50.0,
            stderr: 0.001,
        };
        assert_eq!(format_score(&tiny, true), "50 ± 0");
    }

    #[test]
    fn test_table_columns() {
        let formatter = OutputFormatter::new(OutputFormat::Table).with_stderr(true);
        let rendered = formatter.render_table(&rows()).to_string();

        assert!(rendered.contains("Average"));
        assert!(rendered.contains("GSM8K"));
        assert!(rendered.contains("Resp. time"));
        assert!(rendered.contains("82.3 ± 1.2"));
        assert!(rendered.contains("300 ms"));
        assert!(rendered.contains("1.0%"));

        // No QoS anywhere, no QoS columns
        let without_qos: Vec<DisplayRow> = rows().into_iter().filter(|r| !r.has_qos()).collect();
        let rendered = formatter.render_table(&without_qos).to_string();
        assert!(!rendered.contains("Resp. time"));
        assert!(rendered.contains("50 ± 2"));
    }

    #[test]
    fn test_row_key_value_pairs() {
        let pairs = rows()[0].key_value_pairs();
        assert_eq!(pairs[0], ("Node".to_string(), "node1".to_string()));
        assert!(pairs.contains(&("Average".to_string(), "82.3 ± 1.2".to_string())));
        assert!(pairs.contains(&("MMLU".to_string(), "70".to_string())));
        assert!(pairs.contains(&("Error rate".to_string(), "1.0%".to_string())));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m");
        assert_eq!(format_duration(90061), "1d 1h");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.0), "0.0%");
        assert_eq!(format_percentage(0.123), "12.3%");
    }

    #[test]
    fn test_colorize_status() {
        assert!(!colorize_status("idle").to_string().is_empty());
        assert!(!colorize_status("failed").to_string().is_empty());
        assert!(!colorize_status("whatever").to_string().is_empty());
    }
}
