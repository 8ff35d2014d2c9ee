//! board - terminal and web dashboard for the LLM benchmark leaderboard

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leaderboard_core::config::ObservabilityConfig;
use leaderboard_core::{Config, Theme};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod server;

use commands::CommandContext;
use output::OutputFormat;

/// Terminal and web dashboard for the LLM benchmark leaderboard
#[derive(Debug, Parser)]
#[command(name = "board")]
#[command(about = "Terminal and web dashboard for the LLM benchmark leaderboard")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Leaderboard endpoint (overrides configuration)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Read a saved leaderboard snapshot instead of the endpoint
    #[arg(long, value_name = "FILE", conflicts_with = "endpoint")]
    file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON output (overrides --output)
    #[arg(long)]
    json: bool,

    /// Timeout for requests in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Show standard errors next to scores
    #[arg(long)]
    stderr: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch the leaderboard once and print it
    #[command(name = "rows")]
    Rows {
        /// Comma-separated node addresses to show (all when empty)
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Column to sort by (node, a task name, response_time, error_rate)
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort ascending instead of the configured order
        #[arg(long)]
        asc: bool,
    },

    /// Show everything known about one node
    #[command(name = "describe")]
    Describe {
        /// Node address
        node: String,
    },

    /// Keep the table on screen and refresh it periodically
    #[command(name = "watch")]
    Watch {
        /// Initial filter; type a new one on stdin at any time
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Column to sort by
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort ascending
        #[arg(long)]
        asc: bool,

        /// Refresh interval in milliseconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Serve the dashboard page and JSON API
    #[command(name = "serve")]
    Serve {
        /// Listen address
        #[arg(short, long)]
        bind: Option<String>,

        /// Refresh interval in milliseconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Initial UI theme
        #[arg(long, default_value = "light")]
        theme: Theme,
    },

    /// Print the database bootstrap script for the evaluation pipeline
    #[command(name = "bootstrap")]
    Bootstrap {
        /// Database name (overrides configuration)
        #[arg(short, long)]
        database: Option<String>,

        /// Skip replica set initiation
        #[arg(long)]
        no_replica_set: bool,

        /// Skip application user creation
        #[arg(long)]
        no_user: bool,

        /// Print the plan instead of the mongosh script
        #[arg(long)]
        plan: bool,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Check the configuration and report problems
    Validate,

    /// List the files consulted when no --config is given
    Paths,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.source.endpoint_url = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.source.request_timeout_secs = timeout;
        }
        if self.stderr {
            config.display.show_stderr = true;
        }
        if self.verbose {
            config.observability.log_level = "debug".to_string();
        }
    }

    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.output
        }
    }
}

fn init_logging(observability: &ObservabilityConfig) {
    let level = observability.log_level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "board={level},leaderboard_core={level},tower_http={level}"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if observability.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config` subcommands report on invalid settings themselves
    let inspecting = matches!(cli.command, Commands::Config { .. });
    let mut config = if inspecting {
        Config::load_unvalidated(cli.config.as_deref())
    } else {
        Config::load(cli.config.as_deref())
    }
    .context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    if !inspecting {
        config.validate().context("Invalid configuration")?;
    }

    init_logging(&config.observability);
    debug!("Starting board CLI with {:?}", cli);

    let ctx = CommandContext::new(config, cli.file.clone(), cli.output_format());

    match cli.command {
        Commands::Rows { filter, sort, asc } => {
            commands::rows::show_rows(&ctx, &filter, sort, asc).await?;
        }

        Commands::Describe { node } => {
            commands::describe::describe_node(&ctx, &node).await?;
        }

        Commands::Watch {
            filter,
            sort,
            asc,
            interval,
        } => {
            commands::watch::watch(&ctx, filter, sort, asc, interval).await?;
        }

        Commands::Serve {
            bind,
            interval,
            theme,
        } => {
            commands::serve::serve(&ctx, bind, interval, theme).await?;
        }

        Commands::Bootstrap {
            database,
            no_replica_set,
            no_user,
            plan,
        } => {
            commands::bootstrap::print_bootstrap(&ctx, database, no_replica_set, no_user, plan)?;
        }

        Commands::Config { action } => {
            if !commands::config::handle_config_command(&ctx, action, cli.config.as_deref())? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["board", "rows"]).unwrap();
        assert!(matches!(cli.command, Commands::Rows { .. }));

        let cli = Cli::try_parse_from(["board", "rows", "--filter", "node1,node2", "--sort", "mmlu"])
            .unwrap();
        match cli.command {
            Commands::Rows { filter, sort, asc } => {
                assert_eq!(filter, "node1,node2");
                assert_eq!(sort.as_deref(), Some("mmlu"));
                assert!(!asc);
            }
            _ => panic!("expected rows"),
        }

        let cli = Cli::try_parse_from(["board", "serve", "--theme", "dark"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { theme: Theme::Dark, .. }));

        let cli = Cli::try_parse_from(["board", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Validate
            }
        ));
    }

    #[test]
    fn test_output_format() {
        let cli = Cli::try_parse_from(["board", "--json", "rows"]).unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Json);

        let cli = Cli::try_parse_from(["board", "--output", "yaml", "rows"]).unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Yaml);
    }

    #[test]
    fn test_endpoint_and_file_conflict() {
        let result = Cli::try_parse_from([
            "board",
            "--endpoint",
            "http://localhost:8000",
            "--file",
            "snapshot.json",
            "rows",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "board",
            "--endpoint",
            "https://bench.example.com/leaderboard",
            "--timeout",
            "5",
            "--stderr",
            "-v",
            "rows",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.source.endpoint_url, "https://bench.example.com/leaderboard");
        assert_eq!(config.source.request_timeout_secs, 5);
        assert!(config.display.show_stderr);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.validate().is_ok());
    }
}
