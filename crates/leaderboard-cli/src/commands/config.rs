//! Configuration management commands
//!
//! These run against the configuration as loaded, before validation, so that
//! a broken setup can still be shown and diagnosed.

use super::CommandContext;
use crate::output::{OutputFormat, OutputFormatter};
use crate::ConfigCommands;
use anyhow::Result;
use leaderboard_core::Config;
use std::path::Path;

/// Handle config commands. Returns false when `validate` found a problem.
pub fn handle_config_command(
    ctx: &CommandContext,
    action: ConfigCommands,
    path: Option<&Path>,
) -> Result<bool> {
    let formatter = OutputFormatter::new(ctx.output);

    match action {
        ConfigCommands::Show => match ctx.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ctx.config)?),
            _ => print!("{}", serde_yaml::to_string(&ctx.config)?),
        },
        ConfigCommands::Validate => match validation_report(&ctx.config, path) {
            Ok(message) => formatter.print_success(&message)?,
            Err(message) => {
                formatter.print_error(&message)?;
                return Ok(false);
            }
        },
        ConfigCommands::Paths => {
            for location in Config::default_locations() {
                let marker = if location.exists() { "found" } else { "missing" };
                formatter.print_info(&format!("{} ({})", location.display(), marker))?;
            }
        }
    }

    Ok(true)
}

fn validation_report(config: &Config, path: Option<&Path>) -> std::result::Result<String, String> {
    config.validate().map_err(|e| e.to_string())?;
    let origin = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults, files and environment".to_string());
    Ok(format!("Configuration is valid ({})", origin))
}
