//! `board bootstrap`: emit the database bootstrap for the evaluation pipeline

use super::CommandContext;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use leaderboard_core::schema::ReplicaSetSpec;
use leaderboard_core::BootstrapPlan;

/// Assemble the plan from configuration and flags
pub fn build_plan(
    ctx: &CommandContext,
    database: Option<String>,
    no_replica_set: bool,
    no_user: bool,
) -> BootstrapPlan {
    let db = &ctx.config.database;
    let mut plan = BootstrapPlan::testbench(database.unwrap_or_else(|| db.name.clone()));

    if !no_replica_set {
        if let Some(id) = &db.replica_set {
            plan = plan.with_replica_set(ReplicaSetSpec::single(id.clone(), db.replica_host.clone()));
        }
    }
    if no_user {
        plan = plan.without_app_user();
    }
    plan
}

/// Print the mongosh script, or the plan itself with `--plan`
pub fn print_bootstrap(
    ctx: &CommandContext,
    database: Option<String>,
    no_replica_set: bool,
    no_user: bool,
    show_plan: bool,
) -> Result<()> {
    let plan = build_plan(ctx, database, no_replica_set, no_user);
    plan.validate().context("Invalid bootstrap plan")?;

    if show_plan {
        match ctx.output {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&plan)?),
            _ => println!("{}", serde_json::to_string_pretty(&plan)?),
        }
        return Ok(());
    }

    print!("{}", plan.render_mongosh()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::Config;

    fn ctx() -> CommandContext {
        CommandContext::new(Config::default(), None, OutputFormat::Table)
    }

    #[test]
    fn test_plan_from_config() {
        let plan = build_plan(&ctx(), None, false, false);
        assert_eq!(plan.database, "pocket-ml-testbench");
        assert_eq!(plan.replica_set.as_ref().unwrap().id, "devRs");
        assert_eq!(plan.replica_set.as_ref().unwrap().members, vec!["mongodb:27017"]);
        assert!(plan.app_user.is_some());
    }

    #[test]
    fn test_plan_flags() {
        let plan = build_plan(&ctx(), Some("bench-staging".to_string()), true, true);
        assert_eq!(plan.database, "bench-staging");
        assert!(plan.replica_set.is_none());
        assert!(plan.app_user.is_none());
        assert!(plan.render_mongosh().unwrap().contains("getSiblingDB(\"bench-staging\")"));
    }
}
