//! `board serve`: run the refresh scheduler behind the dashboard server

use super::CommandContext;
use crate::server::{self, AppState};
use anyhow::{Context, Result};
use leaderboard_core::{RefreshScheduler, Theme, ThemeState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

pub async fn serve(
    ctx: &CommandContext,
    bind: Option<String>,
    interval_ms: Option<u64>,
    theme: Theme,
) -> Result<()> {
    let addr: SocketAddr = match bind {
        Some(bind) => bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", bind))?,
        None => ctx.config.bind_addr()?,
    };
    let period = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.refresh_interval());

    let refresh = RefreshScheduler::new(ctx.source()?, period)
        .context("Invalid refresh interval")?
        .with_refetch_on_reconnect(ctx.config.refresh.refetch_on_reconnect)
        .spawn();

    let state = AppState {
        refresh: refresh.clone(),
        theme: ThemeState::new(theme),
        display: ctx.config.display.clone(),
        period,
        refetch_on_reconnect: ctx.config.refresh.refetch_on_reconnect,
    };

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    server::run(listener, state, shutdown_signal())
        .await
        .context("Dashboard server failed")?;

    info!("Shutting down");
    refresh.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
