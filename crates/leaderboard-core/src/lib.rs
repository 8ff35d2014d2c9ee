//! # leaderboard-core
//!
//! Core types and services for the LLM benchmark leaderboard - a dashboard over
//! per-node benchmark results published by the evaluation pipeline.
//!
//! This crate provides:
//!
//! - The leaderboard data model (raw per-node records and flat display rows)
//! - The row projector that reshapes and filters a dataset for display
//! - Data sources for the leaderboard endpoint (HTTP, saved snapshots)
//! - The refresh scheduler that polls a source and keeps rows current
//! - The theme preference container shared by presentation surfaces
//! - The declarative database bootstrap plan for the evaluation pipeline
//! - Configuration schema and error handling

pub mod config;
pub mod error;
pub mod projector;
pub mod scheduler;
pub mod schema;
pub mod source;
pub mod theme;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use projector::{project, project_with, round2, sort_rows, NodeFilter, SortKey, SortOrder};
pub use scheduler::{FetchOutcome, FetchPhase, RefreshHandle, RefreshScheduler, RefreshSnapshot};
pub use schema::BootstrapPlan;
pub use source::{DataSource, FileDataSource, HttpDataSource};
pub use theme::{Theme, ThemeState};
pub use types::{
    DisplayRow, MetricSample, NodeId, NodeMetadata, Qos, RawDataset, RawNodeRecord, ScaledMetric,
    Task,
};
