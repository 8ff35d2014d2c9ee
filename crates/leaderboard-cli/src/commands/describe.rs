//! Single-node detail view

use super::CommandContext;
use crate::output::{format_latency, format_percentage, format_score, Formattable};
use anyhow::Result;
use leaderboard_core::{project_with, DisplayRow, Error, NodeFilter, NodeId, NodeMetadata, RawDataset};
use serde::Serialize;

/// Scores plus the metadata the endpoint reports for a node
#[derive(Debug, Serialize)]
pub struct NodeDetail {
    #[serde(flatten)]
    pub row: DisplayRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
}

impl NodeDetail {
    /// Look up `node` in a dataset
    pub fn from_dataset(dataset: &RawDataset, node: &str) -> leaderboard_core::Result<Self> {
        let id = NodeId::new(node.trim());
        let record = dataset
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("node {} is not on the leaderboard", id)))?;

        let filter = NodeFilter::Only([id].into_iter().collect());
        let row = project_with(dataset, &filter)
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("node {} is not on the leaderboard", node)))?;

        Ok(Self {
            row,
            metadata: record.metadata.clone(),
        })
    }
}

impl Formattable for NodeDetail {
    fn key_value_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("Node".to_string(), self.row.node.to_string())];
        for (task, score) in &self.row.scores {
            pairs.push((task.header().to_string(), format_score(score, true)));
        }
        if let Some(ms) = self.row.response_time {
            pairs.push(("Resp. time".to_string(), format_latency(ms)));
        }
        if let Some(rate) = self.row.error_rate {
            pairs.push(("Error rate".to_string(), format_percentage(rate)));
        }
        if let Some(metadata) = &self.metadata {
            if let Some(service) = &metadata.service {
                pairs.push(("Service".to_string(), service.clone()));
            }
            if let Some(height) = metadata.last_seen_height {
                pairs.push(("Last seen height".to_string(), height.to_string()));
            }
            if let Some(time) = &metadata.last_seen_time {
                pairs.push(("Last seen".to_string(), time.clone()));
            }
        }
        pairs
    }
}

/// Fetch once and show one node in detail
pub async fn describe_node(ctx: &CommandContext, node: &str) -> Result<()> {
    let formatter = ctx.formatter();
    let source = ctx.source()?;

    formatter.print_progress(&format!("Fetching leaderboard from {}", source.describe()));
    let dataset = source.fetch().await;
    formatter.clear_progress();

    let detail = NodeDetail::from_dataset(&dataset?, node)?;
    formatter.print_item(&detail)
}
