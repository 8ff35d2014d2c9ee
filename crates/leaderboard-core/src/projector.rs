//! Row projection: reshape a leaderboard snapshot into flat display rows
//!
//! [`project`] is a pure function of a [`RawDataset`] and the filter text typed
//! by the user. Scores are scaled to percent but kept exact; rounding to two
//! decimals is left to whoever renders the rows.

use crate::types::{DisplayRow, NodeId, RawDataset, RawNodeRecord, ScaledMetric, Task};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Round to two decimals for display
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parsed node allow-list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeFilter {
    /// No filter text: every node in the dataset
    #[default]
    All,
    /// Exactly these node addresses, when present
    Only(BTreeSet<NodeId>),
}

impl NodeFilter {
    /// Parse comma-separated filter text.
    ///
    /// All whitespace is stripped before splitting, so `" a , b "` equals
    /// `"a,b"`. Empty tokens are dropped; text made only of commas selects
    /// nothing.
    pub fn parse(text: &str) -> Self {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return NodeFilter::All;
        }

        NodeFilter::Only(
            compact
                .split(',')
                .filter(|token| !token.is_empty())
                .map(NodeId::from)
                .collect(),
        )
    }

    /// Check whether a node passes the filter
    pub fn matches(&self, node: &NodeId) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Only(nodes) => nodes.contains(node),
        }
    }
}

/// Project a dataset into display rows using raw filter text
pub fn project(raw: &RawDataset, filter_text: &str) -> Vec<DisplayRow> {
    project_with(raw, &NodeFilter::parse(filter_text))
}

/// Project a dataset into display rows using a parsed filter.
///
/// Requested nodes missing from the dataset are skipped without a placeholder.
/// Rows come out in node address order.
pub fn project_with(raw: &RawDataset, filter: &NodeFilter) -> Vec<DisplayRow> {
    match filter {
        NodeFilter::All => raw
            .iter()
            .map(|(node, record)| project_record(node, record))
            .collect(),
        NodeFilter::Only(nodes) => nodes
            .iter()
            .filter_map(|node| raw.get(node).map(|record| project_record(node, record)))
            .collect(),
    }
}

fn project_record(node: &NodeId, record: &RawNodeRecord) -> DisplayRow {
    let mut row = DisplayRow::new(node.clone());

    for (task, sample) in &record.metrics {
        row.scores.insert(*task, ScaledMetric::from_sample(sample));
    }

    if let Some(qos) = &record.qos {
        row.response_time = Some(qos.response_time);
        row.error_rate = Some(qos.error_rate);
    }

    row
}

/// Column to order rows by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Node,
    Task(Task),
    ResponseTime,
    ErrorRate,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Task(Task::Average)
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "node" => Ok(SortKey::Node),
            "response_time" | "response-time" | "latency" => Ok(SortKey::ResponseTime),
            "error_rate" | "error-rate" => Ok(SortKey::ErrorRate),
            other => other
                .parse::<Task>()
                .map(SortKey::Task)
                .map_err(|_| format!("Unknown sort key: {}", s)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Node => f.write_str("node"),
            SortKey::Task(task) => f.write_str(task.as_str()),
            SortKey::ResponseTime => f.write_str("response_time"),
            SortKey::ErrorRate => f.write_str("error_rate"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

fn sort_value(row: &DisplayRow, key: SortKey) -> Option<f64> {
    match key {
        SortKey::Node => None,
        SortKey::Task(task) => row.score(task).map(|score| score.value),
        SortKey::ResponseTime => row.response_time,
        SortKey::ErrorRate => row.error_rate,
    }
}

/// Order rows for display. Rows missing the sort value always go last; ties
/// fall back to node address.
pub fn sort_rows(rows: &mut [DisplayRow], key: SortKey, order: SortOrder) {
    let directed = |ordering: Ordering| match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    };

    rows.sort_by(|a, b| {
        if key == SortKey::Node {
            return directed(a.node.cmp(&b.node));
        }

        let primary = match (sort_value(a, key), sort_value(b, key)) {
            (Some(x), Some(y)) => directed(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        primary.then_with(|| a.node.cmp(&b.node))
    });
}
