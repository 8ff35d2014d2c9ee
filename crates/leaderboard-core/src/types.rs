//! Core type definitions for the leaderboard

use crate::projector::round2;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Network address identifying an inference node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new NodeId from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of the NodeId
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Benchmark tasks reported by the leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Weighted aggregate over the other tasks
    Average,
    Arc,
    Hellaswag,
    Mmlu,
    Truthfulqa,
    Winogrande,
    Gsm8k,
}

impl Task {
    /// All tasks in display column order
    pub const ALL: [Task; 7] = [
        Task::Average,
        Task::Arc,
        Task::Hellaswag,
        Task::Mmlu,
        Task::Truthfulqa,
        Task::Winogrande,
        Task::Gsm8k,
    ];

    /// Wire name of the task
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Average => "average",
            Task::Arc => "arc",
            Task::Hellaswag => "hellaswag",
            Task::Mmlu => "mmlu",
            Task::Truthfulqa => "truthfulqa",
            Task::Winogrande => "winogrande",
            Task::Gsm8k => "gsm8k",
        }
    }

    /// Name of the flattened stderr field for this task
    pub fn stderr_field(&self) -> &'static str {
        match self {
            Task::Average => "average_stderr",
            Task::Arc => "arc_stderr",
            Task::Hellaswag => "hellaswag_stderr",
            Task::Mmlu => "mmlu_stderr",
            Task::Truthfulqa => "truthfulqa_stderr",
            Task::Winogrande => "winogrande_stderr",
            Task::Gsm8k => "gsm8k_stderr",
        }
    }

    /// Column header used by presentation surfaces
    pub fn header(&self) -> &'static str {
        match self {
            Task::Average => "Average",
            Task::Arc => "ARC",
            Task::Hellaswag => "HellaSwag",
            Task::Mmlu => "MMLU",
            Task::Truthfulqa => "TruthfulQA",
            Task::Winogrande => "Winogrande",
            Task::Gsm8k => "GSM8K",
        }
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "average" | "avg" => Ok(Task::Average),
            "arc" => Ok(Task::Arc),
            "hellaswag" => Ok(Task::Hellaswag),
            "mmlu" => Ok(Task::Mmlu),
            "truthfulqa" => Ok(Task::Truthfulqa),
            "winogrande" => Ok(Task::Winogrande),
            "gsm8k" => Ok(Task::Gsm8k),
            _ => Err(format!("Unknown task: {}", s)),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A benchmark estimate and its standard error, both in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub mean: f64,
    pub stderr: f64,
}

impl MetricSample {
    pub fn new(mean: f64, stderr: f64) -> Self {
        Self { mean, stderr }
    }
}

/// Quality-of-service figures attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Qos {
    /// Response time in milliseconds
    pub response_time: f64,
    /// Error rate in [0, 1]
    pub error_rate: f64,
}

/// Node bookkeeping published alongside the scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetadata {
    /// Service the node was evaluated for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Last block height the node was seen at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_height: Option<u64>,
    /// Last time the node was seen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_time: Option<String>,
}

/// Benchmark record for a single node
///
/// Accepts both the flat wire shape (`{"average": {...}, ...}`) and the nested
/// one (`{"metrics": {...}, "qos": {...}, "metadata": {...}}`). Unknown keys are
/// ignored and `null` task values count as absent. Always serializes nested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawNodeRecord {
    pub metrics: BTreeMap<Task, MetricSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos: Option<Qos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
}

impl RawNodeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style task insertion
    pub fn with_metric(mut self, task: Task, mean: f64, stderr: f64) -> Self {
        self.metrics.insert(task, MetricSample::new(mean, stderr));
        self
    }

    /// Builder-style QoS attachment
    pub fn with_qos(mut self, response_time: f64, error_rate: f64) -> Self {
        self.qos = Some(Qos {
            response_time,
            error_rate,
        });
        self
    }

    /// Get the sample for a task
    pub fn metric(&self, task: Task) -> Option<&MetricSample> {
        self.metrics.get(&task)
    }
}

impl<'de> Deserialize<'de> for RawNodeRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut object = serde_json::Map::<String, Value>::deserialize(deserializer)?;

        let qos = match object.remove("qos") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Qos>(value)
                    .map_err(|e| de::Error::custom(format!("invalid `qos`: {}", e)))?,
            ),
        };

        let metadata = match object.remove("metadata") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<NodeMetadata>(value)
                    .map_err(|e| de::Error::custom(format!("invalid `metadata`: {}", e)))?,
            ),
        };

        let source = match object.remove("metrics") {
            Some(Value::Object(nested)) => nested,
            Some(Value::Null) => serde_json::Map::new(),
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "invalid `metrics`: expected an object, found {}",
                    other
                )))
            }
            None => object,
        };

        let mut metrics = BTreeMap::new();
        for (key, value) in source {
            let Ok(task) = key.parse::<Task>() else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let sample = serde_json::from_value::<MetricSample>(value)
                .map_err(|e| de::Error::custom(format!("invalid `{}` sample: {}", key, e)))?;
            metrics.insert(task, sample);
        }

        Ok(Self {
            metrics,
            qos,
            metadata,
        })
    }
}

/// Snapshot of the leaderboard: node address to benchmark record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDataset(BTreeMap<NodeId, RawNodeRecord>);

impl RawDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node record
    pub fn insert(&mut self, node: impl Into<NodeId>, record: RawNodeRecord) {
        self.0.insert(node.into(), record);
    }

    /// Look up a node record
    pub fn get(&self, node: &NodeId) -> Option<&RawNodeRecord> {
        self.0.get(node)
    }

    /// Check whether a node is present
    pub fn contains(&self, node: &NodeId) -> bool {
        self.0.contains_key(node)
    }

    /// Number of nodes in the snapshot
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over nodes in address order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &RawNodeRecord)> {
        self.0.iter()
    }

    /// Node addresses in address order
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }
}

impl FromIterator<(NodeId, RawNodeRecord)> for RawDataset {
    fn from_iter<I: IntoIterator<Item = (NodeId, RawNodeRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A task score scaled to percent, kept exact until rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledMetric {
    /// mean * 100
    pub value: f64,
    /// stderr * 100
    pub stderr: f64,
}

impl ScaledMetric {
    pub fn from_sample(sample: &MetricSample) -> Self {
        Self {
            value: sample.mean * 100.0,
            stderr: sample.stderr * 100.0,
        }
    }

    /// Value rounded to two decimals
    pub fn display_value(&self) -> f64 {
        round2(self.value)
    }

    /// Standard error rounded to two decimals
    pub fn display_stderr(&self) -> f64 {
        round2(self.stderr)
    }
}

/// One table row per node, derived from a [`RawDataset`]
///
/// Serializes flat: `node`, `<task>`, `<task>_stderr`, `response_time`,
/// `error_rate`, with absent fields omitted and scores rounded to two decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub node: NodeId,
    pub scores: BTreeMap<Task, ScaledMetric>,
    pub response_time: Option<f64>,
    pub error_rate: Option<f64>,
}

impl DisplayRow {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            scores: BTreeMap::new(),
            response_time: None,
            error_rate: None,
        }
    }

    /// Scaled score for a task, if the node reported it
    pub fn score(&self, task: Task) -> Option<&ScaledMetric> {
        self.scores.get(&task)
    }

    /// Whether QoS figures are attached
    pub fn has_qos(&self) -> bool {
        self.response_time.is_some() || self.error_rate.is_some()
    }
}

impl Serialize for DisplayRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("node", &self.node)?;
        for task in Task::ALL {
            if let Some(score) = self.scores.get(&task) {
                map.serialize_entry(task.as_str(), &score.display_value())?;
                map.serialize_entry(task.stderr_field(), &score.display_stderr())?;
            }
        }
        if let Some(response_time) = self.response_time {
            map.serialize_entry("response_time", &response_time)?;
        }
        if let Some(error_rate) = self.error_rate {
            map.serialize_entry("error_rate", &error_rate)?;
        }
        map.end()
    }
}
