use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{eval::matching::round2, types::StepStats};

/// Scores for one route compared against its reference route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub ordered_match: u8,
    pub unordered_match: u8,
    pub superset_match: u8,
    pub subset_match: u8,
    pub precision: f64,
    pub recall: f64,
    pub unordered_match_dedup: u8,
    pub superset_match_dedup: u8,
    pub subset_match_dedup: u8,
    pub precision_dedup: f64,
    pub recall_dedup: f64,
    pub step_stats: StepStats,
    pub route_evaluated: Vec<String>,
    pub reference_route_evaluated: Vec<String>,
}

/// Per-agent totals across a batch of evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub precision: f64,
    pub recall: f64,
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub support: u64,
}

/// A single value in the flattened aggregate mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Ratio(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Count(count) => count as f64,
            MetricValue::Ratio(ratio) => ratio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub agents: BTreeMap<String, AgentMetrics>,
}

impl AggregateReport {
    pub fn get(&self, agent: &str) -> Option<&AgentMetrics> {
        self.agents.get(agent)
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Flattens into `"{agent}_{metric}"` keys, the shape dashboards consume.
    pub fn flatten(&self) -> BTreeMap<String, MetricValue> {
        let mut flat = BTreeMap::new();
        for (agent, metrics) in &self.agents {
            let entries = [
                ("precision", MetricValue::Ratio(metrics.precision)),
                ("recall", MetricValue::Ratio(metrics.recall)),
                ("tp", MetricValue::Count(metrics.tp)),
                ("fp", MetricValue::Count(metrics.fp)),
                ("fn", MetricValue::Count(metrics.fn_)),
                ("support", MetricValue::Count(metrics.support)),
            ];
            for (metric, value) in entries {
                flat.insert(format!("{agent}_{metric}"), value);
            }
        }
        flat
    }
}

/// Batch-level match rates and mean scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub ordered_match_rate: f64,
    pub unordered_match_rate: f64,
    pub unordered_match_dedup_rate: f64,
    pub superset_match_rate: f64,
    pub subset_match_rate: f64,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_precision_dedup: f64,
    pub mean_recall_dedup: f64,
}

impl BatchSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a EvaluationResult>) -> Self {
        let mut total = 0usize;
        let mut sums = [0.0f64; 9];

        for result in results {
            total += 1;
            let values = [
                f64::from(result.ordered_match),
                f64::from(result.unordered_match),
                f64::from(result.unordered_match_dedup),
                f64::from(result.superset_match),
                f64::from(result.subset_match),
                result.precision,
                result.recall,
                result.precision_dedup,
                result.recall_dedup,
            ];
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += value;
            }
        }

        if total == 0 {
            return Self::default();
        }

        let mean = |i: usize| round2(sums[i] / total as f64);
        Self {
            total,
            ordered_match_rate: mean(0),
            unordered_match_rate: mean(1),
            unordered_match_dedup_rate: mean(2),
            superset_match_rate: mean(3),
            subset_match_rate: mean(4),
            mean_precision: mean(5),
            mean_recall: mean(6),
            mean_precision_dedup: mean(7),
            mean_recall_dedup: mean(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub result: EvaluationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub cases: Vec<CaseRecord>,
    pub summary: BatchSummary,
    pub aggregate: AggregateReport,
}
