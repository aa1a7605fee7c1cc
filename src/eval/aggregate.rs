//! Folds per-conversation step stats into per-agent precision/recall.

use std::collections::BTreeMap;

use crate::{
    eval::{
        matching::round2,
        report::{AgentMetrics, AggregateReport, EvaluationResult, MetricValue},
    },
    types::{ConfusionCounts, StepStats},
};

/// Sums confusion counts per agent. Order of the input does not matter.
pub fn aggregate_stats<'a>(
    tables: impl IntoIterator<Item = &'a StepStats>,
) -> BTreeMap<String, ConfusionCounts> {
    let mut totals: BTreeMap<String, ConfusionCounts> = BTreeMap::new();
    for table in tables {
        for (agent, counts) in table {
            *totals.entry(agent.clone()).or_default() += *counts;
        }
    }
    totals
}

pub fn aggregate<'a>(results: impl IntoIterator<Item = &'a EvaluationResult>) -> AggregateReport {
    let totals = aggregate_stats(results.into_iter().map(|result| &result.step_stats));
    let agents = totals
        .into_iter()
        .map(|(agent, counts)| (agent, agent_metrics(counts)))
        .collect();
    AggregateReport { agents }
}

/// [`aggregate`], flattened to `"{agent}_{metric}"` keys.
pub fn aggregate_flat<'a>(
    results: impl IntoIterator<Item = &'a EvaluationResult>,
) -> BTreeMap<String, MetricValue> {
    aggregate(results).flatten()
}

pub fn agent_metrics(counts: ConfusionCounts) -> AgentMetrics {
    let ConfusionCounts { tp, fp, fn_ } = counts;
    let untouched = counts.total() == 0;
    AgentMetrics {
        precision: ratio(tp, tp + fp, untouched),
        recall: ratio(tp, tp + fn_, untouched),
        tp,
        fp,
        fn_,
        support: counts.support(),
    }
}

fn ratio(numerator: u64, denominator: u64, untouched: bool) -> f64 {
    if denominator > 0 {
        round2(numerator as f64 / denominator as f64)
    } else if untouched {
        1.0
    } else {
        0.0
    }
}
