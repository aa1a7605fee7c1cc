//! Routing accuracy evaluation: route matching, per-agent aggregation and
//! batch runs over datasets of recorded conversations.

pub mod aggregate;
pub mod dataset;
pub mod evaluator;
pub mod matching;
pub mod report;
pub mod runner;

pub use aggregate::{aggregate, aggregate_flat, aggregate_stats};
pub use dataset::{load_cases, EvalCase};
pub use evaluator::{EvaluatorConfig, RoutingAccuracyEvaluator};
pub use matching::{count_matches, evaluate, evaluate_with, EmptyRoutePolicy};
pub use report::{
    AgentMetrics, AggregateReport, BatchSummary, CaseRecord, EvaluationResult, MetricValue,
    RunReport,
};
pub use runner::EvalRunner;
