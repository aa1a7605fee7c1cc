pub mod error;
pub mod types;
pub mod eval;

pub use error::EvalError;
pub use types::{ConfusionCounts, Step, StepStats};
pub use eval::{
    aggregate,
    aggregate_flat,
    evaluate,
    AgentMetrics,
    AggregateReport,
    BatchSummary,
    EmptyRoutePolicy,
    EvalCase,
    EvalRunner,
    EvaluationResult,
    EvaluatorConfig,
    RoutingAccuracyEvaluator,
};
