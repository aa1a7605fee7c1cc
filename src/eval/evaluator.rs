use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::EvalError,
    eval::{
        aggregate::aggregate,
        matching::{evaluate_with, EmptyRoutePolicy},
        report::{AggregateReport, EvaluationResult},
    },
    types::Step,
};

pub const DEFAULT_STEP_TYPE: &str = "agent";

fn default_step_types() -> Vec<String> {
    vec![DEFAULT_STEP_TYPE.to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Step types kept when projecting a route to names.
    #[serde(default = "default_step_types")]
    pub step_types_to_evaluate: Vec<String>,
    #[serde(default)]
    pub empty_route_policy: EmptyRoutePolicy,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            step_types_to_evaluate: default_step_types(),
            empty_route_policy: EmptyRoutePolicy::default(),
        }
    }
}

impl EvaluatorConfig {
    pub fn with_step_types<I, S>(mut self, step_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step_types_to_evaluate = step_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_empty_route_policy(mut self, policy: EmptyRoutePolicy) -> Self {
        self.empty_route_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        if self.step_types_to_evaluate.is_empty() {
            return Err(EvalError::EmptyStepTypes);
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, EvalError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a config from `.json`, or YAML for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EvalError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let config = if ext == "json" {
            serde_json::from_slice(&bytes)?
        } else {
            serde_yaml::from_slice(&bytes)?
        };
        Ok(config)
    }
}

/// Filters raw routes down to the configured step types and scores them.
#[derive(Debug, Clone, Default)]
pub struct RoutingAccuracyEvaluator {
    config: EvaluatorConfig,
}

impl RoutingAccuracyEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, EvalError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_step_types<I, S>(step_types: I) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(EvaluatorConfig::default().with_step_types(step_types))
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Names of the steps whose type is evaluated, in route order.
    pub fn evaluated_names(&self, route: &[Step]) -> Vec<String> {
        route
            .iter()
            .filter(|step| self.config.step_types_to_evaluate.contains(&step.kind))
            .map(|step| step.name.clone())
            .collect()
    }

    pub fn score(&self, route: &[Step], reference_route: &[Step]) -> EvaluationResult {
        let route = self.evaluated_names(route);
        let reference_route = self.evaluated_names(reference_route);

        tracing::debug!(?route, ?reference_route, "evaluating route");

        evaluate_with(
            route.as_slice(),
            reference_route.as_slice(),
            self.config.empty_route_policy,
        )
    }

    pub fn aggregate<'a>(
        &self,
        results: impl IntoIterator<Item = &'a EvaluationResult>,
    ) -> AggregateReport {
        aggregate(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(steps: &[(&str, &str)]) -> Vec<Step> {
        steps.iter().map(|(name, kind)| Step::new(*name, *kind)).collect()
    }

    #[test]
    fn empty_step_types_are_rejected() {
        let err = RoutingAccuracyEvaluator::with_step_types(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, EvalError::EmptyStepTypes));
    }

    #[test]
    fn default_config_evaluates_agents_only() {
        let evaluator = RoutingAccuracyEvaluator::default();
        let actual = route(&[("A", "agent"), ("B", "agent"), ("E", "topic"), ("A", "agent")]);
        let reference = route(&[("A", "agent"), ("B", "agent"), ("C", "agent"), ("D", "agent")]);

        let result = evaluator.score(&actual, &reference);

        assert_eq!(result.route_evaluated, vec!["A", "B", "A"]);
        assert_eq!(result.reference_route_evaluated, vec!["A", "B", "C", "D"]);
        assert_eq!(result.ordered_match, 0);
        assert_eq!(result.superset_match, 0);
        assert_eq!(result.precision, 0.67);
        assert_eq!(result.recall, 0.5);
        assert!(!result.step_stats.contains_key("E"));
    }

    #[test]
    fn configured_step_types_widen_the_filter() {
        let evaluator = RoutingAccuracyEvaluator::with_step_types(["agent", "topic"]).unwrap();
        let actual = route(&[("A", "agent"), ("E", "topic")]);
        let reference = route(&[("A", "agent"), ("E", "topic")]);

        let result = evaluator.score(&actual, &reference);

        assert_eq!(result.ordered_match, 1);
        assert_eq!(result.route_evaluated, vec!["A", "E"]);
    }

    #[test]
    fn scoring_is_idempotent() {
        let evaluator = RoutingAccuracyEvaluator::default();
        let actual = route(&[("A", "agent"), ("A", "agent"), ("B", "agent")]);
        let reference = route(&[("B", "agent"), ("C", "agent")]);
        assert_eq!(
            evaluator.score(&actual, &reference),
            evaluator.score(&actual, &reference)
        );
    }

    #[test]
    fn unified_policy_flows_through_config() {
        let config = EvaluatorConfig::default().with_empty_route_policy(EmptyRoutePolicy::Unified);
        let evaluator = RoutingAccuracyEvaluator::new(config).unwrap();
        let only_topics = route(&[("E", "topic")]);

        let result = evaluator.score(&only_topics, &[]);

        assert_eq!(result.precision, 1.0);
        assert_eq!(result.recall, 1.0);
        assert_eq!(result.precision_dedup, 1.0);
    }

    #[test]
    fn config_loads_from_yaml_with_defaults() {
        let config = EvaluatorConfig::from_yaml_str("empty_route_policy: unified\n").unwrap();
        assert_eq!(config.step_types_to_evaluate, vec!["agent"]);
        assert_eq!(config.empty_route_policy, EmptyRoutePolicy::Unified);

        let config = EvaluatorConfig::from_yaml_str("step_types_to_evaluate: []\n").unwrap();
        assert!(matches!(config.validate(), Err(EvalError::EmptyStepTypes)));
    }

    #[test]
    fn misspelled_config_key_is_rejected() {
        let err = EvaluatorConfig::from_yaml_str("step_type_to_evaluate: [topic]\n").unwrap_err();
        assert!(matches!(err, EvalError::Yaml(_)));
        assert!(err.to_string().contains("step_type_to_evaluate"));
    }

    #[test]
    fn evaluator_aggregates_its_own_results() {
        let evaluator = RoutingAccuracyEvaluator::default();
        let results = vec![
            evaluator.score(&route(&[("A", "agent")]), &route(&[("A", "agent")])),
            evaluator.score(&route(&[("A", "agent"), ("E", "topic")]), &route(&[("B", "agent")])),
        ];

        let report = evaluator.aggregate(&results);

        let a = report.get("A").unwrap();
        assert_eq!((a.tp, a.fp, a.fn_), (1, 1, 0));
        assert_eq!(a.precision, 0.5);
        assert_eq!(report.get("B").unwrap().recall, 0.0);
        assert!(report.get("E").is_none());
    }
}
