use crate::eval::{
    dataset::EvalCase,
    evaluator::RoutingAccuracyEvaluator,
    report::{BatchSummary, CaseRecord, RunReport},
};

pub struct EvalRunner<'a> {
    evaluator: &'a RoutingAccuracyEvaluator,
}

impl<'a> EvalRunner<'a> {
    pub fn new(evaluator: &'a RoutingAccuracyEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn score_case(&self, case: &EvalCase) -> CaseRecord {
        let result = self.evaluator.score(&case.route, &case.reference_route);
        tracing::debug!(
            case = %case.id,
            precision = result.precision,
            recall = result.recall,
            ordered_match = result.ordered_match,
            "scored case"
        );
        CaseRecord {
            id: case.id.clone(),
            query: case.query.clone(),
            result,
        }
    }

    pub fn run(&self, cases: &[EvalCase]) -> RunReport {
        let records: Vec<CaseRecord> = cases.iter().map(|case| self.score_case(case)).collect();

        let summary = BatchSummary::from_results(records.iter().map(|r| &r.result));
        let aggregate = self.evaluator.aggregate(records.iter().map(|r| &r.result));

        tracing::info!(
            total = summary.total,
            ordered_match_rate = summary.ordered_match_rate,
            mean_precision = summary.mean_precision,
            mean_recall = summary.mean_recall,
            "batch evaluated"
        );

        RunReport {
            cases: records,
            summary,
            aggregate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Step;

    fn case(id: &str, route: &[&str], reference: &[&str]) -> EvalCase {
        EvalCase {
            id: id.to_string(),
            query: None,
            route: route.iter().map(|name| Step::agent(*name)).collect(),
            reference_route: reference.iter().map(|name| Step::agent(*name)).collect(),
        }
    }

    #[test]
    fn run_scores_every_case_and_aggregates() {
        let evaluator = RoutingAccuracyEvaluator::default();
        let cases = vec![
            case("exact", &["banking_agent"], &["banking_agent"]),
            case(
                "partial",
                &["banking_agent"],
                &["banking_agent", "credit_card_agent"],
            ),
        ];

        let report = EvalRunner::new(&evaluator).run(&cases);

        assert_eq!(report.cases.len(), 2);
        assert_eq!(report.cases[1].id, "partial");
        assert_eq!(report.cases[1].result.recall, 0.5);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.ordered_match_rate, 0.5);
        assert_eq!(report.summary.mean_recall, 0.75);

        let banking = report.aggregate.get("banking_agent").unwrap();
        assert_eq!((banking.tp, banking.fp, banking.fn_), (2, 0, 0));
        let card = report.aggregate.get("credit_card_agent").unwrap();
        assert_eq!(card.recall, 0.0);
        assert_eq!(card.precision, 0.0);
        assert_eq!(card.support, 1);
    }

    #[test]
    fn empty_batch_produces_empty_report() {
        let evaluator = RoutingAccuracyEvaluator::default();
        let report = EvalRunner::new(&evaluator).run(&[]);
        assert!(report.cases.is_empty());
        assert_eq!(report.summary.total, 0);
        assert!(report.aggregate.is_empty());
    }
}
