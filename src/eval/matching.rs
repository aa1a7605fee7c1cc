//! Match predicates and precision/recall estimators over routes.
//!
//! Raw variants treat a route as an ordered multiset: every occurrence may be
//! paired with at most one equal occurrence on the other side. `_dedup`
//! variants collapse each route to its set of distinct identifiers first.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    eval::report::EvaluationResult,
    types::{ConfusionCounts, StepStats},
};

/// How the raw precision/recall estimators treat empty routes.
///
/// `Legacy` returns 0.0 whenever the denominator side is empty, including the
/// empty-vs-empty case, while the dedup estimators return 1.0 for empty-vs-empty.
/// `Unified` makes the raw estimators agree with the dedup ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRoutePolicy {
    #[default]
    Legacy,
    Unified,
}

/// Rounds to two decimal places.
///
/// Rounds the exact binary value of `value`, not `value * 100.0`, so 0.025
/// (stored slightly above) becomes 0.03 while an exact tie such as 0.125 goes
/// to the even neighbour, 0.12.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e15 {
        return value;
    }

    let bits = value.abs().to_bits();
    let biased_exp = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    // |value| == mantissa * 2^exp
    let (mantissa, exp) = if biased_exp == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased_exp - 1075)
    };
    if exp >= 0 {
        return value;
    }

    let scaled = u128::from(mantissa) * 100;
    let shift = exp.unsigned_abs();
    let hundredths = if shift > 64 {
        0
    } else {
        let floor = scaled >> shift;
        let rem = scaled & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        if rem > half || (rem == half && floor & 1 == 1) {
            floor + 1
        } else {
            floor
        }
    };

    let rounded = hundredths as f64 / 100.0;
    if value < 0.0 {
        -rounded
    } else {
        rounded
    }
}

/// First-available, left-to-right one-to-one equality matching.
///
/// Each needle consumes the first unconsumed haystack element equal to it.
/// Returns the number of needles that found a partner.
pub fn count_matches<S: AsRef<str>>(needles: &[S], haystack: &[S]) -> usize {
    let mut consumed = vec![false; haystack.len()];
    let mut matches = 0;
    for needle in needles {
        let needle = needle.as_ref();
        let hit = (0..haystack.len()).find(|&idx| !consumed[idx] && haystack[idx].as_ref() == needle);
        if let Some(idx) = hit {
            consumed[idx] = true;
            matches += 1;
        }
    }
    matches
}

fn distinct<S: AsRef<str>>(route: &[S]) -> HashSet<&str> {
    route.iter().map(AsRef::as_ref).collect()
}

fn sorted<S: AsRef<str>>(route: &[S]) -> Vec<&str> {
    let mut items: Vec<&str> = route.iter().map(AsRef::as_ref).collect();
    items.sort_unstable();
    items
}

pub fn ordered_match<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    let equal = route.len() == reference_route.len()
        && route
            .iter()
            .zip(reference_route)
            .all(|(a, b)| a.as_ref() == b.as_ref());
    u8::from(equal)
}

pub fn unordered_match<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    u8::from(sorted(route) == sorted(reference_route))
}

pub fn unordered_match_dedup<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    u8::from(distinct(route) == distinct(reference_route))
}

/// 1 when every reference occurrence can be paired with a distinct route occurrence.
pub fn superset_match<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    u8::from(count_matches(reference_route, route) == reference_route.len())
}

pub fn superset_match_dedup<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    u8::from(distinct(reference_route).is_subset(&distinct(route)))
}

/// Mirror of [`superset_match`] with the arguments swapped.
pub fn subset_match<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    superset_match(reference_route, route)
}

pub fn subset_match_dedup<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> u8 {
    u8::from(distinct(route).is_subset(&distinct(reference_route)))
}

pub fn precision<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> f64 {
    precision_with(route, reference_route, EmptyRoutePolicy::Legacy)
}

pub fn precision_with<S: AsRef<str>>(
    route: &[S],
    reference_route: &[S],
    policy: EmptyRoutePolicy,
) -> f64 {
    if route.is_empty() {
        return empty_score(reference_route.is_empty(), policy);
    }
    let matches = count_matches(route, reference_route);
    round2(matches as f64 / route.len() as f64)
}

pub fn recall<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> f64 {
    recall_with(route, reference_route, EmptyRoutePolicy::Legacy)
}

pub fn recall_with<S: AsRef<str>>(
    route: &[S],
    reference_route: &[S],
    policy: EmptyRoutePolicy,
) -> f64 {
    if reference_route.is_empty() {
        return empty_score(route.is_empty(), policy);
    }
    let matches = count_matches(reference_route, route);
    round2(matches as f64 / reference_route.len() as f64)
}

fn empty_score(other_side_empty: bool, policy: EmptyRoutePolicy) -> f64 {
    match policy {
        EmptyRoutePolicy::Unified if other_side_empty => 1.0,
        _ => 0.0,
    }
}

pub fn precision_dedup<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> f64 {
    let route_set = distinct(route);
    let reference_set = distinct(reference_route);
    if route_set.is_empty() {
        return if reference_set.is_empty() { 1.0 } else { 0.0 };
    }
    let matches = route_set.intersection(&reference_set).count();
    round2(matches as f64 / route_set.len() as f64)
}

pub fn recall_dedup<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> f64 {
    let route_set = distinct(route);
    let reference_set = distinct(reference_route);
    if reference_set.is_empty() {
        return if route_set.is_empty() { 1.0 } else { 0.0 };
    }
    let matches = route_set.intersection(&reference_set).count();
    round2(matches as f64 / reference_set.len() as f64)
}

/// Per-identifier set membership breakdown: tp if in both, fp if only in the
/// route, fn if only in the reference.
pub fn step_stats<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> StepStats {
    let route_set = distinct(route);
    let reference_set = distinct(reference_route);
    route_set
        .union(&reference_set)
        .map(|step| {
            let counts = match (route_set.contains(step), reference_set.contains(step)) {
                (true, true) => ConfusionCounts::TRUE_POSITIVE,
                (true, false) => ConfusionCounts::FALSE_POSITIVE,
                _ => ConfusionCounts::FALSE_NEGATIVE,
            };
            (step.to_string(), counts)
        })
        .collect()
}

/// Scores `route` against `reference_route` with the default empty-route policy.
pub fn evaluate<S: AsRef<str>>(route: &[S], reference_route: &[S]) -> EvaluationResult {
    evaluate_with(route, reference_route, EmptyRoutePolicy::Legacy)
}

pub fn evaluate_with<S: AsRef<str>>(
    route: &[S],
    reference_route: &[S],
    policy: EmptyRoutePolicy,
) -> EvaluationResult {
    EvaluationResult {
        ordered_match: ordered_match(route, reference_route),
        unordered_match: unordered_match(route, reference_route),
        superset_match: superset_match(route, reference_route),
        subset_match: subset_match(route, reference_route),
        precision: precision_with(route, reference_route, policy),
        recall: recall_with(route, reference_route, policy),
        unordered_match_dedup: unordered_match_dedup(route, reference_route),
        superset_match_dedup: superset_match_dedup(route, reference_route),
        subset_match_dedup: subset_match_dedup(route, reference_route),
        precision_dedup: precision_dedup(route, reference_route),
        recall_dedup: recall_dedup(route, reference_route),
        step_stats: step_stats(route, reference_route),
        route_evaluated: route.iter().map(|s| s.as_ref().to_string()).collect(),
        reference_route_evaluated: reference_route
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect(),
    }
}
