// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::WeightAssignment;
use crate::Randomizer;

/// Picks a fault group from a weight table.
///
/// Each group receives a share of calls proportional to its weight. Negative, NaN and infinite
/// weights count as zero. When no group has a positive weight, nothing is selected.
///
/// # Examples
///
/// ```rust
/// use airbag::Randomizer;
/// use airbag::chaos::{WeightAssignment, WeightedGroupSelector};
///
/// let weights = [WeightAssignment::new("errors", 1.0), WeightAssignment::new("latency", 3.0)];
///
/// assert_eq!(WeightedGroupSelector::new(Randomizer::fixed(0.1)).select(&weights), Some("errors"));
/// assert_eq!(WeightedGroupSelector::new(Randomizer::fixed(0.5)).select(&weights), Some("latency"));
/// assert_eq!(WeightedGroupSelector::new(Randomizer::new()).select(&[]), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WeightedGroupSelector {
    rnd: Randomizer,
}

impl WeightedGroupSelector {
    /// Creates a selector drawing from `rnd`.
    #[must_use]
    pub fn new(rnd: Randomizer) -> Self {
        Self { rnd }
    }

    /// Selects a group name from `weights`, walking the table in order.
    ///
    /// Returns `None` when the total weight is zero.
    #[must_use]
    pub fn select<'a>(&self, weights: &'a [WeightAssignment]) -> Option<&'a str> {
        let total: f64 = weights.iter().map(effective_weight).sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }

        let draw = self.rnd.next_double(total);
        let mut cumulative = 0.0;
        let mut last_positive = None;

        for assignment in weights {
            let weight = effective_weight(assignment);
            if weight <= 0.0 {
                continue;
            }

            cumulative += weight;
            if draw < cumulative {
                return Some(assignment.group.as_str());
            }
            last_positive = Some(assignment.group.as_str());
        }

        // A draw at or above the total only happens with deterministic sources.
        last_positive
    }
}

fn effective_weight(assignment: &WeightAssignment) -> f64 {
    if assignment.weight.is_finite() && assignment.weight > 0.0 {
        assignment.weight
    } else {
        0.0
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn table() -> Vec<WeightAssignment> {
        vec![
            WeightAssignment::new("a", 1.0),
            WeightAssignment::new("b", 0.0),
            WeightAssignment::new("c", 3.0),
        ]
    }

    #[rstest]
    #[case(0.0, "a")]
    #[case(0.2499, "a")]
    #[case(0.25, "c")]
    #[case(0.9999, "c")]
    #[case(1.0, "c")]
    fn selection_follows_cumulative_weights(#[case] draw: f64, #[case] expected: &str) {
        let selector = WeightedGroupSelector::new(Randomizer::fixed(draw));

        assert_eq!(selector.select(&table()), Some(expected));
    }

    #[test]
    fn zero_total_weight_selects_nothing() {
        let weights = vec![WeightAssignment::new("a", 0.0), WeightAssignment::new("b", 0.0)];

        for draw in [0.0, 0.5, 1.0] {
            assert_eq!(WeightedGroupSelector::new(Randomizer::fixed(draw)).select(&weights), None);
        }
        assert_eq!(WeightedGroupSelector::default().select(&[]), None);
    }

    #[rstest]
    #[case(-5.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn invalid_weights_count_as_zero(#[case] weight: f64) {
        let weights = vec![WeightAssignment::new("bad", weight), WeightAssignment::new("good", 1.0)];

        for draw in [0.0, 0.5, 1.0] {
            assert_eq!(
                WeightedGroupSelector::new(Randomizer::fixed(draw)).select(&weights),
                Some("good")
            );
        }
    }

    #[test]
    fn single_group_is_always_selected() {
        let weights = vec![WeightAssignment::new("only", 0.1)];

        assert_eq!(WeightedGroupSelector::new(Randomizer::fixed(0.0)).select(&weights), Some("only"));
        assert_eq!(WeightedGroupSelector::new(Randomizer::fixed(1.0)).select(&weights), Some("only"));
    }

    #[test]
    fn distribution_roughly_matches_weights() {
        let selector = WeightedGroupSelector::new(Randomizer::new());
        let weights = table();
        let mut counts: HashMap<&str, u32> = HashMap::new();

        for _ in 0..10_000 {
            *counts.entry(selector.select(&weights).unwrap()).or_default() += 1;
        }

        assert!(!counts.contains_key("b"));
        let a = counts["a"];
        assert!((2_000..3_000).contains(&a), "unexpected share for 'a': {a}");
    }
}
