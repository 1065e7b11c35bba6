// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

/// The fault a group injects when it fires.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(tag = "type", rename_all = "snake_case"))]
#[non_exhaustive]
pub enum FaultKind {
    /// Nothing is injected.
    #[default]
    NoOp,

    /// The call fails with the error registered under `key`.
    Error {
        /// Key into [`FaultRegistry`][super::FaultRegistry] errors.
        key: String,
    },

    /// The call returns the response registered under `key` without reaching the transport.
    Response {
        /// Key into [`FaultRegistry`][super::FaultRegistry] responses.
        key: String,
    },

    /// The call is delayed by `latency` before proceeding.
    Latency {
        /// The injected delay.
        latency: Duration,
    },
}

/// A named fault and the probability that it fires for a call routed to it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct FaultGroupOptions {
    /// Unique group name.
    pub name: String,
    /// Chance in `0.0..=1.0` that the fault fires.
    pub probability: f64,
    /// Disabled groups never fire.
    pub enabled: bool,
    /// The injected fault.
    pub fault: FaultKind,
}

impl FaultGroupOptions {
    /// Creates an enabled group that never fires until a probability and fault are set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the chance that the fault fires.
    #[must_use]
    pub fn probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Enables or disables the group.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the injected fault.
    #[must_use]
    pub fn fault(mut self, fault: FaultKind) -> Self {
        self.fault = fault;
        self
    }
}

impl Default for FaultGroupOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            probability: 0.0,
            enabled: true,
            fault: FaultKind::NoOp,
        }
    }
}

/// The relative share of traffic routed to a fault group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct WeightAssignment {
    /// Name of the target [`FaultGroupOptions`].
    pub group: String,
    /// Relative weight; non-positive and non-finite weights never receive traffic.
    pub weight: f64,
}

impl WeightAssignment {
    /// Assigns `weight` to `group`.
    #[must_use]
    pub fn new(group: impl Into<String>, weight: f64) -> Self {
        Self {
            group: group.into(),
            weight,
        }
    }
}

/// Fault groups plus the weight table used to route calls to them.
///
/// The weight table keeps its configured order; selection walks it front to back.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct FaultInjectionOptions {
    /// Every configured fault group.
    pub groups: Vec<FaultGroupOptions>,
    /// Routing weights, in configured order.
    pub weights: Vec<WeightAssignment>,
}

impl FaultInjectionOptions {
    /// Creates empty options that never inject anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fault group.
    #[must_use]
    pub fn group(mut self, group: FaultGroupOptions) -> Self {
        self.groups.push(group);
        self
    }

    /// Appends a weight assignment.
    #[must_use]
    pub fn weight(mut self, group: impl Into<String>, weight: f64) -> Self {
        self.weights.push(WeightAssignment::new(group, weight));
        self
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn find_group(&self, name: &str) -> Option<&FaultGroupOptions> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Checks the options for values that cannot be evaluated.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a probability outside `0.0..=1.0`, a negative or
    /// non-finite weight, or a group name used twice.
    pub fn validate(&self) -> Result<(), OptionsError> {
        let mut seen = HashSet::with_capacity(self.groups.len());

        for group in &self.groups {
            if !(0.0..=1.0).contains(&group.probability) {
                return Err(OptionsError::Probability {
                    group: group.name.clone(),
                    probability: group.probability,
                });
            }

            if !seen.insert(group.name.as_str()) {
                return Err(OptionsError::DuplicateGroup(group.name.clone()));
            }
        }

        for assignment in &self.weights {
            if !assignment.weight.is_finite() || assignment.weight < 0.0 {
                return Err(OptionsError::Weight {
                    group: assignment.group.clone(),
                    weight: assignment.weight,
                });
            }
        }

        Ok(())
    }
}

/// Invalid fault injection options.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum OptionsError {
    /// A group probability lies outside `0.0..=1.0`.
    #[error("fault group '{group}' has probability {probability}, expected a value in 0.0..=1.0")]
    Probability {
        /// The offending group.
        group: String,
        /// The configured probability.
        probability: f64,
    },

    /// A weight is negative, infinite or NaN.
    #[error("weight {weight} assigned to '{group}' must be finite and non-negative")]
    Weight {
        /// The group the weight is assigned to.
        group: String,
        /// The configured weight.
        weight: f64,
    },

    /// Two groups share a name.
    #[error("fault group '{0}' is defined more than once")]
    DuplicateGroup(String),
}
