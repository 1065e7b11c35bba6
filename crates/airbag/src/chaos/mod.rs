// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fault injection for chaos testing.
//!
//! Faults are organized in named groups ([`FaultGroupOptions`]), each with a probability and a
//! fault: an error, a substituted response, or added latency. Calls are routed to groups by a
//! weight table ([`WeightedGroupSelector`]) or explicitly via the [`FaultGroupName`] request
//! extension. [`FaultInjectionEngine`] decides whether the routed group fires and resolves its
//! payload from a [`FaultRegistry`]. [`FaultInjector`] ties these together with hot-reloadable
//! options.
//!
//! Every failure mode of the configuration fails open: zero total weight, unknown group
//! names and unregistered payload keys all result in no fault.

mod engine;
mod injector;
mod options;
mod registry;
mod selector;

pub use engine::{FaultDecision, FaultInjectionEngine};
pub use injector::{FaultGroupName, FaultInjector, InjectedFault};
pub use options::{FaultGroupOptions, FaultInjectionOptions, FaultKind, OptionsError, WeightAssignment};
pub use registry::{FaultError, FaultRegistry, FaultResponse};
pub use selector::WeightedGroupSelector;
