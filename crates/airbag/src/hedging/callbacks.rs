// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use super::args::{HedgingDelayArgs, RecoveryArgs, ShouldHedgeArgs};
use super::attempt::HedgingAttempt;
use crate::RecoveryInfo;
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(ShouldRecover<Out>(Fn(output: &Out, args: RecoveryArgs<'_>) -> RecoveryInfo));
define_fn_wrapper!(ShouldHedge(Fn(args: ShouldHedgeArgs) -> bool));
define_fn_wrapper!(OnHedge(Fn(attempt: &HedgingAttempt)));
define_fn_wrapper!(DelayFn(Fn(args: HedgingDelayArgs) -> Duration));
