// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default number of hedges launched in addition to the primary attempt.
pub(super) const DEFAULT_MAX_HEDGED_ATTEMPTS: u32 = 1;

/// Default time to wait for a result before launching the next hedge.
///
/// Matches the Polly version 8 hedging default.
pub(super) const DEFAULT_HEDGING_DELAY: Duration = Duration::from_secs(2);
