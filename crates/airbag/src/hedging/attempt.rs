// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tokio_util::sync::CancellationToken;

/// One launched attempt of a hedged call.
///
/// Numbers start at 1 for the primary attempt and increase by one with every hedge; they are
/// never reused within a call. The token is cancelled when another attempt wins or when the
/// whole call is cancelled; cooperative operations should stop work once it fires.
#[derive(Debug, Clone)]
pub struct HedgingAttempt {
    number: u32,
    cancellation: CancellationToken,
}

impl HedgingAttempt {
    pub(super) fn new(number: u32, cancellation: CancellationToken) -> Self {
        Self { number, cancellation }
    }

    /// Returns the 1-based attempt number.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns `true` for the primary attempt.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.number == 1
    }

    /// Returns the token scoped to this attempt.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let parent = CancellationToken::new();
        let primary = HedgingAttempt::new(1, parent.child_token());
        let hedge = HedgingAttempt::new(2, parent.child_token());

        assert!(primary.is_primary());
        assert!(!hedge.is_primary());
        assert_eq!(hedge.number(), 2);

        parent.cancel();
        assert!(primary.cancellation().is_cancelled());
        assert!(hedge.cancellation().is_cancelled());
    }
}
