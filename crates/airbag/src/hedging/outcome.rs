// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// The accepted output of a hedged call.
#[derive(Debug, Clone)]
pub struct Hedged<Out> {
    pub(super) output: Out,
    pub(super) attempt: u32,
    pub(super) launched: u32,
    pub(super) cancelled: u32,
}

impl<Out> Hedged<Out> {
    /// Returns the accepted output.
    #[must_use]
    pub fn output(&self) -> &Out {
        &self.output
    }

    /// Consumes the result and returns the accepted output.
    #[must_use]
    pub fn into_output(self) -> Out {
        self.output
    }

    /// Returns the number of the attempt that produced the output; 1 is the primary.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns how many attempts were launched in total.
    #[must_use]
    pub fn launched(&self) -> u32 {
        self.launched
    }

    /// Returns how many still-running attempts were cancelled when the winner arrived.
    #[must_use]
    pub fn cancelled(&self) -> u32 {
        self.cancelled
    }
}

/// A hedged call that produced no acceptable output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HedgingError<Out> {
    /// Every launched attempt completed with an unacceptable output.
    #[error("all {attempts} hedged attempts completed without an acceptable result")]
    Exhausted {
        /// Number of attempts launched.
        attempts: u32,
        /// Output of the attempt that completed last.
        last: Out,
    },

    /// The call was cancelled by the caller.
    #[error("hedged call cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of attempts launched before cancellation.
        attempts: u32,
    },
}

impl<Out> HedgingError<Out> {
    /// Returns the number of attempts launched.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// Returns the last output when the call was exhausted.
    #[must_use]
    pub fn into_last(self) -> Option<Out> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Cancelled { .. } => None,
        }
    }
}
