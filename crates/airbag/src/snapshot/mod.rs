// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Replayable captures of outbound requests.
//!
//! A hedged or retried call sends the same logical request more than once. [`RequestSnapshot`]
//! captures a request whose body is buffered and produces independent copies of it on demand;
//! [`SnapshotPool`] recycles the capture buffers across calls.
//!
//! Requests with a single-read streaming body are rejected up front with [`NotReplayable`].

mod body;
mod error;
mod pool;
mod request_snapshot;

pub use body::{BodyStream, BoxError, RequestBody};
pub use error::NotReplayable;
pub use pool::{PooledSnapshot, SnapshotPool};
pub use request_snapshot::RequestSnapshot;
