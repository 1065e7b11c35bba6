// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use http::{Method, Uri};
use thiserror::Error;

/// A request could not be captured because its body can only be read once.
///
/// Buffer the body first with [`RequestBody::buffer`][crate::snapshot::RequestBody::buffer]
/// or send the request without replay.
#[derive(Debug, Clone, Error)]
#[error("request {method} {uri} has a streaming body and cannot be replayed")]
pub struct NotReplayable {
    method: Method,
    uri: Uri,
}

impl NotReplayable {
    pub(crate) fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }

    /// Returns the method of the rejected request.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the target of the rejected request.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}
