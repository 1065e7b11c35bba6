// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

/// A shareable injected error.
pub type FaultError = Arc<dyn Error + Send + Sync>;

/// A response substituted for the real one when a response fault fires.
///
/// Cloning is cheap; clones share the same status, headers and body.
///
/// # Examples
///
/// ```rust
/// use airbag::chaos::FaultResponse;
/// use http::{HeaderName, HeaderValue, StatusCode};
///
/// let throttled = FaultResponse::new(StatusCode::TOO_MANY_REQUESTS)
///     .with_header(HeaderName::from_static("retry-after"), HeaderValue::from_static("5"))
///     .with_body("slow down");
///
/// let response = throttled.to_response();
/// assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
/// assert_eq!(response.headers()["retry-after"], "5");
/// ```
#[derive(Debug, Clone)]
pub struct FaultResponse(Arc<ResponseParts>);

#[derive(Debug, Clone)]
struct ResponseParts {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl FaultResponse {
    /// Creates an empty response with `status`.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self(Arc::new(ResponseParts {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }))
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.0).headers.append(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        Arc::make_mut(&mut self.0).body = body.into();
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.0.status
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.0.headers
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.0.body
    }

    /// Builds an independent `http` response.
    #[must_use]
    pub fn to_response(&self) -> Response<Bytes> {
        let mut response = Response::new(self.0.body.clone());
        *response.status_mut() = self.0.status;
        *response.headers_mut() = self.0.headers.clone();
        response
    }
}

/// Injected errors and responses, resolved by key when a fault fires.
///
/// The registry is built ahead of time and is immutable afterwards, so lookups on the hot path
/// never lock.
#[derive(Clone, Default)]
pub struct FaultRegistry {
    errors: Arc<HashMap<String, FaultError>>,
    responses: Arc<HashMap<String, FaultResponse>>,
}

impl FaultRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `error` under `key`, replacing any previous entry.
    #[must_use]
    pub fn with_error(mut self, key: impl Into<String>, error: impl Error + Send + Sync + 'static) -> Self {
        Arc::make_mut(&mut self.errors).insert(key.into(), Arc::new(error));
        self
    }

    /// Registers `response` under `key`, replacing any previous entry.
    #[must_use]
    pub fn with_response(mut self, key: impl Into<String>, response: FaultResponse) -> Self {
        Arc::make_mut(&mut self.responses).insert(key.into(), response);
        self
    }

    /// Returns the error registered under `key`.
    #[must_use]
    pub fn error(&self, key: &str) -> Option<FaultError> {
        self.errors.get(key).cloned()
    }

    /// Returns the response registered under `key`.
    #[must_use]
    pub fn response(&self, key: &str) -> Option<FaultResponse> {
        self.responses.get(key).cloned()
    }
}

impl Debug for FaultRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut errors: Vec<_> = self.errors.keys().collect();
        let mut responses: Vec<_> = self.responses.keys().collect();
        errors.sort();
        responses.sort();

        f.debug_struct("FaultRegistry")
            .field("errors", &errors)
            .field("responses", &responses)
            .finish()
    }
}
