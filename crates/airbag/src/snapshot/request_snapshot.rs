// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Request, Uri, Version};

use super::{NotReplayable, RequestBody};

/// An immutable capture of an outbound request that can be replayed any number of times.
///
/// The snapshot holds the method, target, HTTP version, every header value (including
/// repeated names), the request's extensions and a reference-counted handle to the body.
/// Every call to [`to_request`][Self::to_request] produces a fully independent request, so
/// concurrently running hedges never observe each other's mutations.
///
/// # Examples
///
/// ```rust
/// use airbag::snapshot::{RequestBody, RequestSnapshot};
/// use http::Request;
///
/// let request = Request::post("https://example.com/orders")
///     .header("x-tenant", "contoso")
///     .body(RequestBody::from("{}"))
///     .unwrap();
///
/// let snapshot = RequestSnapshot::capture(&request).unwrap();
/// let mut first = snapshot.to_request();
/// first.headers_mut().remove("x-tenant");
///
/// assert!(snapshot.to_request().headers().contains_key("x-tenant"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: Option<Bytes>,
}

impl RequestSnapshot {
    /// Captures `request`.
    ///
    /// # Errors
    ///
    /// Returns [`NotReplayable`] when the request body is a single-read stream.
    pub fn capture(request: &Request<RequestBody>) -> Result<Self, NotReplayable> {
        let mut snapshot = Self::blank();
        snapshot.fill(request)?;
        Ok(snapshot)
    }

    /// Builds a new request from the captured state.
    #[must_use]
    pub fn to_request(&self) -> Request<RequestBody> {
        let mut request = Request::new(RequestBody::from_snapshot(self.body.as_ref()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        *request.extensions_mut() = self.extensions.clone();
        request
    }

    /// Returns the captured method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the captured target.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the captured HTTP version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the captured headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the captured extensions.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the captured body; empty bodies yield `None`.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub(super) fn blank() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::default(),
            version: Version::default(),
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            body: None,
        }
    }

    /// Overwrites this buffer with the state of `request`, reusing the header map allocation.
    pub(super) fn fill(&mut self, request: &Request<RequestBody>) -> Result<(), NotReplayable> {
        let body = request
            .body()
            .as_bytes()
            .ok_or_else(|| NotReplayable::new(request.method().clone(), request.uri().clone()))?;

        self.method = request.method().clone();
        self.uri = request.uri().clone();
        self.version = request.version();
        self.headers.clear();
        for (name, value) in request.headers() {
            self.headers.append(name.clone(), value.clone());
        }
        self.extensions = request.extensions().clone();
        self.body = (!body.is_empty()).then_some(body);
        Ok(())
    }

    /// Drops captured state while keeping allocations for the next capture.
    pub(super) fn reset(&mut self) {
        self.method = Method::GET;
        self.uri = Uri::default();
        self.version = Version::default();
        self.headers.clear();
        self.extensions.clear();
        self.body = None;
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use futures::stream;
    use http::HeaderValue;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TraceId(&'static str);

    fn request() -> Request<RequestBody> {
        let mut request = Request::put("https://example.com/items/7")
            .version(Version::HTTP_2)
            .header("accept", "application/json")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .body(RequestBody::from("payload"))
            .unwrap();
        request.extensions_mut().insert(TraceId("abc"));
        request
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(RequestSnapshot: Send, Sync, Clone);
    }

    #[test]
    fn capture_copies_every_part() {
        let snapshot = RequestSnapshot::capture(&request()).unwrap();

        assert_eq!(snapshot.method(), Method::PUT);
        assert_eq!(snapshot.uri(), "https://example.com/items/7");
        assert_eq!(snapshot.version(), Version::HTTP_2);
        assert_eq!(snapshot.headers().get_all("x-tag").iter().count(), 2);
        assert_eq!(snapshot.extensions().get::<TraceId>(), Some(&TraceId("abc")));
        assert_eq!(snapshot.body(), Some(&Bytes::from_static(b"payload")));
    }

    #[test]
    fn capture_empty_body() {
        let request = Request::get("/health").body(RequestBody::empty()).unwrap();
        let snapshot = RequestSnapshot::capture(&request).unwrap();

        assert!(snapshot.body().is_none());
        assert!(snapshot.to_request().body().is_empty());
    }

    #[test]
    fn capture_streaming_body_fails() {
        let body = RequestBody::from_stream(stream::empty());
        let request = Request::post("/upload").body(body).unwrap();

        let error = RequestSnapshot::capture(&request).unwrap_err();
        assert_eq!(error.method(), Method::POST);
        assert_eq!(error.uri(), "/upload");
        assert_eq!(error.to_string(), "request POST /upload has a streaming body and cannot be replayed");
    }

    #[test]
    fn to_request_is_independent() {
        let snapshot = RequestSnapshot::capture(&request()).unwrap();

        let mut first = snapshot.to_request();
        first.headers_mut().insert("accept", HeaderValue::from_static("text/plain"));
        first.extensions_mut().insert(TraceId("changed"));
        *first.method_mut() = Method::DELETE;

        let second = snapshot.to_request();
        assert_eq!(second.method(), Method::PUT);
        assert_eq!(second.headers()["accept"], "application/json");
        assert_eq!(second.extensions().get::<TraceId>(), Some(&TraceId("abc")));
        assert_eq!(snapshot.headers()["accept"], "application/json");
    }

    #[test]
    fn body_is_shared_not_copied() {
        let snapshot = RequestSnapshot::capture(&request()).unwrap();
        let replayed = snapshot.to_request().into_body().as_bytes().unwrap();

        assert_eq!(replayed.as_ptr(), snapshot.body().unwrap().as_ptr());
    }

    #[test]
    fn reset_clears_state() {
        let mut snapshot = RequestSnapshot::capture(&request()).unwrap();
        snapshot.reset();

        assert!(snapshot.headers().is_empty());
        assert!(snapshot.extensions().get::<TraceId>().is_none());
        assert!(snapshot.body().is_none());
        assert_eq!(snapshot.method(), Method::GET);
    }
}
