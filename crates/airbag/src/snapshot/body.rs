// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

/// Boxed error type carried by streaming bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single-read stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// The body of an outbound request.
///
/// Empty and buffered bodies can be read any number of times and are therefore replayable. A
/// streaming body can be read exactly once; requests carrying one cannot be snapshotted until
/// the stream is drained with [`buffer`][Self::buffer].
pub struct RequestBody(Inner);

enum Inner {
    Empty,
    Full(Bytes),
    Stream(BodyStream),
}

impl RequestBody {
    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self(Inner::Empty)
    }

    /// Creates a single-read body from a stream of chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self(Inner::Stream(Box::pin(stream)))
    }

    /// Returns `true` when the body can be read more than once.
    #[must_use]
    pub fn is_replayable(&self) -> bool {
        !matches!(self.0, Inner::Stream(_))
    }

    /// Returns `true` for a body with no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Inner::Empty => true,
            Inner::Full(bytes) => bytes.is_empty(),
            Inner::Stream(_) => false,
        }
    }

    /// Returns the buffered content, or `None` for a streaming body.
    ///
    /// An empty body yields an empty buffer.
    #[must_use]
    pub fn as_bytes(&self) -> Option<Bytes> {
        match &self.0 {
            Inner::Empty => Some(Bytes::new()),
            Inner::Full(bytes) => Some(bytes.clone()),
            Inner::Stream(_) => None,
        }
    }

    /// Converts the body into a stream of chunks, consuming it.
    #[must_use]
    pub fn into_stream(self) -> BodyStream {
        match self.0 {
            Inner::Empty => Box::pin(futures_util::stream::empty()),
            Inner::Full(bytes) => Box::pin(futures_util::stream::once(async move { Ok(bytes) })),
            Inner::Stream(stream) => stream,
        }
    }

    /// Drains a streaming body into memory so the request becomes replayable.
    ///
    /// Replayable bodies are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream.
    pub async fn buffer(self) -> Result<Self, BoxError> {
        let mut stream = match self.0 {
            Inner::Stream(stream) => stream,
            inner => return Ok(Self(inner)),
        };

        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        Ok(Self::from(buffer.freeze()))
    }

    pub(crate) fn from_snapshot(bytes: Option<&Bytes>) -> Self {
        bytes.map_or_else(Self::empty, |b| Self(Inner::Full(b.clone())))
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Inner::Empty => f.debug_tuple("RequestBody").field(&"empty").finish(),
            Inner::Full(bytes) => f.debug_tuple("RequestBody").field(&bytes.len()).finish(),
            Inner::Stream(_) => f.debug_tuple("RequestBody").field(&"stream").finish(),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Self::empty()
        } else {
            Self(Inner::Full(bytes))
        }
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}
