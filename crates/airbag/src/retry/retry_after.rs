// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use http::header::RETRY_AFTER;
use http::{HeaderMap, HeaderValue, Response, response};
use tick::Clock;
use tick::fmt::Rfc2822;

use crate::RecoveryInfo;

/// A parsed `Retry-After` header value.
///
/// Servers send either a number of seconds to wait or an HTTP date after which to retry.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use airbag::retry::RetryAfter;
/// use http::HeaderValue;
///
/// let hint = RetryAfter::parse(&HeaderValue::from_static("120")).unwrap();
/// assert_eq!(hint, RetryAfter::Delta(Duration::from_secs(120)));
///
/// assert!(RetryAfter::parse(&HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT")).is_some());
/// assert!(RetryAfter::parse(&HeaderValue::from_static("soon")).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    /// Retry no earlier than this point in time.
    Date(SystemTime),
    /// Retry after this much time has passed.
    Delta(Duration),
}

impl RetryAfter {
    /// Parses a header value holding either delay seconds or an HTTP date.
    ///
    /// Returns `None` for anything else.
    #[must_use]
    pub fn parse(value: &HeaderValue) -> Option<Self> {
        let text = value.to_str().ok()?.trim();
        if text.is_empty() {
            return None;
        }

        if text.bytes().all(|b| b.is_ascii_digit()) {
            // Values too large for u64 still mean "a very long time".
            let secs = text.parse::<u64>().unwrap_or(u64::MAX);
            return Some(Self::Delta(Duration::from_secs(secs)));
        }

        text.parse::<Rfc2822>().ok().map(|date| Self::Date(date.into()))
    }

    /// Returns how long to wait from now according to `clock`.
    ///
    /// Dates in the past resolve to [`Duration::ZERO`].
    #[must_use]
    pub fn delay(&self, clock: &Clock) -> Duration {
        match self {
            Self::Delta(delta) => *delta,
            Self::Date(date) => date.duration_since(clock.system_time()).unwrap_or(Duration::ZERO),
        }
    }
}

/// Anything that carries response headers and may hold a `Retry-After` hint.
///
/// Implemented for [`HeaderMap`], [`Response`] and [`response::Parts`].
pub trait RetryAfterSource {
    /// Returns the response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the server's retry hint, or `None` when the header is missing or unparsable.
    ///
    /// Only the first `Retry-After` value is considered.
    fn retry_after(&self, clock: &Clock) -> Option<Duration> {
        let value = self.headers().get(RETRY_AFTER)?;
        RetryAfter::parse(value).map(|hint| hint.delay(clock))
    }

    /// Returns an [`unavailable`][RecoveryInfo::unavailable] classification carrying the
    /// server's retry hint, or `None` when there is no usable hint.
    fn recovery(&self, clock: &Clock) -> Option<RecoveryInfo> {
        self.retry_after(clock).map(|delay| RecoveryInfo::unavailable().delay(delay))
    }
}

impl RetryAfterSource for HeaderMap {
    fn headers(&self) -> &HeaderMap {
        self
    }
}

impl<B> RetryAfterSource for Response<B> {
    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }
}

impl RetryAfterSource for response::Parts {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
