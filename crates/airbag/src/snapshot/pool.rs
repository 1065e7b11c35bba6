// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ops::Deref;
use std::sync::Arc;

use http::Request;
use parking_lot::Mutex;

use super::{NotReplayable, RequestBody, RequestSnapshot};

/// Recycles snapshot buffers so that replaying many requests does not allocate a fresh header
/// map for each of them.
///
/// The pool is cheap to clone; clones share the same free list.
///
/// # Examples
///
/// ```rust
/// use airbag::snapshot::{RequestBody, SnapshotPool};
/// use http::Request;
///
/// let pool = SnapshotPool::new(8);
/// let request = Request::get("/orders").body(RequestBody::empty()).unwrap();
///
/// let snapshot = pool.acquire(&request).unwrap();
/// assert_eq!(snapshot.uri(), "/orders");
/// drop(snapshot);
///
/// assert_eq!(pool.idle(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<Box<RequestSnapshot>>>,
    capacity: usize,
}

impl SnapshotPool {
    /// Creates a pool that keeps at most `capacity` idle buffers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
            }),
        }
    }

    /// Captures `request` into a recycled buffer.
    ///
    /// # Errors
    ///
    /// Returns [`NotReplayable`] when the request body is a single-read stream. The buffer
    /// stays in the pool in that case.
    pub fn acquire(&self, request: &Request<RequestBody>) -> Result<PooledSnapshot, NotReplayable> {
        let mut buffer = self
            .inner
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Box::new(RequestSnapshot::blank()));

        if let Err(e) = buffer.fill(request) {
            self.inner.release(buffer);
            return Err(e);
        }

        Ok(PooledSnapshot {
            snapshot: Some(buffer),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Returns the number of idle buffers.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// Returns the maximum number of idle buffers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl PoolInner {
    fn release(&self, mut buffer: Box<RequestSnapshot>) {
        buffer.reset();

        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(buffer);
        }
    }
}

/// A [`RequestSnapshot`] borrowed from a [`SnapshotPool`].
///
/// Dereferences to the snapshot. Dropping it clears the buffer and hands it back to the pool.
#[derive(Debug)]
pub struct PooledSnapshot {
    snapshot: Option<Box<RequestSnapshot>>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledSnapshot {
    type Target = RequestSnapshot;

    fn deref(&self) -> &Self::Target {
        self.snapshot.as_deref().expect("snapshot is present until drop")
    }
}

impl Drop for PooledSnapshot {
    fn drop(&mut self) {
        if let Some(buffer) = self.snapshot.take() {
            self.pool.release(buffer);
        }
    }
}
