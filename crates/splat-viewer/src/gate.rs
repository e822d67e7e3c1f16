//! Bounded count of frames whose GPU work is submitted but not complete.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

struct Inner {
    capacity: usize,
    in_flight: Mutex<usize>,
    freed: Condvar,
}

/// Counting semaphore. Permits are released by dropping them, which may
/// happen on any thread (typically a GPU completion callback).
#[derive(Clone)]
pub struct FrameGate {
    inner: Arc<Inner>,
}

/// One in-flight frame slot.
#[must_use = "dropping a permit releases its slot immediately"]
pub struct FramePermit {
    inner: Arc<Inner>,
}

impl FrameGate {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                in_flight: Mutex::new(0),
                freed: Condvar::new(),
            }),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.lock()
    }

    pub fn try_acquire(&self) -> Option<FramePermit> {
        let mut in_flight = self.inner.in_flight.lock();
        if *in_flight < self.inner.capacity {
            *in_flight += 1;
            Some(self.permit())
        } else {
            None
        }
    }

    /// Blocks until a slot is free.
    pub fn acquire(&self) -> FramePermit {
        let mut in_flight = self.inner.in_flight.lock();
        while *in_flight >= self.inner.capacity {
            self.inner.freed.wait(&mut in_flight);
        }
        *in_flight += 1;
        self.permit()
    }

    /// Blocks until a slot is free or `timeout` elapses.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<FramePermit> {
        let deadline = Instant::now() + timeout;
        let mut in_flight = self.inner.in_flight.lock();
        while *in_flight >= self.inner.capacity {
            if self
                .inner
                .freed
                .wait_until(&mut in_flight, deadline)
                .timed_out()
            {
                if *in_flight >= self.inner.capacity {
                    return None;
                }
                break;
            }
        }
        *in_flight += 1;
        Some(self.permit())
    }

    fn permit(&self) -> FramePermit {
        FramePermit {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for FrameGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGate")
            .field("capacity", &self.inner.capacity)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        let mut in_flight = self.inner.in_flight.lock();
        debug_assert!(*in_flight > 0);
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.inner.freed.notify_one();
    }
}
