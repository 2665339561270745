//! Bounded FIFO shared between the controller and the layers around it
//!
//! Admission is limited by both the number of queued items and the age of the
//! oldest one ("time depth"). A producer asks [`TimeLimitFifo::would_accept`]
//! or calls [`TimeLimitFifo::try_push`]; messages the controller must never
//! drop (responses, ACKs, resolver results) use [`TimeLimitFifo::push`], which
//! ignores the limits.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

struct FifoInner<T> {
    queue: Mutex<VecDeque<(Instant, T)>>,
    notify: Notify,
    max_size: usize,
    max_time_depth: Duration,
}

/// Multi-producer FIFO with size and time-depth admission limits
///
/// A limit of zero means unlimited.
pub struct TimeLimitFifo<T> {
    inner: Arc<FifoInner<T>>,
}

impl<T> Clone for TimeLimitFifo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for TimeLimitFifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeLimitFifo")
            .field("len", &self.len())
            .field("max_size", &self.inner.max_size)
            .field("max_time_depth", &self.inner.max_time_depth)
            .finish()
    }
}

impl<T> TimeLimitFifo<T> {
    pub fn new(max_size: usize, max_time_depth: Duration) -> Self {
        Self {
            inner: Arc::new(FifoInner {
                queue: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                max_size,
                max_time_depth,
            }),
        }
    }

    /// Unbounded queue
    pub fn unbounded() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn admits(&self, queue: &VecDeque<(Instant, T)>) -> bool {
        let size_ok = self.inner.max_size == 0 || queue.len() < self.inner.max_size;
        let depth_ok = self.inner.max_time_depth.is_zero()
            || queue
                .front()
                .map(|(at, _)| at.elapsed() < self.inner.max_time_depth)
                .unwrap_or(true);
        size_ok && depth_ok
    }

    /// Whether a `try_push` right now would succeed
    pub fn would_accept(&self) -> bool {
        let queue = self.inner.queue.lock();
        self.admits(&queue)
    }

    /// Queues `item` if within limits, otherwise hands it back
    pub fn try_push(&self, item: T) -> Result<(), T> {
        {
            let mut queue = self.inner.queue.lock();
            if !self.admits(&queue) {
                return Err(item);
            }
            queue.push_back((Instant::now(), item));
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Queues `item` regardless of limits
    pub fn push(&self, item: T) {
        self.inner.queue.lock().push_back((Instant::now(), item));
        self.inner.notify.notify_one();
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.queue.lock().pop_front().map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    /// Age of the oldest queued item
    pub fn time_depth(&self) -> Duration {
        self.inner
            .queue
            .lock()
            .front()
            .map(|(at, _)| at.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Waits for the next item
    pub async fn recv(&self) -> T {
        loop {
            if let Some(item) = self.pop() {
                return item;
            }
            self.inner.notify.notified().await;
        }
    }

    /// Resolves once the queue holds at least one item, without removing it
    pub async fn ready(&self) {
        while self.is_empty() {
            self.inner.notify.notified().await;
        }
        // Keep the wake-up for the consumer that actually pops.
        self.inner.notify.notify_one();
    }
}
