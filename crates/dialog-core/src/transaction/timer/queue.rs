//! Deadline-ordered timer queue owned by the transaction controller
//!
//! Timers are plain data: scheduling one records `(deadline, key, kind)` and
//! returns a [`TimerId`]. Nothing fires on its own; the controller asks for
//! [`TimerQueue::pop_expired`] on every processing step and for
//! [`TimerQueue::time_until_next`] to know how long it may sleep.
//!
//! Cancellation is lazy. A cancelled entry stays in the heap until it reaches
//! the front, where it is discarded without being reported.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::transaction::key::TransactionKey;
use crate::transaction::timer::TimerKind;

/// Identifies one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// A timer whose deadline has passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer {
    pub key: TransactionKey,
    pub kind: TimerKind,
    pub id: TimerId,
    /// Duration the timer was scheduled with; retransmit timers double it
    pub duration: Duration,
}

#[derive(Debug)]
struct Entry {
    deadline: Instant,
    id: TimerId,
    key: TransactionKey,
    kind: TimerKind,
    duration: Duration,
}

// Ordering uses (deadline, id) only: equal deadlines fire in scheduling order.
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Min-heap of pending transaction timers
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    live: HashSet<TimerId>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` for `key` to fire `duration` after `now`
    pub fn schedule(
        &mut self,
        now: Instant,
        key: TransactionKey,
        kind: TimerKind,
        duration: Duration,
    ) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.live.insert(id);
        self.heap.push(Reverse(Entry {
            deadline: now + duration,
            id,
            key,
            kind,
            duration,
        }));
        id
    }

    /// Cancels a pending timer. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.live.contains(&id)
    }

    /// Number of timers still pending
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn discard_cancelled(&mut self) {
        while let Some(Reverse(head)) = self.heap.peek() {
            if self.live.contains(&head.id) {
                break;
            }
            self.heap.pop();
        }
    }

    /// Time until the earliest pending timer, zero if one is already due
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        self.discard_cancelled();
        self.heap
            .peek()
            .map(|Reverse(head)| head.deadline.saturating_duration_since(now))
    }

    /// Removes and returns every pending timer with a deadline at or before
    /// `now`, earliest first
    pub fn pop_expired(&mut self, now: Instant) -> Vec<FiredTimer> {
        let mut fired = Vec::new();
        loop {
            self.discard_cancelled();
            match self.heap.peek() {
                Some(Reverse(head)) if head.deadline <= now => {}
                _ => break,
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                self.live.remove(&entry.id);
                fired.push(FiredTimer {
                    key: entry.key,
                    kind: entry.kind,
                    id: entry.id,
                    duration: entry.duration,
                });
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipflow_sip_core::Method;

    fn key(branch: &str) -> TransactionKey {
        TransactionKey::new(branch, Method::Invite, false)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(now, key("z9hG4bK2"), TimerKind::B, Duration::from_secs(32));
        q.schedule(now, key("z9hG4bK1"), TimerKind::A, Duration::from_millis(500));

        assert_eq!(q.time_until_next(now), Some(Duration::from_millis(500)));
        assert!(q.pop_expired(now).is_empty());

        let fired = q.pop_expired(now + Duration::from_millis(500));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, TimerKind::A);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_equal_deadlines_fire_in_schedule_order() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        let first = q.schedule(now, key("z9hG4bKa"), TimerKind::E, Duration::ZERO);
        let second = q.schedule(now, key("z9hG4bKb"), TimerKind::F, Duration::ZERO);
        let fired = q.pop_expired(now);
        assert_eq!(fired.iter().map(|t| t.id).collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        let id = q.schedule(now, key("z9hG4bK1"), TimerKind::A, Duration::from_millis(10));
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert!(q.pop_expired(now + Duration::from_secs(1)).is_empty());
        assert_eq!(q.time_until_next(now), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_overdue_timer_reports_zero_wait() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(now, key("z9hG4bK1"), TimerKind::K, Duration::from_millis(10));
        assert_eq!(q.time_until_next(now + Duration::from_secs(1)), Some(Duration::ZERO));
    }
}
