//! Transaction-layer statistics
//!
//! The controller counts into a private [`TransactionStats`] while it
//! processes. Every `stats_interval` the counters are copied into a snapshot
//! behind a lock; readers on other threads only ever see that copy through a
//! [`StatsHandle`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::trace;

use sipflow_sip_core::{Message, Method};

/// Sent / received / retransmitted counters for one method or status code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub sent: u64,
    pub received: u64,
    pub retransmitted: u64,
}

/// A point-in-time copy of the transaction layer's counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    /// When this snapshot was published
    pub timestamp: DateTime<Utc>,
    /// Requests by method name
    pub requests: BTreeMap<String, MessageCounts>,
    /// Responses by status code
    pub responses: BTreeMap<u16, MessageCounts>,
    pub active_timers: usize,
    pub active_client_transactions: usize,
    pub active_server_transactions: usize,
    pub unmatched_cancels: u64,
    /// New requests refused because the TU FIFO was full
    pub tu_fifo_drops: u64,
    /// Responses that matched no client transaction
    pub stray_responses: u64,
    pub timeouts: u64,
    pub transport_failures: u64,
}

impl Default for TransactionStats {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            requests: BTreeMap::new(),
            responses: BTreeMap::new(),
            active_timers: 0,
            active_client_transactions: 0,
            active_server_transactions: 0,
            unmatched_cancels: 0,
            tu_fifo_drops: 0,
            stray_responses: 0,
            timeouts: 0,
            transport_failures: 0,
        }
    }
}

impl TransactionStats {
    pub fn requests_for(&self, method: &Method) -> MessageCounts {
        self.requests
            .get(method.as_str())
            .copied()
            .unwrap_or_default()
    }

    pub fn responses_for(&self, code: u16) -> MessageCounts {
        self.responses.get(&code).copied().unwrap_or_default()
    }

    fn counts_for(&mut self, message: &Message) -> &mut MessageCounts {
        match message {
            Message::Request(r) => self
                .requests
                .entry(r.method().as_str().to_string())
                .or_default(),
            Message::Response(r) => self.responses.entry(r.status_code()).or_default(),
        }
    }
}

/// Read side of the published snapshot
#[derive(Debug, Clone)]
pub struct StatsHandle {
    published: Arc<Mutex<TransactionStats>>,
}

impl StatsHandle {
    /// Copy of the last published snapshot
    pub fn snapshot(&self) -> TransactionStats {
        self.published.lock().clone()
    }
}

/// Counts transaction-layer activity and publishes periodic snapshots
#[derive(Debug)]
pub struct StatisticsManager {
    working: TransactionStats,
    published: Arc<Mutex<TransactionStats>>,
    interval: Duration,
    last_publish: Option<Instant>,
}

impl StatisticsManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            working: TransactionStats::default(),
            published: Arc::new(Mutex::new(TransactionStats::default())),
            interval,
            last_publish: None,
        }
    }

    pub fn handle(&self) -> StatsHandle {
        StatsHandle {
            published: self.published.clone(),
        }
    }

    /// Counters as of now, unpublished
    pub fn current(&self) -> &TransactionStats {
        &self.working
    }

    pub fn sent(&mut self, message: &Message, retransmission: bool) {
        let counts = self.working.counts_for(message);
        if retransmission {
            counts.retransmitted += 1;
        } else {
            counts.sent += 1;
        }
    }

    pub fn received(&mut self, message: &Message) {
        self.working.counts_for(message).received += 1;
    }

    pub fn unmatched_cancel(&mut self) {
        self.working.unmatched_cancels += 1;
    }

    pub fn tu_fifo_drop(&mut self) {
        self.working.tu_fifo_drops += 1;
    }

    pub fn stray_response(&mut self) {
        self.working.stray_responses += 1;
    }

    pub fn timeout(&mut self) {
        self.working.timeouts += 1;
    }

    pub fn transport_failure(&mut self) {
        self.working.transport_failures += 1;
    }

    pub fn set_active(&mut self, timers: usize, clients: usize, servers: usize) {
        self.working.active_timers = timers;
        self.working.active_client_transactions = clients;
        self.working.active_server_transactions = servers;
    }

    /// Publishes if `stats_interval` has passed since the last publish.
    /// The first call always publishes.
    pub fn maybe_publish(&mut self, now: Instant) -> bool {
        let due = match self.last_publish {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.publish(now);
        }
        due
    }

    /// Copies the working counters into the shared snapshot
    pub fn publish(&mut self, now: Instant) {
        self.working.timestamp = Utc::now();
        *self.published.lock() = self.working.clone();
        self.last_publish = Some(now);
        trace!(
            timers = self.working.active_timers,
            clients = self.working.active_client_transactions,
            servers = self.working.active_server_transactions,
            "published transaction stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipflow_sip_core::{Request, Response, StatusCode, Uri};

    #[test]
    fn test_counts_by_method_and_status() {
        let mut stats = StatisticsManager::new(Duration::from_secs(60));
        let invite = Message::Request(Request::new(Method::Invite, Uri::sip("example.com")));
        let ringing = Message::Response(Response::new(StatusCode::RINGING));

        stats.sent(&invite, false);
        stats.sent(&invite, true);
        stats.sent(&invite, true);
        stats.received(&ringing);

        let current = stats.current();
        assert_eq!(
            current.requests_for(&Method::Invite),
            MessageCounts {
                sent: 1,
                received: 0,
                retransmitted: 2
            }
        );
        assert_eq!(current.responses_for(180).received, 1);
        assert_eq!(current.responses_for(200), MessageCounts::default());
    }

    #[test]
    fn test_publish_interval() {
        let mut stats = StatisticsManager::new(Duration::from_secs(60));
        let handle = stats.handle();
        let start = Instant::now();

        stats.unmatched_cancel();
        assert!(stats.maybe_publish(start));
        assert_eq!(handle.snapshot().unmatched_cancels, 1);

        stats.unmatched_cancel();
        assert!(!stats.maybe_publish(start + Duration::from_secs(30)));
        assert_eq!(handle.snapshot().unmatched_cancels, 1);

        assert!(stats.maybe_publish(start + Duration::from_secs(60)));
        assert_eq!(handle.snapshot().unmatched_cancels, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut stats = StatisticsManager::new(Duration::from_secs(1));
        stats.set_active(3, 1, 2);
        stats.publish(Instant::now());
        let json = serde_json::to_value(stats.handle().snapshot()).unwrap();
        assert_eq!(json["active_timers"], 3);
        assert_eq!(json["active_server_transactions"], 2);
    }
}
