//! Timer kinds and durations for the RFC 3261 transaction state machines

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The timers a transaction can schedule
///
/// Letters follow RFC 3261 Table 4. `Trying` is the 200 ms delay before an
/// INVITE server transaction sends 100 Trying on its own; `Stale` bounds how
/// long a transaction that completed with a 2xx lingers to absorb
/// retransmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimerKind {
    /// INVITE client request retransmit
    A,
    /// INVITE client timeout
    B,
    /// INVITE client wait for response retransmissions
    D,
    /// Non-INVITE client request retransmit
    E,
    /// Non-INVITE client timeout
    F,
    /// INVITE server response retransmit
    G,
    /// INVITE server wait for ACK
    H,
    /// INVITE server wait for ACK retransmissions
    I,
    /// Non-INVITE server wait for request retransmissions
    J,
    /// Non-INVITE client wait for response retransmissions
    K,
    Trying,
    Stale,
}

impl TimerKind {
    /// Retransmission timers double their interval every time they fire
    pub fn is_retransmit(&self) -> bool {
        matches!(self, TimerKind::A | TimerKind::E | TimerKind::G)
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::A => "A",
            TimerKind::B => "B",
            TimerKind::D => "D",
            TimerKind::E => "E",
            TimerKind::F => "F",
            TimerKind::G => "G",
            TimerKind::H => "H",
            TimerKind::I => "I",
            TimerKind::J => "J",
            TimerKind::K => "K",
            TimerKind::Trying => "Trying",
            TimerKind::Stale => "Stale",
        };
        f.write_str(name)
    }
}

/// Base timer values and the long timeouts derived from them
///
/// Defaults are the RFC 3261 values: T1 = 500 ms, T2 = 4 s, T4 = 5 s,
/// B = F = H = 64*T1, D = 32 s. The absorption timers D, I, J and K collapse to
/// zero on reliable transports; see [`TimerSettings::timer_d`] and friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// RTT estimate
    pub t1: Duration,
    /// Cap on retransmit intervals of non-INVITE requests and INVITE responses
    pub t2: Duration,
    /// Maximum time a message stays in the network
    pub t4: Duration,
    /// Delay before an INVITE server transaction sends 100 Trying
    pub t100: Duration,
    /// INVITE client transaction timeout
    pub timer_b: Duration,
    /// INVITE client wait time on unreliable transports
    pub timer_d: Duration,
    /// Non-INVITE client transaction timeout
    pub timer_f: Duration,
    /// INVITE server wait for ACK
    pub timer_h: Duration,
    /// Lifetime of a transaction that completed with a 2xx
    pub stale: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        let t1 = Duration::from_millis(500);
        Self {
            t1,
            t2: Duration::from_secs(4),
            t4: Duration::from_secs(5),
            t100: Duration::from_millis(200),
            timer_b: t1 * 64,
            timer_d: Duration::from_secs(32),
            timer_f: t1 * 64,
            timer_h: t1 * 64,
            stale: t1 * 64,
        }
    }
}

impl TimerSettings {
    /// Sets T1 and rescales every timer defined as a multiple of it
    pub fn with_t1(mut self, t1: Duration) -> Self {
        self.t1 = t1;
        self.timer_b = t1 * 64;
        self.timer_f = t1 * 64;
        self.timer_h = t1 * 64;
        self.stale = t1 * 64;
        self
    }

    pub fn with_t2(mut self, t2: Duration) -> Self {
        self.t2 = t2;
        self
    }

    pub fn with_t4(mut self, t4: Duration) -> Self {
        self.t4 = t4;
        self
    }

    pub fn timer_d(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.timer_d
        }
    }

    pub fn timer_i(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.t4
        }
    }

    pub fn timer_j(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.t1 * 64
        }
    }

    pub fn timer_k(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.t4
        }
    }

    /// Next retransmit interval: doubled, capped at T2 when `capped`
    pub fn next_retransmit(&self, current: Duration, capped: bool) -> Duration {
        let doubled = current * 2;
        if capped {
            doubled.min(self.t2)
        } else {
            doubled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3261_defaults() {
        let s = TimerSettings::default();
        assert_eq!(s.t1, Duration::from_millis(500));
        assert_eq!(s.t2, Duration::from_secs(4));
        assert_eq!(s.t4, Duration::from_secs(5));
        assert_eq!(s.timer_b, Duration::from_secs(32));
        assert_eq!(s.timer_f, Duration::from_secs(32));
        assert_eq!(s.timer_h, Duration::from_secs(32));
        assert_eq!(s.timer_d(false), Duration::from_secs(32));
    }

    #[test]
    fn test_reliable_transports_zero_absorption_timers() {
        let s = TimerSettings::default();
        assert_eq!(s.timer_d(true), Duration::ZERO);
        assert_eq!(s.timer_i(true), Duration::ZERO);
        assert_eq!(s.timer_j(true), Duration::ZERO);
        assert_eq!(s.timer_k(true), Duration::ZERO);
        assert_eq!(s.timer_i(false), s.t4);
        assert_eq!(s.timer_j(false), Duration::from_secs(32));
    }

    #[test]
    fn test_with_t1_rescales() {
        let s = TimerSettings::default().with_t1(Duration::from_millis(100));
        assert_eq!(s.timer_b, Duration::from_millis(6400));
        assert_eq!(s.timer_f, Duration::from_millis(6400));
        // D is absolute, not a multiple of T1
        assert_eq!(s.timer_d, Duration::from_secs(32));
    }

    #[test]
    fn test_next_retransmit() {
        let s = TimerSettings::default();
        assert_eq!(s.next_retransmit(Duration::from_secs(2), false), Duration::from_secs(4));
        assert_eq!(s.next_retransmit(Duration::from_secs(4), false), Duration::from_secs(8));
        assert_eq!(s.next_retransmit(Duration::from_secs(4), true), Duration::from_secs(4));
        assert_eq!(TimerKind::Trying.to_string(), "Trying");
        assert!(TimerKind::G.is_retransmit());
        assert!(!TimerKind::B.is_retransmit());
    }
}
