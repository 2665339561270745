//! Transaction timers
//!
//! RFC 3261 defines the timers that drive retransmission, timeout and
//! absorption in the four transaction state machines:
//!
//! ## Client Transaction Timers
//! - **Timer A** (INVITE): request retransmissions, unreliable transports only
//! - **Timer B** (INVITE): transaction timeout
//! - **Timer D** (INVITE): wait time for response retransmissions
//! - **Timer E** (non-INVITE): request retransmissions
//! - **Timer F** (non-INVITE): transaction timeout
//! - **Timer K** (non-INVITE): wait time for response retransmissions
//!
//! ## Server Transaction Timers
//! - **Timer G** (INVITE): response retransmissions
//! - **Timer H** (INVITE): wait time for ACK
//! - **Timer I** (INVITE): wait time in Confirmed state
//! - **Timer J** (non-INVITE): wait time for request retransmissions
//!
//! Timers are data in a [`TimerQueue`] owned by the controller rather than
//! tasks of their own, so a whole transaction run can be replayed
//! deterministically against a paused clock.

pub mod queue;
pub mod types;

pub use queue::{FiredTimer, TimerId, TimerQueue};
pub use types::{TimerKind, TimerSettings};
