//! # SIP Transaction Layer
//!
//! RFC 3261 Section 17 transactions, driven by a single [`Controller`].
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────────── TU (dialog layer) ──────────────┐
//!  │  TransactionEvent ▲          │ TuCommand       │
//!  └───────────────────┼──────────┼────────────────┘
//!                 tu FIFO     command FIFO
//!  ┌───────────────────┴──────────▼────────────────┐
//!  │ Controller: client/server tables, TimerQueue, │
//!  │ statistics, one processing step per wake-up   │
//!  └───────────────────▲──────────┬────────────────┘
//!                inbound FIFO     │ Transport::send
//!  ┌───────────────────┴──────────▼────────────────┐
//!  │            Transport / TargetResolver         │
//!  └───────────────────────────────────────────────┘
//! ```
//!
//! The four state machines ([`client::ClientInviteTransaction`],
//! [`client::ClientNonInviteTransaction`], [`server::ServerInviteTransaction`],
//! [`server::ServerNonInviteTransaction`]) perform no I/O. They record what
//! should be sent or reported in a [`logic::TransactionContext`], and the
//! controller carries it out.
//!
//! ## Matching
//!
//! Keys come from the top Via branch and the CSeq method
//! ([`TransactionKey`]). ACK for a non-2xx final response matches the INVITE
//! server transaction; ACK for a 2xx is passed to the TU. Requests from peers
//! without RFC 3261 branches fall back to a key built from Call-ID, CSeq,
//! From tag and sent-by.

pub mod client;
pub mod controller;
pub mod error;
pub mod events;
pub mod fifo;
pub mod key;
pub mod logic;
pub mod server;
pub mod state;
pub mod stats;
pub mod timer;
pub mod utils;

pub use controller::{Controller, ControllerHandle};
pub use error::{Error, Result};
pub use events::{ControllerInput, TransactionEvent, TuCommand};
pub use fifo::TimeLimitFifo;
pub use key::TransactionKey;
pub use state::{TransactionKind, TransactionState};
pub use stats::{MessageCounts, StatisticsManager, StatsHandle, TransactionStats};
pub use timer::{TimerKind, TimerSettings};
