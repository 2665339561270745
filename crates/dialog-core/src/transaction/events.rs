//! Messages crossing the transaction layer's boundaries
//!
//! Three queues connect the controller to the outside world:
//!
//! ```text
//!  transport ──ControllerInput──▶ ┌────────────┐ ──TransactionEvent──▶ TU
//!  resolver  ──ControllerInput──▶ │ Controller │
//!  TU        ──TuCommand────────▶ └────────────┘
//! ```
//!
//! Everything the TU needs to react to, including timeouts and transport
//! failures, arrives as a [`TransactionEvent`].

use std::net::SocketAddr;

use sipflow_sip_core::{Message, Method, Request, Response};
use sipflow_sip_transport::{Resolution, Target, TransportKind};

use crate::transaction::key::TransactionKey;

/// Events delivered to the transaction user
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// A new request created a server transaction
    Request {
        key: TransactionKey,
        request: Request,
        source: SocketAddr,
    },

    /// A response for a client transaction. Provisional responses, the final
    /// response and retransmitted 2xx responses to INVITE are all forwarded.
    Response {
        key: TransactionKey,
        response: Response,
    },

    /// An ACK that belongs to the dialog layer (ACK for a 2xx)
    AckFor2xx {
        request: Request,
        source: SocketAddr,
    },

    /// A CANCEL matched a pending INVITE server transaction and was answered
    /// with 200 OK. The TU decides whether to send 487 on the INVITE.
    Cancel {
        invite_key: TransactionKey,
        cancel: Request,
    },

    /// Timer B, F or H fired. Reported once per transaction.
    Timeout {
        key: TransactionKey,
        method: Method,
    },

    /// Every candidate target refused the message
    TransportFailure {
        key: TransactionKey,
        reason: String,
    },

    /// Shutdown was requested and every transaction has drained
    ShutdownComplete,
}

impl TransactionEvent {
    pub fn key(&self) -> Option<&TransactionKey> {
        match self {
            TransactionEvent::Request { key, .. }
            | TransactionEvent::Response { key, .. }
            | TransactionEvent::Timeout { key, .. }
            | TransactionEvent::TransportFailure { key, .. } => Some(key),
            TransactionEvent::Cancel { invite_key, .. } => Some(invite_key),
            TransactionEvent::AckFor2xx { .. } | TransactionEvent::ShutdownComplete => None,
        }
    }
}

/// Work arriving on the controller's inbound FIFO
#[derive(Debug, Clone)]
pub enum ControllerInput {
    /// A message from a transport
    Wire {
        message: Message,
        source: SocketAddr,
        kind: TransportKind,
    },
    /// Candidates for a client transaction that was waiting on resolution
    TargetsResolved(Resolution),
}

/// Work submitted by the transaction user
#[derive(Debug, Clone)]
pub enum TuCommand {
    /// Start a client transaction. `ACK` is sent statelessly.
    SendRequest {
        key: TransactionKey,
        request: Request,
        target: Option<Target>,
    },
    /// Send a response on a server transaction
    SendResponse {
        key: TransactionKey,
        response: Response,
    },
}
