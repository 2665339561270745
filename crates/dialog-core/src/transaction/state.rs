use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transaction::error::{Error, Result};

/// The four RFC 3261 transaction state machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Client INVITE transaction (RFC 3261 17.1.1)
    InviteClient,
    /// Client non-INVITE transaction (RFC 3261 17.1.2)
    NonInviteClient,
    /// Server INVITE transaction (RFC 3261 17.2.1)
    InviteServer,
    /// Server non-INVITE transaction (RFC 3261 17.2.2)
    NonInviteServer,
}

impl TransactionKind {
    pub fn is_server(&self) -> bool {
        matches!(self, TransactionKind::InviteServer | TransactionKind::NonInviteServer)
    }

    pub fn is_invite(&self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::InviteServer)
    }
}

/// Represents the state of a SIP transaction, aligned with the state machines
/// defined in RFC 3261 (Section 17).
///
/// Not every state applies to every kind: `Calling` is client INVITE only,
/// `Confirmed` is server INVITE only, and the server INVITE machine starts in
/// `Proceeding` rather than `Trying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Created, nothing sent or received yet
    Initial,
    /// Client INVITE: request sent, no response yet
    Calling,
    /// Non-INVITE: request sent (client) or received (server), no response yet
    Trying,
    /// Provisional response received (client) or sent (server)
    Proceeding,
    /// Final response received (client) or sent (server); absorbing retransmissions
    Completed,
    /// Server INVITE: ACK received for a non-2xx final response
    Confirmed,
    /// Finished; the controller reaps it on the next step
    Terminated,
}

impl TransactionState {
    pub fn is_terminated(&self) -> bool {
        *self == TransactionState::Terminated
    }

    /// Validates a transition for the given transaction kind against the
    /// RFC 3261 state diagrams.
    ///
    /// Moving to the current state is a no-op and always allowed. Any live
    /// state may move to `Terminated`; nothing leaves `Terminated`.
    pub fn validate_transition(
        kind: TransactionKind,
        current: TransactionState,
        next: TransactionState,
    ) -> Result<()> {
        use TransactionState::*;

        if current == next {
            return Ok(());
        }
        if current == Terminated {
            return Err(Error::InvalidStateTransition {
                kind,
                from: current,
                to: next,
            });
        }
        if next == Terminated {
            return Ok(());
        }

        let allowed = match kind {
            TransactionKind::InviteClient => matches!(
                (current, next),
                (Initial, Calling) | (Calling, Proceeding) | (Calling, Completed) | (Proceeding, Completed)
            ),
            TransactionKind::NonInviteClient => matches!(
                (current, next),
                (Initial, Trying) | (Trying, Proceeding) | (Trying, Completed) | (Proceeding, Completed)
            ),
            TransactionKind::InviteServer => matches!(
                (current, next),
                (Initial, Proceeding) | (Proceeding, Completed) | (Completed, Confirmed)
            ),
            TransactionKind::NonInviteServer => matches!(
                (current, next),
                (Initial, Trying) | (Trying, Proceeding) | (Trying, Completed) | (Proceeding, Completed)
            ),
        };

        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidStateTransition {
                kind,
                from: current,
                to: next,
            })
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
