use thiserror::Error;

use crate::transaction::key::TransactionKey;
use crate::transaction::state::{TransactionKind, TransactionState};

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the transaction controller to its callers
///
/// Protocol outcomes (timeouts, transport failures, unmatched CANCELs) are not
/// errors; they reach the TU as [`TransactionEvent`](crate::transaction::TransactionEvent)s.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Shutdown was requested; no new transactions are accepted
    #[error("Transaction layer is shutting down")]
    ShutdownInProgress,

    /// Transaction with the given key already exists.
    #[error("Transaction already exists: {0}")]
    TransactionExists(TransactionKey),

    /// Transaction not found for the given key.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionKey),

    /// Inbound FIFO is over its size or time-depth limit
    #[error("Inbound queue full, message not admitted")]
    NotAdmitted,

    /// Outbound request without an RFC 3261 branch on its top Via
    #[error("Request has no RFC 3261 branch on its top Via")]
    MissingBranch,

    /// Invalid transaction state transition attempted.
    #[error("Invalid transition for {kind:?}: {from:?} -> {to:?}")]
    InvalidStateTransition {
        kind: TransactionKind,
        from: TransactionState,
        to: TransactionState,
    },

    /// Error originating from the sip-transport crate.
    #[error("SIP transport error: {0}")]
    Transport(#[from] sipflow_sip_transport::Error),

    /// Error originating from the sip-core crate
    #[error("SIP core error: {0}")]
    SipCore(#[from] sipflow_sip_core::Error),
}
