//! Dialog-layer errors
//!
//! These are the programmer-error classes of the dialog layer: using a stale
//! handle, creating a dialog twice, calling a builder before the dialog exists.
//! Protocol-level outcomes such as a CSeq regression are not errors; see
//! [`TargetRefresh`](crate::dialog::TargetRefresh).

use thiserror::Error;

/// Result type for dialog operations
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors raised by the dialog layer and the handle registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    /// The handle's slot was removed or reused
    #[error("Stale handle: index {index}, generation {generation}")]
    StaleHandle { index: u32, generation: u32 },

    /// `create_as_uas` on a dialog that already exists
    #[error("Dialog already created: {dialog_id}")]
    DuplicateDialogCreation { dialog_id: String },

    /// A builder or accessor needs a created dialog
    #[error("Dialog has not been created")]
    DialogNotCreated,

    /// The request is not valid for the requested operation
    #[error("Invalid request for {operation}: {reason}")]
    InvalidRequest {
        operation: &'static str,
        reason: String,
    },

    /// A header needed to create or update the dialog is absent
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// The response's To header already carries a different tag
    #[error("To header already tagged with {existing}")]
    AlreadyTagged { existing: String },

    /// The registry no longer hands out handles
    #[error("Handle registry has been shut down")]
    RegistryShutdown,

    /// Shutdown found live handles under the fault policy
    #[error("{count} live handles at registry shutdown")]
    LiveHandlesAtShutdown { count: usize },

    /// Error from the message model
    #[error("SIP core error: {0}")]
    SipCore(#[from] sipflow_sip_core::Error),
}

impl DialogError {
    pub fn invalid_request(operation: &'static str, reason: impl Into<String>) -> Self {
        DialogError::InvalidRequest {
            operation,
            reason: reason.into(),
        }
    }
}
