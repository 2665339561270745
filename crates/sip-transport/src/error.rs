use std::net::SocketAddr;

use thiserror::Error;

use crate::transport::TransportKind;

/// A type alias for handling `Result`s with `Error` values
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the SIP transport layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The message could not be handed to the network
    #[error("Failed to send message to {destination}: {reason}")]
    SendFailed {
        destination: SocketAddr,
        reason: String,
    },

    /// Transport has been closed
    #[error("Transport closed")]
    TransportClosed,

    /// No transport of this kind is registered
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(TransportKind),

    /// Target resolution produced no usable candidate
    #[error("Failed to resolve {target}: {reason}")]
    ResolutionFailed { target: String, reason: String },

    /// Invalid transport token (e.g. in a Via)
    #[error("Invalid transport: {0}")]
    InvalidTransport(String),
}
