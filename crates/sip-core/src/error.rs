use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or inspecting SIP messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A header required by the operation is absent
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// A header is present but cannot be used as requested
    #[error("Invalid header {header}: {reason}")]
    InvalidHeader {
        header: &'static str,
        reason: String,
    },

    /// The URI text could not be parsed
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Status codes must lie in 100..=699
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(u16),

    /// Unrecognised method token
    #[error("Invalid method: {0}")]
    InvalidMethod(String),
}
