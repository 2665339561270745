//! Error types for dialog-core
//!
//! Dialog and handle-registry errors live here. Transaction-layer errors are
//! in [`crate::transaction::Error`].

pub mod dialog_errors;

// Re-export main error types
pub use dialog_errors::{DialogError, DialogResult};
