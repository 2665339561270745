//! Core dialog types and functionality
//!
//! - [`DialogId`]: `(Call-ID, local tag, remote tag)` identifier
//! - [`Dialog`]: per-dialog state and the in-dialog request/response builders
//! - [`TargetRefresh`]: outcome of applying an incoming in-dialog request
//! - [`DialogMessage`]: closed classification of messages the dialog layer
//!   dispatches on
//!
//! ## Dialog Lifecycle
//!
//! ```text
//!   new() ──create_as_uas / create_as_uac──► created ──clear()──► new()
//!                                              │
//!                           target_refresh_* / make_* while created
//! ```
//!
//! Dialogs are usually owned by the [`DialogManager`](crate::manager::DialogManager),
//! which hands out generation-checked handles to them.

pub mod dialog_id;
pub mod dialog_impl;
pub mod message_kind;

pub use dialog_id::DialogId;
pub use dialog_impl::{Dialog, TargetRefresh, DEFAULT_MAX_FORWARDS};
pub use message_kind::DialogMessage;
