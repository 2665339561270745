//! SIP transaction and dialog layer for the sipflow stack
//!
//! This crate turns a message-oriented transport into RFC 3261 transactions
//! with timer-driven retransmission, and keeps the per-dialog state that spans
//! them.
//!
//! ## Modules
//!
//! - [`transaction`]: the four transaction state machines, the timer queue,
//!   FIFOs, statistics and the [`Controller`](transaction::Controller) that
//!   drives them
//! - [`dialog`]: [`Dialog`](dialog::Dialog) state and in-dialog builders
//! - [`manager`]: [`DialogManager`](manager::DialogManager), which owns dialogs
//!   behind generation-checked handles
//! - [`handle`]: the generational [`HandleRegistry`](handle::HandleRegistry)
//! - [`config`]: controller and registry settings
//! - [`errors`]: dialog-layer errors
//!
//! ## Processing model
//!
//! All transaction state is advanced by one owner, the controller, one
//! processing step at a time. Transports and the TU talk to it only through
//! FIFOs, via a cloneable [`ControllerHandle`](transaction::ControllerHandle).
//! Timers never call into state machines; expired timers are picked up by the
//! next processing step.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sipflow_dialog_core::prelude::*;
//! use sipflow_sip_core::Message;
//! use sipflow_sip_transport::MemoryTransport;
//!
//! # async fn example() {
//! sipflow_sip_core::init();
//!
//! let mut controller = Controller::new(ControllerConfig::default());
//! controller.add_transport(Arc::new(MemoryTransport::udp("127.0.0.1:5060".parse().unwrap())));
//! let handle = controller.handle();
//! tokio::spawn(controller.run());
//!
//! let mut dialogs = DialogManager::new("sip:me@127.0.0.1:5060".parse().unwrap(), RegistryConfig::default());
//! loop {
//!     match handle.next_event().await {
//!         TransactionEvent::Request { key, request, .. } => {
//!             if let Ok(InDialogOutcome::Rejected(response)) = dialogs.handle_message(Message::Request(request)) {
//!                 let _ = handle.send_response(&key, response);
//!             }
//!         }
//!         TransactionEvent::ShutdownComplete => break,
//!         _ => {}
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod dialog;
pub mod errors;
pub mod handle;
pub mod manager;
pub mod transaction;

pub use config::{ControllerConfig, RegistryConfig};
pub use dialog::{Dialog, DialogId, DialogMessage, TargetRefresh};
pub use errors::{DialogError, DialogResult};
pub use handle::{Handle, HandleRegistry, ShutdownPolicy};
pub use manager::{DialogManager, InDialogOutcome};
pub use transaction::{
    Controller, ControllerHandle, TransactionEvent, TransactionKey, TransactionState,
    TransactionStats,
};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::config::{ControllerConfig, RegistryConfig, ShutdownPolicy, TimerSettings};
    pub use crate::dialog::{Dialog, DialogId, DialogMessage, TargetRefresh};
    pub use crate::errors::{DialogError, DialogResult};
    pub use crate::handle::{Handle, HandleRegistry};
    pub use crate::manager::{DialogManager, InDialogOutcome};
    pub use crate::transaction::{
        Controller, ControllerHandle, ControllerInput, TransactionEvent, TransactionKey,
        TransactionKind, TransactionState, TransactionStats, TuCommand,
    };
}
