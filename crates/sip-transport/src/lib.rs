//! SIP transport contracts for the sipflow stack
//!
//! This crate defines what the transaction layer needs from the network: a
//! non-blocking, message-oriented [`Transport`], the [`Target`] a message is
//! sent to, and an asynchronous [`TargetResolver`]. Socket-level transports
//! live outside this crate; [`MemoryTransport`] is provided for tests and
//! in-process wiring.

mod error;
pub mod resolver;
pub mod transport;

pub use error::{Error, Result};
pub use resolver::{Resolution, ResolutionSink, ResolutionToken, StaticResolver, TargetResolver};
pub use transport::{MemoryTransport, SentMessage, Target, Transport, TransportEvent, TransportKind};

/// Re-export of common types for easier use
pub mod prelude {
    pub use super::{
        Error, MemoryTransport, Resolution, ResolutionSink, ResolutionToken, Result, SentMessage,
        StaticResolver, Target, TargetResolver, Transport, TransportEvent, TransportKind,
    };
}
