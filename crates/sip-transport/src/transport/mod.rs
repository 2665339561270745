//! The transport contract consumed by the transaction layer

pub mod memory;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use sipflow_sip_core::Message;

use crate::error::{Error, Result};

pub use memory::{MemoryTransport, SentMessage};

/// Transport protocol of a hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
    Sctp,
    Ws,
    Wss,
}

impl TransportKind {
    /// Reliable transports never schedule retransmission timers and use
    /// zero-length absorption timers
    pub fn is_reliable(&self) -> bool {
        !matches!(self, TransportKind::Udp)
    }

    /// Via transport token
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "UDP",
            TransportKind::Tcp => "TCP",
            TransportKind::Tls => "TLS",
            TransportKind::Sctp => "SCTP",
            TransportKind::Ws => "WS",
            TransportKind::Wss => "WSS",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UDP" => Ok(TransportKind::Udp),
            "TCP" => Ok(TransportKind::Tcp),
            "TLS" => Ok(TransportKind::Tls),
            "SCTP" => Ok(TransportKind::Sctp),
            "WS" => Ok(TransportKind::Ws),
            "WSS" => Ok(TransportKind::Wss),
            _ => Err(Error::InvalidTransport(s.to_string())),
        }
    }
}

/// A resolved next hop: where to send and over what
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub addr: SocketAddr,
    pub kind: TransportKind,
}

impl Target {
    pub fn new(addr: SocketAddr, kind: TransportKind) -> Self {
        Self { addr, kind }
    }

    pub fn udp(addr: SocketAddr) -> Self {
        Self::new(addr, TransportKind::Udp)
    }

    pub fn tcp(addr: SocketAddr) -> Self {
        Self::new(addr, TransportKind::Tcp)
    }

    pub fn is_reliable(&self) -> bool {
        self.kind.is_reliable()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.addr)
    }
}

/// Events a transport implementation hands upward
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A complete message arrived
    MessageReceived {
        message: Message,
        source: SocketAddr,
        destination: SocketAddr,
        kind: TransportKind,
    },
    /// Non-fatal transport error
    Error { error: String },
    /// Transport shut down
    Closed,
}

/// A message-oriented SIP transport
///
/// `send` must not block: implementations queue or hand the bytes to the OS
/// and return. A failed send is reported synchronously so the caller can try
/// another target.
pub trait Transport: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    fn is_reliable(&self) -> bool {
        self.kind().is_reliable()
    }

    fn local_addr(&self) -> Result<SocketAddr>;

    /// Sends a message to the destination without blocking
    fn send(&self, message: &Message, destination: SocketAddr) -> Result<()>;

    /// Hint that queued outbound data is waiting for the next processing step
    fn has_data_to_send(&self) -> bool {
        false
    }

    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}
