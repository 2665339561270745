//! In-memory transport
//!
//! Records every message it is asked to send together with its canonical wire
//! rendering, and can optionally deliver them to a peer's event channel. Sends
//! can be made to fail per destination, which is how transport-failure and
//! target fail-over paths are exercised without sockets.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use sipflow_sip_core::Message;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent, TransportKind};

/// A message handed to [`MemoryTransport::send`]
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub destination: SocketAddr,
    /// Canonical rendering at send time
    pub wire: Bytes,
}

/// Transport that keeps sent messages in memory
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<MemoryTransportInner>,
}

#[derive(Debug)]
struct MemoryTransportInner {
    kind: TransportKind,
    local_addr: SocketAddr,
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<SocketAddr>>,
    fail_all: AtomicBool,
    closed: AtomicBool,
    peer: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl MemoryTransport {
    pub fn new(kind: TransportKind, local_addr: SocketAddr) -> Self {
        Self {
            inner: Arc::new(MemoryTransportInner {
                kind,
                local_addr,
                sent: Mutex::new(Vec::new()),
                failing: Mutex::new(HashSet::new()),
                fail_all: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                peer: Mutex::new(None),
            }),
        }
    }

    pub fn udp(local_addr: SocketAddr) -> Self {
        Self::new(TransportKind::Udp, local_addr)
    }

    pub fn tcp(local_addr: SocketAddr) -> Self {
        Self::new(TransportKind::Tcp, local_addr)
    }

    /// Delivers every successfully sent message to `peer` as
    /// [`TransportEvent::MessageReceived`]
    pub fn connect_peer(&self, peer: mpsc::UnboundedSender<TransportEvent>) {
        *self.inner.peer.lock() = Some(peer);
    }

    /// Makes every send to `destination` fail
    pub fn fail_destination(&self, destination: SocketAddr) {
        self.inner.failing.lock().insert(destination);
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.inner.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Copy of everything sent so far
    pub fn sent(&self) -> Vec<SentMessage> {
        self.inner.sent.lock().clone()
    }

    /// Drains the sent log
    pub fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.inner.sent.lock())
    }

    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().len()
    }
}

impl Transport for MemoryTransport {
    fn kind(&self) -> TransportKind {
        self.inner.kind
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr)
    }

    fn send(&self, message: &Message, destination: SocketAddr) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        if self.inner.fail_all.load(Ordering::SeqCst)
            || self.inner.failing.lock().contains(&destination)
        {
            debug!(%destination, "memory transport refusing send");
            return Err(Error::SendFailed {
                destination,
                reason: "destination unreachable".to_string(),
            });
        }

        let wire = Bytes::from(message.to_string());
        trace!(%destination, bytes = wire.len(), "memory transport send {}", message.short_description());
        self.inner.sent.lock().push(SentMessage {
            message: message.clone(),
            destination,
            wire,
        });

        if let Some(peer) = self.inner.peer.lock().as_ref() {
            let _ = peer.send(TransportEvent::MessageReceived {
                message: message.clone(),
                source: self.inner.local_addr,
                destination,
                kind: self.inner.kind,
            });
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(peer) = self.inner.peer.lock().take() {
            let _ = peer.send(TransportEvent::Closed);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipflow_sip_core::{Response, StatusCode};

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_records_sent_messages() {
        let transport = MemoryTransport::udp(addr("127.0.0.1:5060"));
        let msg = Message::Response(Response::new(StatusCode::OK));
        transport.send(&msg, addr("127.0.0.1:5070")).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, addr("127.0.0.1:5070"));
        assert!(sent[0].wire.starts_with(b"SIP/2.0 200 OK"));
        assert_eq!(transport.take_sent().len(), 1);
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn test_failing_destination() {
        let transport = MemoryTransport::tcp(addr("127.0.0.1:5060"));
        transport.fail_destination(addr("10.0.0.1:5060"));
        let msg = Message::Response(Response::new(StatusCode::OK));
        assert!(matches!(
            transport.send(&msg, addr("10.0.0.1:5060")),
            Err(Error::SendFailed { .. })
        ));
        assert!(transport.send(&msg, addr("10.0.0.2:5060")).is_ok());
    }

    #[test]
    fn test_closed_transport_rejects_sends() {
        let transport = MemoryTransport::udp(addr("127.0.0.1:5060"));
        transport.close().unwrap();
        let msg = Message::Response(Response::new(StatusCode::OK));
        assert_eq!(
            transport.send(&msg, addr("127.0.0.1:5070")),
            Err(Error::TransportClosed)
        );
    }

    #[tokio::test]
    async fn test_delivers_to_peer() {
        let transport = MemoryTransport::udp(addr("127.0.0.1:5060"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.connect_peer(tx);
        let msg = Message::Response(Response::new(StatusCode::RINGING));
        transport.send(&msg, addr("127.0.0.1:5070")).unwrap();

        match rx.recv().await {
            Some(TransportEvent::MessageReceived { source, message, .. }) => {
                assert_eq!(source, addr("127.0.0.1:5060"));
                assert_eq!(message, msg);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
