//! Target resolution contract
//!
//! A resolver turns a Request-URI (or top Route) into an ordered list of
//! candidate [`Target`]s. Results are never returned directly: they are pushed
//! into the caller's [`ResolutionSink`] and picked up on its next processing
//! step, so a DNS-backed implementation can answer from another task.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use sipflow_sip_core::Uri;

use crate::error::{Error, Result};
use crate::transport::{Target, TransportKind};

/// Correlates a resolution result with the request that asked for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolutionToken(pub u64);

impl fmt::Display for ResolutionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

/// Outcome of one resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub token: ResolutionToken,
    pub result: Result<Vec<Target>>,
}

/// Where resolvers deliver their results
pub type ResolutionSink = mpsc::UnboundedSender<Resolution>;

/// Asynchronous target resolution service
pub trait TargetResolver: Send + Sync + fmt::Debug {
    /// Starts resolving `uri`; the result is sent to `sink` tagged with `token`
    fn resolve(&self, uri: &Uri, token: ResolutionToken, sink: ResolutionSink);
}

/// Default port for a URI without one (RFC 3263 4.2)
fn default_port(uri: &Uri, kind: TransportKind) -> u16 {
    if uri.scheme.eq_ignore_ascii_case("sips") || matches!(kind, TransportKind::Tls | TransportKind::Wss) {
        5061
    } else {
        5060
    }
}

/// Resolver backed by a fixed host table
///
/// Hosts that are IP literals resolve to themselves, using the URI's port and
/// `transport` parameter. Everything else must be registered with
/// [`StaticResolver::insert`].
#[derive(Debug, Default)]
pub struct StaticResolver {
    table: RwLock<HashMap<String, Vec<Target>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the candidate list for a host name (case-insensitive)
    pub fn insert(&self, host: impl Into<String>, targets: Vec<Target>) {
        self.table
            .write()
            .insert(host.into().to_ascii_lowercase(), targets);
    }

    /// Synchronous lookup used by [`TargetResolver::resolve`]
    pub fn lookup(&self, uri: &Uri) -> Result<Vec<Target>> {
        if let Some(targets) = self.table.read().get(&uri.host.to_ascii_lowercase()) {
            if !targets.is_empty() {
                return Ok(targets.clone());
            }
        }

        let kind = match uri.param("transport") {
            Some(t) => t.parse()?,
            None if uri.scheme.eq_ignore_ascii_case("sips") => TransportKind::Tls,
            None => TransportKind::Udp,
        };
        let host = uri.host.trim_start_matches('[').trim_end_matches(']');
        match host.parse::<IpAddr>() {
            Ok(ip) => {
                let port = uri.port.unwrap_or_else(|| default_port(uri, kind));
                Ok(vec![Target::new(SocketAddr::new(ip, port), kind)])
            }
            Err(_) => Err(Error::ResolutionFailed {
                target: uri.to_string(),
                reason: "no entry for host".to_string(),
            }),
        }
    }
}

impl TargetResolver for StaticResolver {
    fn resolve(&self, uri: &Uri, token: ResolutionToken, sink: ResolutionSink) {
        let result = self.lookup(uri);
        debug!(%token, %uri, ok = result.is_ok(), "static resolution");
        let _ = sink.send(Resolution { token, result });
    }
}
