use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// SIP header names known to the transaction and dialog layers
///
/// Header names are case-insensitive in SIP. Standard headers keep their
/// canonical capitalization; compact forms (`v`, `f`, `t`, `i`, `m`, `l`,
/// `c`, `r`, `b`) resolve to the same variant. Anything else is carried as
/// [`HeaderName::Other`].
///
/// # Examples
///
/// ```rust
/// use sipflow_sip_core::prelude::*;
/// use std::str::FromStr;
///
/// assert_eq!(HeaderName::from_str("f").unwrap(), HeaderName::From);
/// assert_eq!(HeaderName::from_str("call-id").unwrap(), HeaderName::CallId);
/// assert_eq!(
///     HeaderName::from_str("X-Custom").unwrap(),
///     HeaderName::Other("X-Custom".to_string())
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderName {
    /// Via: Path taken by the request so far
    Via,
    /// From: Initiator of the request
    From,
    /// To: Logical recipient of the request
    To,
    /// Call-ID: Unique identifier for this call
    CallId,
    /// CSeq: Command sequence number
    CSeq,
    /// Contact: Where subsequent requests should be sent
    Contact,
    /// Route: Forced route for a request
    Route,
    /// Record-Route: Proxies that want to stay in the path
    RecordRoute,
    /// Max-Forwards: Limit on the number of hops
    MaxForwards,
    /// Authorization: Credentials provided by a UA
    Authorization,
    /// Proxy-Authorization: Credentials for a proxy
    ProxyAuthorization,
    /// Refer-To: Target URI in REFER
    ReferTo,
    /// Referred-By: Identity of the referrer
    ReferredBy,
    /// Retry-After: When to retry
    RetryAfter,
    /// Content-Type: Media type of the body
    ContentType,
    /// Content-Length: Size of the body
    ContentLength,
    /// Any other header
    Other(String),
}

impl HeaderName {
    /// Canonical name
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Via => "Via",
            HeaderName::From => "From",
            HeaderName::To => "To",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Contact => "Contact",
            HeaderName::Route => "Route",
            HeaderName::RecordRoute => "Record-Route",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::Authorization => "Authorization",
            HeaderName::ProxyAuthorization => "Proxy-Authorization",
            HeaderName::ReferTo => "Refer-To",
            HeaderName::ReferredBy => "Referred-By",
            HeaderName::RetryAfter => "Retry-After",
            HeaderName::ContentType => "Content-Type",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::Other(name) => name,
        }
    }

    /// Compact form, where RFC 3261 / 3515 define one
    pub fn compact_form(&self) -> Option<&'static str> {
        match self {
            HeaderName::Via => Some("v"),
            HeaderName::From => Some("f"),
            HeaderName::To => Some("t"),
            HeaderName::CallId => Some("i"),
            HeaderName::Contact => Some("m"),
            HeaderName::ContentLength => Some("l"),
            HeaderName::ContentType => Some("c"),
            HeaderName::ReferTo => Some("r"),
            HeaderName::ReferredBy => Some("b"),
            _ => None,
        }
    }

    fn standard() -> [HeaderName; 16] {
        [
            HeaderName::Via,
            HeaderName::From,
            HeaderName::To,
            HeaderName::CallId,
            HeaderName::CSeq,
            HeaderName::Contact,
            HeaderName::Route,
            HeaderName::RecordRoute,
            HeaderName::MaxForwards,
            HeaderName::Authorization,
            HeaderName::ProxyAuthorization,
            HeaderName::ReferTo,
            HeaderName::ReferredBy,
            HeaderName::RetryAfter,
            HeaderName::ContentType,
            HeaderName::ContentLength,
        ]
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == ':') {
            return Err(Error::InvalidHeader {
                header: "header-name",
                reason: format!("'{}' is not a token", s),
            });
        }
        Ok(HeaderDictionary::global()
            .lookup(s)
            .cloned()
            .unwrap_or_else(|| HeaderName::Other(s.to_string())))
    }
}

static DICTIONARY: OnceCell<HeaderDictionary> = OnceCell::new();

/// Process-wide, read-only name → [`HeaderName`] table
///
/// Built once, either explicitly through [`HeaderDictionary::install`] during
/// start-up or lazily on first lookup. There is no way to mutate it afterwards.
#[derive(Debug)]
pub struct HeaderDictionary {
    by_name: HashMap<String, HeaderName>,
}

impl HeaderDictionary {
    fn build() -> Self {
        let mut by_name = HashMap::new();
        for name in HeaderName::standard() {
            by_name.insert(name.as_str().to_ascii_lowercase(), name.clone());
            if let Some(compact) = name.compact_form() {
                by_name.insert(compact.to_string(), name);
            }
        }
        Self { by_name }
    }

    /// Builds the dictionary. Returns `false` if it was already installed.
    pub fn install() -> bool {
        let mut installed = false;
        DICTIONARY.get_or_init(|| {
            installed = true;
            let dict = Self::build();
            debug!(entries = dict.by_name.len(), "header dictionary installed");
            dict
        });
        installed
    }

    pub fn is_installed() -> bool {
        DICTIONARY.get().is_some()
    }

    /// The installed dictionary, building it on first use
    pub fn global() -> &'static HeaderDictionary {
        DICTIONARY.get_or_init(Self::build)
    }

    /// Case-insensitive lookup, including compact forms
    pub fn lookup(&self, name: &str) -> Option<&HeaderName> {
        if let Some(found) = self.by_name.get(name) {
            return Some(found);
        }
        self.by_name.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}
