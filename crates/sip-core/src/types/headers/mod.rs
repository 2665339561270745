//! # SIP Headers
//!
//! Header names, the process-wide header dictionary, typed header values and
//! the [`HeaderAccess`] trait that gives requests and responses the typed
//! accessors the transaction and dialog layers read.

pub mod header_name;
pub mod typed_header;

pub use header_name::{HeaderDictionary, HeaderName};
pub use typed_header::TypedHeader;

use crate::error::{Error, Result};
use crate::types::address::Address;
use crate::types::cseq::CSeq;
use crate::types::via::Via;

/// Typed access to the header list of a message
///
/// Implementors only provide the raw header vector; everything else is
/// derived. Accessors return `None` (or an empty list) for absent headers;
/// the `require_*` variants turn absence into [`Error::MissingHeader`].
pub trait HeaderAccess {
    fn headers(&self) -> &[TypedHeader];
    fn headers_mut(&mut self) -> &mut Vec<TypedHeader>;

    /// First header with the given name
    fn header(&self, name: &HeaderName) -> Option<&TypedHeader> {
        self.headers().iter().find(|h| &h.name() == name)
    }

    fn has_header(&self, name: &HeaderName) -> bool {
        self.header(name).is_some()
    }

    /// Appends a header line
    fn push_header(&mut self, header: TypedHeader) {
        self.headers_mut().push(header);
    }

    /// Replaces every line with this header's name by `header`, keeping the
    /// position of the first one
    fn set_header(&mut self, header: TypedHeader) {
        let name = header.name();
        let headers = self.headers_mut();
        match headers.iter().position(|h| h.name() == name) {
            Some(pos) => {
                headers[pos] = header;
                let mut idx = 0;
                headers.retain(|h| {
                    let keep = idx <= pos || h.name() != name;
                    idx += 1;
                    keep
                });
            }
            None => headers.push(header),
        }
    }

    fn remove_headers(&mut self, name: &HeaderName) {
        self.headers_mut().retain(|h| &h.name() != name);
    }

    /// All Via values, top first
    fn vias(&self) -> Vec<&Via> {
        self.headers()
            .iter()
            .filter_map(|h| match h {
                TypedHeader::Via(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn first_via(&self) -> Option<&Via> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::Via(v) => Some(v),
            _ => None,
        })
    }

    fn first_via_mut(&mut self) -> Option<&mut Via> {
        self.headers_mut().iter_mut().find_map(|h| match h {
            TypedHeader::Via(v) => Some(v),
            _ => None,
        })
    }

    fn from_address(&self) -> Option<&Address> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::From(a) => Some(a),
            _ => None,
        })
    }

    fn to_address(&self) -> Option<&Address> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::To(a) => Some(a),
            _ => None,
        })
    }

    fn to_address_mut(&mut self) -> Option<&mut Address> {
        self.headers_mut().iter_mut().find_map(|h| match h {
            TypedHeader::To(a) => Some(a),
            _ => None,
        })
    }

    fn from_tag(&self) -> Option<&str> {
        self.from_address().and_then(Address::tag)
    }

    fn to_tag(&self) -> Option<&str> {
        self.to_address().and_then(Address::tag)
    }

    fn call_id(&self) -> Option<&str> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::CallId(c) => Some(c.as_str()),
            _ => None,
        })
    }

    fn cseq(&self) -> Option<&CSeq> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::CSeq(c) => Some(c),
            _ => None,
        })
    }

    /// All Contact values across Contact lines
    fn contacts(&self) -> Vec<&Address> {
        self.headers()
            .iter()
            .filter_map(|h| match h {
                TypedHeader::Contact(l) => Some(l.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Record-Route values in received order
    fn record_route(&self) -> Vec<&Address> {
        self.headers()
            .iter()
            .filter_map(|h| match h {
                TypedHeader::RecordRoute(l) => Some(l.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Route values in order
    fn route(&self) -> Vec<&Address> {
        self.headers()
            .iter()
            .filter_map(|h| match h {
                TypedHeader::Route(l) => Some(l.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn max_forwards(&self) -> Option<u8> {
        self.headers().iter().find_map(|h| match h {
            TypedHeader::MaxForwards(n) => Some(*n),
            _ => None,
        })
    }

    fn require_call_id(&self) -> Result<&str> {
        self.call_id().ok_or(Error::MissingHeader("Call-ID"))
    }

    fn require_cseq(&self) -> Result<&CSeq> {
        self.cseq().ok_or(Error::MissingHeader("CSeq"))
    }

    fn require_from(&self) -> Result<&Address> {
        self.from_address().ok_or(Error::MissingHeader("From"))
    }

    fn require_to(&self) -> Result<&Address> {
        self.to_address().ok_or(Error::MissingHeader("To"))
    }

    fn require_first_via(&self) -> Result<&Via> {
        self.first_via().ok_or(Error::MissingHeader("Via"))
    }
}
