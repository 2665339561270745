use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::number::{retry_after, unsigned};
use crate::parser::parse_complete;
use crate::types::address::{parse_address_list, Address};
use crate::types::cseq::CSeq;
use crate::types::headers::header_name::HeaderName;
use crate::types::via::Via;

/// A header with a parsed, strongly typed value
///
/// Multi-valued headers (Contact, Route, Record-Route) hold every value of one
/// header line. A message may carry several lines of the same name; accessors
/// on [`HeaderAccess`](crate::types::headers::HeaderAccess) flatten them in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedHeader {
    Via(Via),
    From(Address),
    To(Address),
    CallId(String),
    CSeq(CSeq),
    Contact(Vec<Address>),
    Route(Vec<Address>),
    RecordRoute(Vec<Address>),
    MaxForwards(u8),
    Authorization(String),
    ProxyAuthorization(String),
    ReferTo(Address),
    ReferredBy(Address),
    /// Seconds
    RetryAfter(u32),
    ContentType(String),
    /// Header kept as raw text
    Other(HeaderName, String),
}

impl TypedHeader {
    pub fn name(&self) -> HeaderName {
        match self {
            TypedHeader::Via(_) => HeaderName::Via,
            TypedHeader::From(_) => HeaderName::From,
            TypedHeader::To(_) => HeaderName::To,
            TypedHeader::CallId(_) => HeaderName::CallId,
            TypedHeader::CSeq(_) => HeaderName::CSeq,
            TypedHeader::Contact(_) => HeaderName::Contact,
            TypedHeader::Route(_) => HeaderName::Route,
            TypedHeader::RecordRoute(_) => HeaderName::RecordRoute,
            TypedHeader::MaxForwards(_) => HeaderName::MaxForwards,
            TypedHeader::Authorization(_) => HeaderName::Authorization,
            TypedHeader::ProxyAuthorization(_) => HeaderName::ProxyAuthorization,
            TypedHeader::ReferTo(_) => HeaderName::ReferTo,
            TypedHeader::ReferredBy(_) => HeaderName::ReferredBy,
            TypedHeader::RetryAfter(_) => HeaderName::RetryAfter,
            TypedHeader::ContentType(_) => HeaderName::ContentType,
            TypedHeader::Other(name, _) => name.clone(),
        }
    }

    /// Parses a raw `name: value` pair into its typed form
    ///
    /// Names the message model has no typed form for (and Content-Length,
    /// which is derived from the body when rendering) stay raw.
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        let name: HeaderName = name.parse()?;
        let value = value.trim();
        Ok(match name {
            HeaderName::Via => TypedHeader::Via(value.parse()?),
            HeaderName::From => TypedHeader::From(value.parse()?),
            HeaderName::To => TypedHeader::To(value.parse()?),
            HeaderName::CallId => TypedHeader::CallId(value.to_string()),
            HeaderName::CSeq => TypedHeader::CSeq(value.parse()?),
            HeaderName::Contact => TypedHeader::Contact(parse_address_list(value)?),
            HeaderName::Route => TypedHeader::Route(parse_address_list(value)?),
            HeaderName::RecordRoute => TypedHeader::RecordRoute(parse_address_list(value)?),
            HeaderName::MaxForwards => TypedHeader::MaxForwards(
                parse_complete(unsigned::<u8>, value).ok_or_else(|| Error::InvalidHeader {
                    header: "Max-Forwards",
                    reason: value.to_string(),
                })?,
            ),
            HeaderName::Authorization => TypedHeader::Authorization(value.to_string()),
            HeaderName::ProxyAuthorization => TypedHeader::ProxyAuthorization(value.to_string()),
            HeaderName::ReferTo => TypedHeader::ReferTo(value.parse()?),
            HeaderName::ReferredBy => TypedHeader::ReferredBy(value.parse()?),
            HeaderName::RetryAfter => TypedHeader::RetryAfter(
                parse_complete(retry_after, value).ok_or_else(|| Error::InvalidHeader {
                    header: "Retry-After",
                    reason: value.to_string(),
                })?,
            ),
            HeaderName::ContentType => TypedHeader::ContentType(value.to_string()),
            other => TypedHeader::Other(other, value.to_string()),
        })
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[Address]) -> fmt::Result {
    for (i, addr) in list.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", addr)?;
    }
    Ok(())
}

impl fmt::Display for TypedHeader {
    /// Renders `Name: value`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name())?;
        match self {
            TypedHeader::Via(v) => write!(f, "{}", v),
            TypedHeader::From(a)
            | TypedHeader::To(a)
            | TypedHeader::ReferTo(a)
            | TypedHeader::ReferredBy(a) => write!(f, "{}", a),
            TypedHeader::CallId(s)
            | TypedHeader::Authorization(s)
            | TypedHeader::ProxyAuthorization(s)
            | TypedHeader::ContentType(s)
            | TypedHeader::Other(_, s) => f.write_str(s),
            TypedHeader::CSeq(c) => write!(f, "{}", c),
            TypedHeader::Contact(l) | TypedHeader::Route(l) | TypedHeader::RecordRoute(l) => {
                write_list(f, l)
            }
            TypedHeader::MaxForwards(n) => write!(f, "{}", n),
            TypedHeader::RetryAfter(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::method::Method;

    #[test]
    fn test_parse_typed_headers() {
        let h = TypedHeader::parse("v", "SIP/2.0/TCP host;branch=z9hG4bKabc").unwrap();
        assert_eq!(h.name(), HeaderName::Via);

        let h = TypedHeader::parse("CSeq", "7 BYE").unwrap();
        assert_eq!(h, TypedHeader::CSeq(CSeq::new(7, Method::Bye)));

        let h = TypedHeader::parse("Record-Route", "<sip:p1;lr>, <sip:p2;lr>").unwrap();
        match h {
            TypedHeader::RecordRoute(list) => assert_eq!(list.len(), 2),
            other => panic!("unexpected {:?}", other),
        }

        let h = TypedHeader::parse("Retry-After", "120;duration=3600").unwrap();
        assert_eq!(h, TypedHeader::RetryAfter(120));

        let h = TypedHeader::parse("Max-Forwards", " 70 ").unwrap();
        assert_eq!(h, TypedHeader::MaxForwards(70));
        assert!(TypedHeader::parse("Max-Forwards", "256").is_err());
        assert!(TypedHeader::parse("Retry-After", "soon").is_err());
    }

    #[test]
    fn test_unknown_header_is_raw() {
        let h = TypedHeader::parse("X-Trace", "abc").unwrap();
        assert_eq!(h.to_string(), "X-Trace: abc");
    }

    #[test]
    fn test_render_list_header() {
        let h = TypedHeader::Route(vec![
            "<sip:p1.example.com;lr>".parse().unwrap(),
            "<sip:p2.example.com;lr>".parse().unwrap(),
        ]);
        assert_eq!(h.to_string(), "Route: <sip:p1.example.com;lr>, <sip:p2.example.com;lr>");
    }
}
