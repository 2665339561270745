//! # SIP Request
//!
//! A request is a method, a Request-URI, an ordered header list and a body.
//! Builders take `self` by value so requests can be assembled inline:
//!
//! ```rust
//! use sipflow_sip_core::prelude::*;
//!
//! let req = Request::new(Method::Options, "sip:bob@biloxi.com".parse().unwrap())
//!     .with_header(TypedHeader::CallId("a84b4c76e66710".to_string()))
//!     .with_header(TypedHeader::CSeq(CSeq::new(63104, Method::Options)));
//! assert_eq!(req.call_id(), Some("a84b4c76e66710"));
//! ```

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::headers::{HeaderAccess, HeaderName, TypedHeader};
use crate::types::method::Method;
use crate::types::uri::Uri;

/// A SIP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: Vec<TypedHeader>,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, header: TypedHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl HeaderAccess for Request {
    fn headers(&self) -> &[TypedHeader] {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Vec<TypedHeader> {
        &mut self.headers
    }
}

/// Writes the header block, Content-Length and body
pub(crate) fn write_headers_and_body(
    f: &mut fmt::Formatter<'_>,
    headers: &[TypedHeader],
    body: &Bytes,
) -> fmt::Result {
    for header in headers {
        if header.name() == HeaderName::ContentLength {
            continue;
        }
        write!(f, "{}\r\n", header)?;
    }
    write!(f, "Content-Length: {}\r\n\r\n", body.len())?;
    f.write_str(&String::from_utf8_lossy(body))
}

impl fmt::Display for Request {
    /// Canonical wire rendering
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} SIP/2.0\r\n", self.method, self.uri)?;
        write_headers_and_body(f, &self.headers, &self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cseq::CSeq;
    use crate::types::via::Via;

    #[test]
    fn test_request_rendering() {
        let req = Request::new(Method::Bye, "sip:a@x".parse().unwrap())
            .with_header(TypedHeader::Via(
                Via::new("UDP", "10.0.0.1", Some(5060)).with_branch("z9hG4bK1"),
            ))
            .with_header(TypedHeader::CallId("c1".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Bye)));
        let text = req.to_string();
        assert!(text.starts_with("BYE sip:a@x SIP/2.0\r\n"));
        assert!(text.contains("Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK1\r\n"));
        assert!(text.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn test_set_header_replaces_all_lines() {
        let mut req = Request::new(Method::Invite, "sip:a@x".parse().unwrap())
            .with_header(TypedHeader::MaxForwards(10))
            .with_header(TypedHeader::CallId("c".into()))
            .with_header(TypedHeader::MaxForwards(9));
        req.set_header(TypedHeader::MaxForwards(70));
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.max_forwards(), Some(70));
        assert_eq!(req.headers[0], TypedHeader::MaxForwards(70));
    }
}
