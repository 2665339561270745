//! Transaction keys (RFC 3261 17.1.3 and 17.2.3)
//!
//! A key is the top Via branch plus the method plus the side of the
//! transaction. The method is part of the key because a CANCEL carries the same
//! branch as the INVITE it cancels. On the server side an ACK is keyed as the
//! INVITE it acknowledges, so an ACK for a non-2xx response lands in the INVITE
//! server transaction.
//!
//! Peers that predate RFC 3261 send branches without the `z9hG4bK` cookie. For
//! those the key falls back to a synthetic branch built from Call-ID, CSeq
//! number, From tag and the top Via sent-by.

use std::fmt;

use serde::{Deserialize, Serialize};

use sipflow_sip_core::{HeaderAccess, Message, Method, Request, Response};

use crate::transaction::error::{Error, Result};

/// Uniquely identifies a live transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionKey {
    pub branch: String,
    pub method: Method,
    pub is_server: bool,
}

impl TransactionKey {
    pub fn new(branch: impl Into<String>, method: Method, is_server: bool) -> Self {
        Self {
            branch: branch.into(),
            method,
            is_server,
        }
    }

    /// Key of the server transaction an inbound request belongs to
    pub fn for_server_request(request: &Request) -> Result<Self> {
        let method = match request.method() {
            Method::Ack => Method::Invite,
            other => other.clone(),
        };
        Ok(Self::new(request_branch(request)?, method, true))
    }

    /// Key of the client transaction an outbound request creates
    pub fn for_client_request(request: &Request) -> Result<Self> {
        let via = request.first_via().ok_or(Error::MissingBranch)?;
        match via.branch() {
            Some(branch) if via.has_rfc3261_branch() => {
                Ok(Self::new(branch, request.method().clone(), false))
            }
            _ => Err(Error::MissingBranch),
        }
    }

    /// Key of the client transaction an inbound response belongs to
    pub fn for_response(response: &Response) -> Result<Self> {
        let branch = response
            .first_via()
            .and_then(|v| v.branch())
            .ok_or(Error::MissingBranch)?;
        let cseq = response.require_cseq()?;
        Ok(Self::new(branch, cseq.method.clone(), false))
    }

    /// Key for any inbound message
    pub fn for_inbound(message: &Message) -> Result<Self> {
        match message {
            Message::Request(r) => Self::for_server_request(r),
            Message::Response(r) => Self::for_response(r),
        }
    }

    /// Same branch and side, different method
    pub fn with_method(&self, method: Method) -> Self {
        Self::new(self.branch.clone(), method, self.is_server)
    }

    pub fn is_invite(&self) -> bool {
        self.method.is_invite()
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key({}:{}:{})",
            self.branch,
            self.method,
            if self.is_server { "server" } else { "client" }
        )
    }
}

fn request_branch(request: &Request) -> Result<String> {
    let via = request.require_first_via()?;
    if let Some(branch) = via.branch() {
        if via.has_rfc3261_branch() {
            return Ok(branch.to_string());
        }
    }

    let call_id = request.require_call_id()?;
    let cseq = request.require_cseq()?;
    let from_tag = request.from_tag().unwrap_or_default();
    Ok(format!(
        "legacy:{}:{}:{}:{}",
        call_id,
        cseq.seq,
        from_tag,
        via.sent_by()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipflow_sip_core::{Address, CSeq, StatusCode, TypedHeader, Uri, Via};

    fn request(method: Method, branch: &str) -> Request {
        Request::new(method.clone(), Uri::sip("example.com"))
            .with_header(TypedHeader::Via(
                Via::new("UDP", "10.0.0.1", Some(5060)).with_branch(branch),
            ))
            .with_header(TypedHeader::From(
                Address::new(Uri::sip("example.com").with_user("alice")).with_tag("ft"),
            ))
            .with_header(TypedHeader::CallId("call-1".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(7, method)))
    }

    #[test]
    fn test_ack_keys_to_invite_server_transaction() {
        let invite = TransactionKey::for_server_request(&request(Method::Invite, "z9hG4bKabc")).unwrap();
        let ack = TransactionKey::for_server_request(&request(Method::Ack, "z9hG4bKabc")).unwrap();
        assert_eq!(invite, ack);
    }

    #[test]
    fn test_cancel_keys_separately() {
        let invite = TransactionKey::for_server_request(&request(Method::Invite, "z9hG4bKabc")).unwrap();
        let cancel = TransactionKey::for_server_request(&request(Method::Cancel, "z9hG4bKabc")).unwrap();
        assert_ne!(invite, cancel);
        assert_eq!(cancel.with_method(Method::Invite), invite);
    }

    #[test]
    fn test_legacy_branch_falls_back_to_addressing_tuple() {
        let key = TransactionKey::for_server_request(&request(Method::Options, "old-style")).unwrap();
        assert_eq!(key.branch, "legacy:call-1:7:ft:10.0.0.1:5060");

        let ack = TransactionKey::for_server_request(&request(Method::Ack, "other")).unwrap();
        let invite = TransactionKey::for_server_request(&request(Method::Invite, "old-style")).unwrap();
        assert_eq!(ack, invite);
    }

    #[test]
    fn test_client_request_needs_rfc3261_branch() {
        assert!(TransactionKey::for_client_request(&request(Method::Invite, "z9hG4bK1")).is_ok());
        assert_eq!(
            TransactionKey::for_client_request(&request(Method::Invite, "nope")),
            Err(Error::MissingBranch)
        );
    }

    #[test]
    fn test_response_key_uses_cseq_method() {
        let response = Response::new(StatusCode::OK)
            .with_header(TypedHeader::Via(
                Via::new("UDP", "10.0.0.1", Some(5060)).with_branch("z9hG4bKr"),
            ))
            .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Bye)));
        let key = TransactionKey::for_response(&response).unwrap();
        assert_eq!(key, TransactionKey::new("z9hG4bKr", Method::Bye, false));
        assert_eq!(key.to_string(), "Key(z9hG4bKr:BYE:client)");
    }
}
