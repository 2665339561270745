//! Request-or-response wrapper handed between transport and transaction layers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::headers::{HeaderAccess, TypedHeader};
use crate::types::method::Method;
use crate::types::sip_request::Request;
use crate::types::sip_response::Response;

/// Either a [`Request`] or a [`Response`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Message::Request(r) => Some(r),
            Message::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Response(r) => Some(r),
            Message::Request(_) => None,
        }
    }

    /// Request method, or the CSeq method of a response
    pub fn method(&self) -> Option<Method> {
        match self {
            Message::Request(r) => Some(r.method.clone()),
            Message::Response(r) => r.cseq().map(|c| c.method.clone()),
        }
    }

    /// Short description for log lines (`INVITE` / `200 (INVITE)`)
    pub fn short_description(&self) -> String {
        match self {
            Message::Request(r) => r.method.to_string(),
            Message::Response(r) => match r.cseq() {
                Some(cseq) => format!("{} ({})", r.status, cseq.method),
                None => r.status.to_string(),
            },
        }
    }
}

impl HeaderAccess for Message {
    fn headers(&self) -> &[TypedHeader] {
        match self {
            Message::Request(r) => &r.headers,
            Message::Response(r) => &r.headers,
        }
    }

    fn headers_mut(&mut self) -> &mut Vec<TypedHeader> {
        match self {
            Message::Request(r) => &mut r.headers,
            Message::Response(r) => &mut r.headers,
        }
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Message::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Message::Response(r)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Request(r) => fmt::Display::fmt(r, f),
            Message::Response(r) => fmt::Display::fmt(r, f),
        }
    }
}
