//! Dialog identifier
//!
//! RFC 3261 Section 12: a dialog is identified by the Call-ID plus the local
//! and remote tags. Which tag is local depends on which side of the dialog
//! this user agent is on.

use std::fmt;

use serde::{Deserialize, Serialize};

use sipflow_sip_core::{HeaderAccess, Request, Response};

/// `(Call-ID, local tag, remote tag)` as seen from this user agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DialogId {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
}

impl DialogId {
    pub fn new(
        call_id: impl Into<String>,
        local_tag: impl Into<String>,
        remote_tag: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            local_tag: local_tag.into(),
            remote_tag: remote_tag.into(),
        }
    }

    /// The dialog an in-dialog request belongs to
    ///
    /// Requests without a To tag are outside any dialog and yield `None`. A
    /// server receiving the request owns the To tag; a client sending it owns
    /// the From tag.
    pub fn from_request(request: &Request, is_server: bool) -> Option<Self> {
        let call_id = request.call_id()?;
        let from_tag = request.from_tag()?;
        let to_tag = request.to_tag()?;
        Some(if is_server {
            Self::new(call_id, to_tag, from_tag)
        } else {
            Self::new(call_id, from_tag, to_tag)
        })
    }

    /// The dialog a response establishes or belongs to, from the UAC side
    pub fn from_response(response: &Response) -> Option<Self> {
        Some(Self::new(
            response.call_id()?,
            response.from_tag()?,
            response.to_tag()?,
        ))
    }

    /// The same dialog seen from the peer
    pub fn reversed(&self) -> Self {
        Self::new(&self.call_id, &self.remote_tag, &self.local_tag)
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.call_id, self.local_tag, self.remote_tag)
    }
}
