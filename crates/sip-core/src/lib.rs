//! # sipflow-sip-core
//!
//! The SIP message model consumed by the transaction and dialog layers:
//! methods, status codes, URIs, name-addr values, Via, CSeq, typed headers,
//! and the [`Request`] / [`Response`] / [`Message`] types.
//!
//! Wire parsing of whole messages is not part of this crate. Individual header
//! values can be parsed with [`TypedHeader::parse`], which runs the `nom`
//! grammar in [`parser`]. Every type renders its canonical text through
//! `Display`, which is what retransmission comparisons use.
//!
//! Header names resolve through a process-wide [`HeaderDictionary`] that is
//! built once. Call [`init`] at start-up to build it before any message
//! processing; lookups made before that build it lazily.

pub mod error;
pub mod parser;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use types::{
    Address, CSeq, HeaderAccess, HeaderDictionary, HeaderName, Message, Method, Param, Request,
    Response, StatusCode, TypedHeader, Uri, Via, BRANCH_MAGIC_COOKIE,
};

/// Builds the read-only header dictionary. Safe to call more than once.
pub fn init() {
    HeaderDictionary::install();
}

/// Re-export of common types and functions
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        Address, CSeq, HeaderAccess, HeaderDictionary, HeaderName, Message, Method, Param,
        Request, Response, StatusCode, TypedHeader, Uri, Via, BRANCH_MAGIC_COOKIE,
    };
    pub use crate::utils::{generate_branch, generate_call_id, generate_tag};
}
