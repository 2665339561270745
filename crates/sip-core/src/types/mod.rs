//! Message model types

pub mod address;
pub mod cseq;
pub mod headers;
pub mod method;
pub mod param;
pub mod sip_message;
pub mod sip_request;
pub mod sip_response;
pub mod status;
pub mod uri;
pub mod via;

pub use address::Address;
pub use cseq::CSeq;
pub use headers::{HeaderAccess, HeaderDictionary, HeaderName, TypedHeader};
pub use method::Method;
pub use param::Param;
pub use sip_message::Message;
pub use sip_request::Request;
pub use sip_response::Response;
pub use status::StatusCode;
pub use uri::Uri;
pub use via::{Via, BRANCH_MAGIC_COOKIE};
