//! Requests the transaction layer builds on its own

use sipflow_sip_core::prelude::*;

use crate::transaction::error::Result;

/// Builds the ACK a client INVITE transaction sends for a 300-699 response
/// (RFC 3261 17.1.1.3).
///
/// Request-URI, Call-ID, From and Route come from the INVITE, To from the
/// response so the ACK carries the remote tag. Only the top Via is copied so the
/// ACK shares the INVITE's branch. CSeq keeps the INVITE's number with method
/// ACK.
pub fn create_ack_for_failure(original_request: &Request, response: &Response) -> Result<Request> {
    let via = original_request.require_first_via()?.clone();
    let from = original_request.require_from()?.clone();
    let to = response.require_to()?.clone();
    let call_id = original_request.require_call_id()?.to_string();
    let cseq = original_request.require_cseq()?;

    let mut ack = Request::new(Method::Ack, original_request.uri().clone())
        .with_header(TypedHeader::Via(via))
        .with_header(TypedHeader::MaxForwards(70))
        .with_header(TypedHeader::From(from))
        .with_header(TypedHeader::To(to))
        .with_header(TypedHeader::CallId(call_id))
        .with_header(TypedHeader::CSeq(CSeq::new(cseq.seq, Method::Ack)));

    for header in original_request.headers() {
        if let TypedHeader::Route(route) = header {
            ack.push_header(TypedHeader::Route(route.clone()));
        }
    }

    Ok(ack)
}
