//! SIP response creation utilities (RFC 3261 8.2.6)

use sipflow_sip_core::prelude::*;

/// Creates a response to `request` with the given status code.
///
/// Copies every Via (in order), From, To, Call-ID and CSeq. Record-Route is
/// mirrored on 101-299 responses so a dialog-creating response carries the
/// route set back (RFC 3261 12.1.1). The To tag is left as received; callers
/// that create dialogs stamp their own.
pub fn create_response(request: &Request, status: StatusCode) -> Response {
    let mut response = Response::new(status);

    for header in request.headers() {
        match header {
            TypedHeader::Via(_)
            | TypedHeader::From(_)
            | TypedHeader::To(_)
            | TypedHeader::CallId(_)
            | TypedHeader::CSeq(_) => response.push_header(header.clone()),
            TypedHeader::RecordRoute(_) if (101..300).contains(&status.as_u16()) => {
                response.push_header(header.clone())
            }
            _ => {}
        }
    }

    response
}

/// `100 Trying` for `request`
pub fn create_trying_response(request: &Request) -> Response {
    create_response(request, StatusCode::TRYING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite() -> Request {
        Request::new(Method::Invite, "sip:bob@example.com".parse().unwrap())
            .with_header(TypedHeader::Via("SIP/2.0/UDP p1.example.com;branch=z9hG4bKp1".parse().unwrap()))
            .with_header(TypedHeader::Via("SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKa".parse().unwrap()))
            .with_header(TypedHeader::RecordRoute(vec!["<sip:p1.example.com;lr>".parse().unwrap()]))
            .with_header(TypedHeader::From("<sip:alice@example.com>;tag=a1".parse().unwrap()))
            .with_header(TypedHeader::To("<sip:bob@example.com>".parse().unwrap()))
            .with_header(TypedHeader::CallId("c1".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Invite)))
            .with_header(TypedHeader::MaxForwards(69))
    }

    #[test]
    fn test_response_mirrors_transaction_headers() {
        let response = create_response(&invite(), StatusCode::RINGING);
        assert_eq!(response.vias().len(), 2);
        assert_eq!(response.first_via().unwrap().branch(), Some("z9hG4bKp1"));
        assert_eq!(response.call_id(), Some("c1"));
        assert_eq!(response.from_tag(), Some("a1"));
        assert_eq!(response.record_route().len(), 1);
        assert!(response.max_forwards().is_none());
    }

    #[test]
    fn test_failure_response_drops_record_route() {
        let response = create_response(&invite(), StatusCode::BUSY_HERE);
        assert!(response.record_route().is_empty());
        let trying = create_trying_response(&invite());
        assert_eq!(trying.status(), StatusCode::TRYING);
        assert!(trying.record_route().is_empty());
    }
}
