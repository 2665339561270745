//! Functions for extracting addressing data from SIP messages

use std::net::{IpAddr, SocketAddr};

use sipflow_sip_core::prelude::*;
use sipflow_sip_transport::{Target, TransportKind};

/// Where responses to an inbound request go (RFC 3261 18.2.2)
///
/// Reads the top Via of the request (or of a response built from it). Uses the
/// `received` and `rport` parameters when present, then the sent-by, falling
/// back to the packet source.
pub fn extract_response_target<M: HeaderAccess>(
    message: &M,
    source: SocketAddr,
    kind: TransportKind,
) -> Target {
    let addr = message
        .first_via()
        .and_then(|via| {
            let host = via.param("received").unwrap_or(via.host.as_str());
            let ip: IpAddr = host.trim_start_matches('[').trim_end_matches(']').parse().ok()?;
            let port = via
                .param("rport")
                .and_then(|p| p.parse().ok())
                .or(via.port)
                .unwrap_or(5060);
            Some(SocketAddr::new(ip, port))
        })
        .unwrap_or(source);
    Target::new(addr, kind)
}

/// The URI a request is routed by: the first Route if present, otherwise the
/// Request-URI (RFC 3261 8.1.2)
pub fn extract_resolution_uri(request: &Request) -> Uri {
    request
        .route()
        .first()
        .map(|route| route.uri.clone())
        .unwrap_or_else(|| request.uri().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_target_prefers_received_and_rport() {
        let source: SocketAddr = "192.0.2.1:40000".parse().unwrap();
        let response = Response::new(StatusCode::OK).with_header(TypedHeader::Via(
            "SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKa;received=198.51.100.7;rport=6000"
                .parse()
                .unwrap(),
        ));
        let target = extract_response_target(&response, source, TransportKind::Udp);
        assert_eq!(target.addr, "198.51.100.7:6000".parse().unwrap());
    }

    #[test]
    fn test_response_target_falls_back_to_source() {
        let source: SocketAddr = "192.0.2.1:40000".parse().unwrap();
        let response = Response::new(StatusCode::OK).with_header(TypedHeader::Via(
            "SIP/2.0/UDP client.example.com;branch=z9hG4bKa".parse().unwrap(),
        ));
        assert_eq!(extract_response_target(&response, source, TransportKind::Udp).addr, source);
    }

    #[test]
    fn test_resolution_uri_uses_first_route() {
        let request = Request::new(Method::Bye, "sip:bob@10.0.0.2".parse().unwrap())
            .with_header(TypedHeader::Route(vec![
                "<sip:p1.example.com;lr>".parse().unwrap(),
                "<sip:p2.example.com;lr>".parse().unwrap(),
            ]));
        assert_eq!(extract_resolution_uri(&request).host, "p1.example.com");

        let direct = Request::new(Method::Bye, "sip:bob@10.0.0.2".parse().unwrap());
        assert_eq!(extract_resolution_uri(&direct).host, "10.0.0.2");
    }
}
