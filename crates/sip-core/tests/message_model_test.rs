use serial_test::serial;
use sipflow_sip_core::prelude::*;

fn invite() -> Request {
    Request::new(Method::Invite, "sip:bob@biloxi.com".parse().unwrap())
        .with_header(TypedHeader::parse("Via", "SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds").unwrap())
        .with_header(TypedHeader::parse("Max-Forwards", "70").unwrap())
        .with_header(TypedHeader::parse("To", "Bob <sip:bob@biloxi.com>").unwrap())
        .with_header(TypedHeader::parse("From", "Alice <sip:alice@atlanta.com>;tag=1928301774").unwrap())
        .with_header(TypedHeader::parse("Call-ID", "a84b4c76e66710@pc33.atlanta.com").unwrap())
        .with_header(TypedHeader::parse("CSeq", "314159 INVITE").unwrap())
        .with_header(TypedHeader::parse("Record-Route", "<sip:p1.example.com;lr>").unwrap())
        .with_header(TypedHeader::parse("Record-Route", "<sip:p2.example.com;lr>, <sip:p3.example.com;lr>").unwrap())
        .with_header(TypedHeader::parse("m", "<sip:alice@pc33.atlanta.com>").unwrap())
}

#[test]
#[serial]
fn test_dictionary_installed_before_use() {
    sipflow_sip_core::init();
    assert!(HeaderDictionary::is_installed());
    assert!(HeaderDictionary::global().len() >= 16);
}

#[test]
#[serial]
fn test_typed_accessors() {
    let req = invite();
    assert_eq!(req.call_id(), Some("a84b4c76e66710@pc33.atlanta.com"));
    assert_eq!(req.from_tag(), Some("1928301774"));
    assert_eq!(req.to_tag(), None);
    assert_eq!(req.cseq().map(|c| c.seq), Some(314159));
    assert_eq!(req.first_via().and_then(|v| v.branch()), Some("z9hG4bK776asdhds"));
    assert_eq!(req.max_forwards(), Some(70));
    assert_eq!(req.contacts().len(), 1);

    let hosts: Vec<&str> = req.record_route().iter().map(|a| a.uri.host.as_str()).collect();
    assert_eq!(hosts, vec!["p1.example.com", "p2.example.com", "p3.example.com"]);
}

#[test]
#[serial]
fn test_missing_headers_are_reported() {
    let req = Request::new(Method::Options, "sip:x".parse().unwrap());
    assert_eq!(req.require_call_id(), Err(Error::MissingHeader("Call-ID")));
    assert_eq!(req.require_first_via().unwrap_err(), Error::MissingHeader("Via"));
}

#[test]
#[serial]
fn test_rendering_is_stable() {
    let a = Message::from(invite()).to_string();
    let b = Message::Request(invite()).to_string();
    assert_eq!(a, b);
    assert!(a.contains("Record-Route: <sip:p2.example.com;lr>, <sip:p3.example.com;lr>\r\n"));
    assert!(a.contains("From: \"Alice\" <sip:alice@atlanta.com>;tag=1928301774\r\n"));
}

#[test]
fn test_message_serializes_to_json() {
    let msg = Message::Response(Response::new(StatusCode::OK));
    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}
