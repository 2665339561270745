//! Property tests for the header value parsers
//!
//! Header values arrive from the network, so parsing must fail cleanly on any
//! input rather than panic.

use proptest::prelude::*;
use sipflow_sip_core::prelude::*;

proptest! {
    #[test]
    fn parsers_never_panic(input in "\\PC{0,64}") {
        let _ = input.parse::<Uri>();
        let _ = input.parse::<Via>();
        let _ = input.parse::<CSeq>();
        let _ = input.parse::<Address>();
    }

    #[test]
    fn bracketed_garbage_is_rejected_or_parsed(host in "[\\[\\]:a-z0-9.]{1,20}", port in any::<Option<u16>>()) {
        let text = match port {
            Some(p) => format!("sip:bob@{}:{}", host, p),
            None => format!("sip:bob@{}", host),
        };
        if let Ok(uri) = text.parse::<Uri>() {
            prop_assert_eq!(uri.user.as_deref(), Some("bob"));
            prop_assert!(!uri.host.is_empty());
        }
    }

    #[test]
    fn uri_host_and_port_survive_rendering(
        user in "[a-z][a-z0-9]{0,8}",
        host in "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5}){0,2}",
        port in proptest::option::of(1u16..),
    ) {
        let uri = Uri::sip(host.clone()).with_user(user.clone());
        let uri = match port {
            Some(p) => uri.with_port(p),
            None => uri,
        };
        let reparsed: Uri = uri.to_string().parse().unwrap();
        prop_assert_eq!(reparsed.host, host);
        prop_assert_eq!(reparsed.port, port);
        prop_assert_eq!(reparsed.user, Some(user));
    }

    #[test]
    fn generated_branches_are_rfc3261(_seed in any::<u8>()) {
        let via = Via::new("UDP", "10.0.0.1", Some(5060)).with_branch(generate_branch());
        prop_assert!(via.has_rfc3261_branch());
    }
}
