use std::sync::Arc;

use sipflow_sip_core::prelude::*;
use sipflow_sip_transport::prelude::*;
use tokio::sync::mpsc;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sipflow_sip_transport=trace")
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_two_memory_transports_exchange_messages() {
    init_logging();
    let alice = MemoryTransport::udp("127.0.0.1:5060".parse().unwrap());
    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    alice.connect_peer(bob_tx);

    let transport: Arc<dyn Transport> = Arc::new(alice.clone());
    assert!(!transport.is_reliable());

    let request = Request::new(Method::Options, "sip:bob@127.0.0.1:5070".parse().unwrap())
        .with_header(TypedHeader::Via(
            Via::new("UDP", "127.0.0.1", Some(5060)).with_branch(generate_branch()),
        ));
    transport
        .send(&Message::Request(request.clone()), "127.0.0.1:5070".parse().unwrap())
        .unwrap();

    match bob_rx.recv().await {
        Some(TransportEvent::MessageReceived { message, kind, .. }) => {
            assert_eq!(kind, TransportKind::Udp);
            assert_eq!(message.as_request(), Some(&request));
        }
        other => panic!("unexpected event {:?}", other),
    }

    transport.close().unwrap();
    assert!(matches!(bob_rx.recv().await, Some(TransportEvent::Closed)));
}

#[tokio::test]
async fn test_resolver_feeds_candidates_in_order() {
    init_logging();
    let resolver: Arc<dyn TargetResolver> = Arc::new({
        let r = StaticResolver::new();
        r.insert(
            "proxy.example.com",
            vec![
                Target::udp("10.0.0.1:5060".parse().unwrap()),
                Target::tcp("10.0.0.2:5060".parse().unwrap()),
            ],
        );
        r
    });
    let (tx, mut rx) = mpsc::unbounded_channel();
    resolver.resolve(&"sip:proxy.example.com".parse().unwrap(), ResolutionToken(1), tx.clone());
    resolver.resolve(&"sip:nowhere.invalid".parse().unwrap(), ResolutionToken(2), tx);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.token, ResolutionToken(1));
    assert_eq!(first.result.unwrap().len(), 2);

    let second = rx.recv().await.unwrap();
    assert_eq!(second.token, ResolutionToken(2));
    assert!(second.result.is_err());
}
