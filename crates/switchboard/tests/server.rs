//! Integration tests for the Switchboard server: request handling, relay,
//! connection lifecycle and framing over real sockets.

use std::time::Duration;

use switchboard::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

// =========================================================================
// Helpers
// =========================================================================

const HEADER: &str = "=== Online Clients === ";

/// Starts a server on a random port and returns the port.
async fn start_server() -> u16 {
    start_server_with(ServerConfig::default()).await
}

async fn start_server_with(config: ServerConfig) -> u16 {
    let server = SwitchboardServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let port = server.local_addr().expect("should have local addr").port();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    port
}

async fn connect(port: u16) -> (SwitchboardClient, Inbound) {
    SwitchboardClient::connect("127.0.0.1", port)
        .await
        .expect("should connect")
}

/// Waits for the next inbound message.
async fn next(inbound: &mut Inbound) -> Message {
    tokio::time::timeout(Duration::from_secs(2), inbound.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("connection closed unexpectedly")
}

/// Asserts that nothing arrives for a short while.
async fn assert_quiet(inbound: &mut Inbound) {
    let got =
        tokio::time::timeout(Duration::from_millis(150), inbound.recv()).await;
    assert!(got.is_err(), "expected no message, got {got:?}");
}

async fn list(client: &SwitchboardClient, inbound: &mut Inbound) -> String {
    client
        .send_request(MessageKind::List, "", ClientId::SERVER)
        .await
        .expect("send list");
    let reply = next(inbound).await;
    assert_eq!(reply.kind, MessageKind::List);
    assert_eq!(reply.target, ClientId::SERVER);
    reply.payload
}

/// Number of `[ID:` entries in a list payload.
fn entries(listing: &str) -> usize {
    listing.matches("[ID:").count()
}

/// Writes raw bytes on a plain socket and reads back `want` lines.
async fn raw_exchange(port: u16, writes: &[&[u8]], want: usize) -> Vec<String> {
    let stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("raw connect");
    let (read, mut write) = stream.into_split();

    for chunk in writes {
        write.write_all(chunk).await.expect("raw write");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let mut lines = BufReader::new(read).lines();
    let mut got = Vec::new();
    while got.len() < want {
        let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read line")
            .expect("stream closed early");
        got.push(line);
    }

    let extra =
        tokio::time::timeout(Duration::from_millis(150), lines.next_line()).await;
    assert!(extra.is_err(), "unexpected extra line: {extra:?}");
    got
}

// =========================================================================
// Requests
// =========================================================================

#[tokio::test]
async fn test_time_request() {
    let port = start_server().await;
    let (client, mut inbound) = connect(port).await;

    client
        .send_request(MessageKind::Time, "", ClientId::SERVER)
        .await
        .expect("send");

    let reply = next(&mut inbound).await;
    assert_eq!(reply.kind, MessageKind::Time);
    assert_eq!(reply.target, ClientId::SERVER);
    assert!(
        chrono::NaiveDateTime::parse_from_str(&reply.payload, "%Y-%m-%d %H:%M:%S")
            .is_ok(),
        "bad time payload: {:?}",
        reply.payload
    );
    assert_eq!(reply.payload.len(), "2024-01-01 00:00:00".len());
}

#[tokio::test]
async fn test_name_request_uses_configured_name() {
    let port = start_server_with(ServerConfig {
        server_name: Some("relay-test".into()),
        ..ServerConfig::default()
    })
    .await;
    let (client, mut inbound) = connect(port).await;

    client
        .send_request(MessageKind::Name, "", ClientId::SERVER)
        .await
        .expect("send");

    let reply = next(&mut inbound).await;
    assert_eq!(reply, Message::response(MessageKind::Name, "relay-test"));
}

#[tokio::test]
async fn test_name_request_reports_host_name() {
    let port = start_server().await;
    let (client, mut inbound) = connect(port).await;

    client
        .send_request(MessageKind::Name, "", ClientId::SERVER)
        .await
        .expect("send");

    let reply = next(&mut inbound).await;
    assert_eq!(reply.kind, MessageKind::Name);
    assert!(!reply.payload.is_empty());
}

#[tokio::test]
async fn test_list_with_one_client() {
    let port = start_server().await;
    let (client, mut inbound) = connect(port).await;

    let listing = list(&client, &mut inbound).await;
    assert!(listing.starts_with(HEADER), "{listing}");
    assert!(listing.starts_with(&format!("{HEADER}[ID:100 127.0.0.1:")));
    assert!(listing.ends_with("(You)] "), "{listing}");
    assert_eq!(entries(&listing), 1);
}

#[tokio::test]
async fn test_list_marks_only_the_requester() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    assert_eq!(entries(&list(&a, &mut a_in).await), 1);
    let (b, mut b_in) = connect(port).await;
    assert_eq!(entries(&list(&b, &mut b_in).await), 2);

    let listing = list(&a, &mut a_in).await;
    assert_eq!(entries(&listing), 2);
    assert_eq!(listing.matches("(You)").count(), 1);
    let first = listing.find("[ID:100 ").expect("entry for 100");
    let second = listing.find("[ID:101 ").expect("entry for 101");
    assert!(first < second, "entries out of order: {listing}");
    let marker = listing.find("(You)").expect("marker");
    assert!(first < marker && marker < second, "{listing}");
}

#[tokio::test]
async fn test_unknown_kind_gets_no_reply() {
    let port = start_server().await;
    let (client, mut inbound) = connect(port).await;

    for kind in [MessageKind::Other('X'), MessageKind::Disconnect] {
        client
            .send_request(kind, "", ClientId::SERVER)
            .await
            .expect("send");
    }
    assert_quiet(&mut inbound).await;

    // Still served afterwards.
    assert_eq!(entries(&list(&client, &mut inbound).await), 1);
}

// =========================================================================
// Relay
// =========================================================================

#[tokio::test]
async fn test_forward_between_clients() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    list(&a, &mut a_in).await;
    let (b, mut b_in) = connect(port).await;
    list(&b, &mut b_in).await;

    a.send_request(MessageKind::Send, "hello|world", ClientId(101))
        .await
        .expect("send");

    let delivered = next(&mut b_in).await;
    assert_eq!(delivered.kind, MessageKind::Send);
    assert_eq!(delivered.target, ClientId(100));
    assert_eq!(delivered.payload, "[From 100]: hello|world");

    assert_quiet(&mut a_in).await;
}

#[tokio::test]
async fn test_forward_to_self() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;

    a.send_request(MessageKind::Send, "echo", ClientId(100))
        .await
        .expect("send");

    let delivered = next(&mut a_in).await;
    assert_eq!(
        delivered,
        Message::new(MessageKind::Send, ClientId(100), "[From 100]: echo")
    );
}

#[tokio::test]
async fn test_forward_to_unknown_client() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    list(&a, &mut a_in).await;
    let (b, mut b_in) = connect(port).await;
    assert_eq!(entries(&list(&b, &mut b_in).await), 2);

    a.send_request(MessageKind::Send, "anyone?", ClientId(999))
        .await
        .expect("send");

    let reply = next(&mut a_in).await;
    assert_eq!(reply.kind, MessageKind::Send);
    assert_eq!(reply.target, ClientId::SERVER);
    assert_eq!(reply.payload, "[System] Error: Client 999 not found.");

    assert_quiet(&mut a_in).await;
    assert_quiet(&mut b_in).await;
}

#[tokio::test]
async fn test_forward_to_disconnected_client_is_not_found() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    list(&a, &mut a_in).await;
    let (b, mut b_in) = connect(port).await;
    list(&b, &mut b_in).await;

    b.disconnect().await.expect("disconnect");
    wait_for_entries(&a, &mut a_in, 1).await;

    a.send_request(MessageKind::Send, "still there?", ClientId(101))
        .await
        .expect("send");
    let reply = next(&mut a_in).await;
    assert_eq!(reply.payload, "[System] Error: Client 101 not found.");
}

// =========================================================================
// Lifecycle
// =========================================================================

/// Polls the list until it has `want` entries.
async fn wait_for_entries(
    client: &SwitchboardClient,
    inbound: &mut Inbound,
    want: usize,
) -> String {
    for _ in 0..50 {
        let listing = list(client, inbound).await;
        if entries(&listing) == want {
            return listing;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("list never reached {want} entries");
}

#[tokio::test]
async fn test_disconnect_removes_client_from_list() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    list(&a, &mut a_in).await;
    let (b, mut b_in) = connect(port).await;
    assert_eq!(entries(&list(&b, &mut b_in).await), 2);

    b.disconnect().await.expect("disconnect");

    let listing = wait_for_entries(&a, &mut a_in, 1).await;
    assert!(listing.contains("[ID:100 "));
    assert!(!listing.contains("[ID:101 "));
}

#[tokio::test]
async fn test_dropped_socket_removes_client_from_list() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    list(&a, &mut a_in).await;

    let raw = TcpStream::connect(("127.0.0.1", port)).await.expect("raw");
    wait_for_entries(&a, &mut a_in, 2).await;
    drop(raw);

    wait_for_entries(&a, &mut a_in, 1).await;
}

#[tokio::test]
async fn test_ids_are_never_reused() {
    let port = start_server().await;
    let (a, mut a_in) = connect(port).await;
    assert!(list(&a, &mut a_in).await.contains("[ID:100 "));
    a.disconnect().await.expect("disconnect");

    let (b, mut b_in) = connect(port).await;
    let listing = wait_for_entries(&b, &mut b_in, 1).await;
    assert!(listing.contains("[ID:101 "), "{listing}");
    assert!(listing.ends_with("(You)] "));
    assert!(!listing.contains("[ID:100 "));
}

#[tokio::test]
async fn test_inbound_ends_when_server_shuts_down() {
    let server = SwitchboardServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let port = server.local_addr().expect("local addr").port();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let (client, mut inbound) = connect(port).await;
    list(&client, &mut inbound).await;

    stop_tx.send(()).expect("server still running");
    let result = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("server should stop")
        .expect("task should complete");
    assert!(result.is_ok());

    let end = tokio::time::timeout(Duration::from_secs(2), inbound.recv())
        .await
        .expect("inbound should end");
    assert!(end.is_none());

    let refused = SwitchboardClient::connect("127.0.0.1", port).await;
    assert!(refused.is_err());
}

#[tokio::test]
async fn test_bind_conflict_fails_build() {
    let port = start_server().await;
    let result = SwitchboardServer::builder()
        .bind(&format!("127.0.0.1:{port}"))
        .build()
        .await;
    assert!(matches!(
        result,
        Err(SwitchboardError::Transport(TransportError::BindFailed { .. }))
    ));
}

#[tokio::test]
async fn test_line_break_in_server_name_fails_build() {
    let result = SwitchboardServer::builder()
        .config(ServerConfig {
            server_name: Some("a\nb".into()),
            ..ServerConfig::default()
        })
        .bind("127.0.0.1:0")
        .build()
        .await;
    assert!(matches!(result, Err(SwitchboardError::Config(_))));
}

// =========================================================================
// Framing
// =========================================================================

#[tokio::test]
async fn test_glued_frames_each_get_a_reply() {
    let port = start_server_with(ServerConfig {
        server_name: Some("glue".into()),
        ..ServerConfig::default()
    })
    .await;

    let lines = raw_exchange(
        port,
        &[b"LAB_PROTO|N|0|\nLAB_PROTO|N|0|\nLAB_PROTO|L|0|\n"],
        3,
    )
    .await;

    assert_eq!(lines[0], "LAB_PROTO|N|0|glue");
    assert_eq!(lines[1], "LAB_PROTO|N|0|glue");
    assert!(lines[2].starts_with(&format!("LAB_PROTO|L|0|{HEADER}[ID:100 ")));
}

#[tokio::test]
async fn test_split_frame_is_reassembled() {
    let port = start_server_with(ServerConfig {
        server_name: Some("split".into()),
        ..ServerConfig::default()
    })
    .await;

    let lines =
        raw_exchange(port, &[b"LAB_PR", b"OTO|N|", b"0|\n"], 1).await;
    assert_eq!(lines, ["LAB_PROTO|N|0|split"]);
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let port = start_server_with(ServerConfig {
        server_name: Some("strict".into()),
        ..ServerConfig::default()
    })
    .await;

    let lines = raw_exchange(
        port,
        &[
            b"garbage\n",
            b"OTHER|N|0|\n",
            b"LAB_PROTO|N|+0|\n",
            b"LAB_PROTO|N|abc|\n",
            b"LAB_PROTO|N\n",
            b"\n",
            b"LAB_PROTO|N|0|\n",
        ],
        1,
    )
    .await;
    assert_eq!(lines, ["LAB_PROTO|N|0|strict"]);
}

#[tokio::test]
async fn test_loose_head_and_kind_fields_are_accepted() {
    let port = start_server_with(ServerConfig {
        server_name: Some("loose".into()),
        ..ServerConfig::default()
    })
    .await;

    let lines = raw_exchange(
        port,
        &[b"LAB_PROTO|NX|0|\n", b"LAB_PROTO_V1|N|0|\n"],
        2,
    )
    .await;
    assert_eq!(lines, ["LAB_PROTO|N|0|loose", "LAB_PROTO|N|0|loose"]);
}

#[tokio::test]
async fn test_oversized_frame_is_dropped() {
    let port = start_server_with(ServerConfig {
        server_name: Some("bounded".into()),
        max_frame_len: 64,
        ..ServerConfig::default()
    })
    .await;

    let long = format!("LAB_PROTO|S|100|{}", "x".repeat(500));
    let lines = raw_exchange(
        port,
        &[long.as_bytes(), b"\nLAB_PROTO|N|0|\n"],
        1,
    )
    .await;
    assert_eq!(lines, ["LAB_PROTO|N|0|bounded"]);
}

#[tokio::test]
async fn test_client_rejects_payload_with_newline() {
    let port = start_server().await;
    let (client, mut inbound) = connect(port).await;

    let err = client
        .send_request(MessageKind::Send, "two\nlines", ClientId(100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwitchboardError::Protocol(ProtocolError::PayloadContainsTerminator)
    ));
    assert_quiet(&mut inbound).await;
}
