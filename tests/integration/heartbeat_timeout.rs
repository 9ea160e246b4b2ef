//! A connection with no inbound traffic for more than 2x the heartbeat
//! interval emits exactly one HEARTBEAT_TIMEOUT and reconnects.

use ds_client::{Client, ClientEvent, ClientOptions, ConnectionState};
use ds_protocol::{Action, Message};
use ds_test_support::MockNetwork;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn wait_for_state(client: &Client, state: ConnectionState) {
    for _ in 0..400 {
        if client.connection_state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for state {state:?}, last seen {:?}", client.connection_state());
}

async fn drive_to_open(client: &Client, server: &mut ds_test_support::MockServer, url: &str) {
    server.open();
    server.send(&Message::connection(Action::Challenge));
    server.recv_message().await.expect("challenge response");
    server.send(&Message::connection(Action::Accept));
    wait_for_state(client, ConnectionState::AwaitingAuthentication).await;
    client
        .login(json!({"password": "x"}), |_, _| {})
        .expect("login preconditions met");
    server.recv_message().await.expect("auth request");
    server.send(&Message::auth(Action::AuthSuccessful).with_parsed_data(json!({})));
    wait_for_state(client, ConnectionState::Open).await;
    let _ = url;
}

#[tokio::test]
async fn silence_past_two_intervals_triggers_exactly_one_timeout() {
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let options = ClientOptions {
        heartbeat_interval: Duration::from_millis(15),
        ..ClientOptions::default()
    };
    let client = Client::with_opener("ws://initial", options, network.opener());
    drive_to_open(&client, &mut server, "ws://initial").await;

    let timeouts = Arc::new(AtomicUsize::new(0));
    let counted = timeouts.clone();
    client.on("error", move |event| {
        if matches!(event, ClientEvent::HeartbeatTimeout) {
            counted.fetch_add(1, Ordering::SeqCst);
        }
    });

    // No traffic at all for 3x the interval: the server never answers a
    // PING here because none is sent by either side in this window.
    tokio::time::sleep(Duration::from_millis(45)).await;
    wait_for_state(&client, ConnectionState::Reconnecting).await;

    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_ping_is_answered_with_pong_immediately() {
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());
    drive_to_open(&client, &mut server, "ws://initial").await;

    server.send(&Message::connection(Action::Ping));
    let reply = server.recv_message().await.expect("pong reply");
    assert_eq!(reply.action, Action::Pong);
}
