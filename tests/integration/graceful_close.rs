//! OPEN -> close() -> CLOSING (send CONNECTION.CLOSING) -> server's CLOSING
//! ack drives a graceful transport close -> CLOSED only once the socket
//! itself reports closed, not the moment the ack is received.

use ds_client::{Client, ClientOptions, ConnectionState};
use ds_protocol::{Action, Message, Topic};
use ds_test_support::MockNetwork;
use serde_json::json;
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

#[tokio::test]
async fn close_waits_for_socket_closed_after_servers_closing_ack() {
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());

    server.open();
    server.send(&Message::connection(Action::Challenge));
    server.recv_message().await.expect("challenge response");
    server.send(&Message::connection(Action::Accept));
    wait_for_state(&client, ConnectionState::AwaitingAuthentication).await;
    client
        .login(json!({"password": "x"}), |_, _| {})
        .expect("login preconditions met");
    server.recv_message().await.expect("auth request");
    server.send(&Message::auth(Action::AuthSuccessful).with_parsed_data(json!({})));
    wait_for_state(&client, ConnectionState::Open).await;

    client.close().expect("close from OPEN is allowed");
    let closing = server.recv_message().await.expect("client sends CONNECTION.CLOSING");
    assert_eq!(closing.topic, Topic::Connection);
    assert_eq!(closing.action, Action::Closing);
    wait_for_state(&client, ConnectionState::Closing).await;

    // The server's CLOSING ack should make the client close the
    // transport (an outbound Close, observed here as the raw stream
    // ending), not jump straight to CLOSED.
    server.send(&Message::connection(Action::Closing));
    assert_eq!(server.recv_raw().await, None);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(client.connection_state(), ConnectionState::Closing);

    // Only once the socket itself reports closed does the client settle.
    server.close();
    wait_for_state(&client, ConnectionState::Closed).await;
}

#[tokio::test]
async fn close_with_no_socket_settles_immediately() {
    // Rejecting the challenge tears the socket down and leaves the client
    // in a terminal non-OPEN state with no socket left to close.
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());

    server.open();
    server.send(&Message::connection(Action::Challenge));
    server.recv_message().await.expect("challenge response");
    server.send(&Message::connection(Action::Reject));
    wait_for_state(&client, ConnectionState::ChallengeDenied).await;

    client.close().expect("close from a socket-less state is allowed");
    wait_for_state(&client, ConnectionState::Closed).await;
}
