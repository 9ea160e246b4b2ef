//! Redirect to a second server, then fall back to the original URL once
//! the redirected server itself drops the connection.

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
async fn redirect_then_falls_back_to_original_url_after_disconnect() {
    let network = MockNetwork::new();
    let mut server_a = network.queue_server();
    let options = ClientOptions {
        reconnect_interval_increment: Duration::from_millis(5),
        max_reconnect_interval: Duration::from_millis(20),
        ..ClientOptions::default()
    };
    let client = Client::with_opener("ws://a", options, network.opener());

    server_a.open();
    server_a.send(&Message::connection(Action::Challenge));
    let response = server_a.recv_message().await.expect("challenge response to A");
    assert_eq!(response.parsed_data, Some(json!("ws://a")));

    let server_b = network.queue_server();
    server_a.send(&Message::connection(Action::Redirect).with_data(vec!["ws://b".into()]));
    wait_for_state(&client, ConnectionState::AwaitingConnection).await;
    assert_eq!(network.opened_urls(), vec!["ws://a", "ws://b"]);

    let mut server_b = server_b;
    server_b.open();
    wait_for_state(&client, ConnectionState::AwaitingConnection).await;
    server_b.send(&Message::connection(Action::Challenge));
    let response = server_b.recv_message().await.expect("challenge response to B");
    assert_eq!(response.topic, Topic::Connection);
    assert_eq!(response.parsed_data, Some(json!("ws://b")));

    server_b.send(&Message::connection(Action::Accept));
    wait_for_state(&client, ConnectionState::AwaitingAuthentication).await;
    client
        .login(json!({"password": "x"}), |_, _| {})
        .expect("login preconditions met");
    server_b.recv_message().await.expect("auth request to B");
    server_b.send(&Message::auth(Action::AuthSuccessful).with_parsed_data(json!({})));
    wait_for_state(&client, ConnectionState::Open).await;

    // B goes down unsolicited: the client should fall back to the
    // original URL, not retry B.
    let server_a2 = network.queue_server();
    server_b.close();
    wait_for_state(&client, ConnectionState::Reconnecting).await;
    wait_for_state(&client, ConnectionState::AwaitingConnection).await;

    assert_eq!(network.opened_urls(), vec!["ws://a", "ws://b", "ws://a"]);
    drop(server_a2);
}
