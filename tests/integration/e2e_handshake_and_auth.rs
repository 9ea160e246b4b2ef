//! End-to-end: CHALLENGE -> CHALLENGE_RESPONSE -> ACCEPT -> auth -> OPEN.

use ds_client::{Client, ClientOptions, ConnectionState};
use ds_protocol::{Action, Message, Topic};
use ds_test_support::MockNetwork;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn wait_for_state(client: &Client, state: ConnectionState) {
    for _ in 0..200 {
        if client.connection_state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for state {state:?}, last seen {:?}", client.connection_state());
}

#[tokio::test]
async fn happy_path_reaches_open_and_invokes_auth_callback_once() {
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());

    server.open();
    server.send(&Message::connection(Action::Challenge));

    let response = server.recv_message().await.expect("challenge response");
    assert_eq!(response.topic, Topic::Connection);
    assert_eq!(response.action, Action::ChallengeResponse);
    assert_eq!(response.parsed_data, Some(json!("ws://initial")));

    server.send(&Message::connection(Action::Accept));
    wait_for_state(&client, ConnectionState::AwaitingAuthentication).await;

    let auth_calls: Arc<Mutex<Vec<(bool, Option<serde_json::Value>)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let calls = auth_calls.clone();
    client
        .login(json!({"password": "123456"}), move |success, data| {
            calls.lock().unwrap().push((success, data));
        })
        .expect("login preconditions met");

    let auth_request = server.recv_message().await.expect("auth request");
    assert_eq!(auth_request.topic, Topic::Auth);
    assert_eq!(auth_request.action, Action::Request);
    assert_eq!(auth_request.parsed_data, Some(json!({"password": "123456"})));

    server.send(&Message::auth(Action::AuthSuccessful).with_parsed_data(json!({"name": "elton"})));
    wait_for_state(&client, ConnectionState::Open).await;

    for _ in 0..200 {
        if !auth_calls.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let calls = auth_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (true, Some(json!({"name": "elton"}))));
}

#[tokio::test]
async fn challenge_rejected_is_terminal() {
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());

    server.open();
    server.send(&Message::connection(Action::Challenge));
    server.recv_message().await.expect("challenge response");

    server.send(&Message::connection(Action::Reject));
    wait_for_state(&client, ConnectionState::ChallengeDenied).await;

    // No further open attempts: the network should have seen exactly one URL.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(network.opened_urls(), vec!["ws://initial"]);

    let err = client.login(json!({"password": "x"}), |_, _| {});
    assert!(err.is_err());
}

#[tokio::test]
async fn non_object_auth_params_fail_synchronously_without_invoking_callback() {
    let network = MockNetwork::new();
    let _server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());

    let invoked = Arc::new(Mutex::new(false));
    let flag = invoked.clone();
    let result = client.login(json!("not-an-object"), move |_, _| {
        *flag.lock().unwrap() = true;
    });
    assert!(result.is_err());
    assert!(!*invoked.lock().unwrap());
}
