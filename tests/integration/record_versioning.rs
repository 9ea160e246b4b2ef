//! End-to-end record lifecycle through `Client`: create-or-read, a local
//! `set()` producing a PATCH with the right version/path/typed value, an
//! accepted UPDATE, and a version-mismatch UPDATE that still advances
//! local state while surfacing an error.

use ds_client::{Client, ClientOptions, ConnectionState, RecordError};
use ds_protocol::{Action, Message, Topic};
use ds_test_support::MockNetwork;
use serde_json::json;
use std::sync::{Arc, Mutex};
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

async fn drive_to_open(client: &Client, server: &mut ds_test_support::MockServer) {
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
}

#[tokio::test]
async fn read_then_patch_then_update_then_version_mismatch() {
    let network = MockNetwork::new();
    let mut server = network.queue_server();
    let client = Client::with_opener("ws://initial", ClientOptions::default(), network.opener());
    drive_to_open(&client, &mut server).await;

    let record = client.record("r");
    let create = server.recv_message().await.expect("createOrRead request");
    assert_eq!(create.topic, Topic::Record);
    assert_eq!(create.action, Action::CreateOrRead);
    assert_eq!(create.name.as_deref(), Some("r"));

    server.send(
        &Message::record(Action::Read, "r")
            .with_data(vec!["5".into()])
            .with_parsed_data(json!({"a": 1})),
    );

    for _ in 0..200 {
        if record.lock().unwrap().is_ready() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(record.lock().unwrap().is_ready());
    assert_eq!(record.lock().unwrap().version(), 5);

    record.lock().unwrap().set(Some("a"), json!(2)).unwrap();
    let patch = server.recv_message().await.expect("patch send");
    assert_eq!(patch.topic, Topic::Record);
    assert_eq!(patch.action, Action::Patch);
    assert_eq!(patch.name.as_deref(), Some("r"));
    assert_eq!(patch.data[0], "6");
    assert_eq!(patch.data[1], "a");
    let typed_value = &patch.data[2];
    assert_eq!(ds_protocol::typed::decode(typed_value), json!(2));

    server.send(
        &Message::record(Action::Update, "r")
            .with_data(vec!["7".into()])
            .with_parsed_data(json!({"a": 3})),
    );
    for _ in 0..200 {
        if record.lock().unwrap().version() == 7 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(record.lock().unwrap().version(), 7);
    assert_eq!(record.lock().unwrap().get(Some("a")), Some(json!(3)));

    let errors: Arc<Mutex<Vec<RecordError>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = errors.clone();
    record
        .lock()
        .unwrap()
        .on_error(Box::new(move |err| captured.lock().unwrap().push(err.clone())));

    server.send(
        &Message::record(Action::Update, "r")
            .with_data(vec!["20".into()])
            .with_parsed_data(json!({"a": 99})),
    );
    for _ in 0..200 {
        if record.lock().unwrap().version() == 20 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(record.lock().unwrap().version(), 20);
    assert_eq!(record.lock().unwrap().get(Some("a")), Some(json!(99)));

    let errs = errors.lock().unwrap();
    assert_eq!(errs.len(), 1);
    match &errs[0] {
        RecordError::VersionExists {
            expected, received, ..
        } => {
            assert_eq!(*expected, 8);
            assert_eq!(*received, 20);
        }
        other => panic!("expected VersionExists, got {other:?}"),
    }
}
