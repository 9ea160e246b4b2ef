//! Exceeding `max_reconnect_attempts` emits MAX_RECONNECTION_ATTEMPTS_REACHED
//! and settles in CLOSED without a further reconnect.

use ds_client::{Client, ClientEvent, ClientOptions, ConnectionState};
use ds_test_support::MockNetwork;
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

#[tokio::test]
async fn fourth_consecutive_failure_closes_after_three_allowed_attempts() {
    let network = MockNetwork::new();
    let server0 = network.queue_server();
    let options = ClientOptions {
        max_reconnect_attempts: 3,
        reconnect_interval_increment: Duration::from_millis(10),
        max_reconnect_interval: Duration::from_millis(50),
        ..ClientOptions::default()
    };
    let client = Client::with_opener("ws://initial", options, network.opener());

    let max_reached: Arc<Mutex<Option<u32>>> = Arc::new(Mutex::new(None));
    let captured = max_reached.clone();
    client.on("error", move |event| {
        if let ClientEvent::MaxReconnectionAttemptsReached(attempts) = event {
            *captured.lock().unwrap() = Some(*attempts);
        }
    });

    wait_for_state(&client, ConnectionState::AwaitingConnection).await;

    let server1 = network.queue_server();
    server0.close();
    wait_for_state(&client, ConnectionState::Reconnecting).await;
    wait_for_state(&client, ConnectionState::AwaitingConnection).await;
    assert_eq!(network.opened_urls(), vec!["ws://initial", "ws://initial"]);

    let server2 = network.queue_server();
    server1.close();
    wait_for_state(&client, ConnectionState::Reconnecting).await;
    wait_for_state(&client, ConnectionState::AwaitingConnection).await;

    let server3 = network.queue_server();
    server2.close();
    wait_for_state(&client, ConnectionState::Reconnecting).await;
    wait_for_state(&client, ConnectionState::AwaitingConnection).await;
    assert_eq!(network.opened_urls().len(), 4);

    server3.close();
    wait_for_state(&client, ConnectionState::Closed).await;

    assert_eq!(*max_reached.lock().unwrap(), Some(3));
    // No fifth open attempt was made.
    assert_eq!(network.opened_urls().len(), 4);
}
