// ds-client-cli: connects to a server, logs in, and prints record updates.

use ds_client::{Client, ClientOptions, ConnectionState};
use std::env;
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: ds-client-cli <url> <record-name> [config.toml]");
        std::process::exit(1);
    }
    let url = args[1].clone();
    let record_name = args[2].clone();

    let options = match args.get(3) {
        Some(path) => match ClientOptions::from_toml_file(path) {
            Ok(opts) => {
                info!(path, "config loaded");
                opts
            }
            Err(e) => {
                eprintln!("FATAL: failed to load config: {e}");
                std::process::exit(1);
            }
        },
        None => ClientOptions::default(),
    };

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    runtime.block_on(run(url, record_name, options));
}

async fn run(url: String, record_name: String, options: ClientOptions) {
    info!(%url, "ds-client-cli starting");
    let client = Client::new(url, options);

    client.on(ds_client::event_name::STATE_CHANGED, |event| {
        if let ds_client::ClientEvent::StateChanged(state) = event {
            info!(state = state.as_str(), "connection state changed");
        }
    });
    client.on("error", |event| {
        tracing::warn!(?event, "connection error");
    });

    // login() only succeeds while AWAITING_AUTHENTICATION, so wait for
    // that state rather than racing the handshake.
    let login_client = client.clone();
    client.on(ConnectionState::AwaitingAuthentication.as_str(), move |_| {
        let _ = login_client.login(serde_json::json!({"password": "demo"}), |success, data| {
            if success {
                info!(?data, "authenticated");
            } else {
                tracing::warn!(?data, "authentication failed");
            }
        });
    });

    let record = client.record(&record_name);
    record.lock().unwrap().on_ready(Box::new(move || {
        info!("record ready");
    }));
    record
        .lock()
        .unwrap()
        .subscribe(None, Box::new(|value| info!(?value, "record changed")), true);

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    info!("shutting down");
    let _ = client.close();
}
