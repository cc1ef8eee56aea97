//! Minimal probe agent: connects to a control plane, registers itself, and
//! reports a heartbeat every 30 s. Exercises `legator-probe` end-to-end
//! against a real server; point it at `legator-server`'s `/ws/probe` route.
//!
//! ```text
//! cargo run -p legator-probe --example probe_agent -- ws://127.0.0.1:8080 demo-probe dev-key
//! ```

use std::sync::Arc;

use legator_core::{MessageType, ProbeId, RegisterPayload};
use legator_probe::{ProbeClient, ProbeClientConfig};
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let server_url = args.next().unwrap_or_else(|| "ws://127.0.0.1:8080".into());
    let probe_id = args.next().unwrap_or_else(|| "demo-probe".into());
    let api_key = args.next().unwrap_or_else(|| "dev-key".into());

    let client = ProbeClient::new(ProbeClientConfig::new(
        server_url,
        ProbeId::from(probe_id.as_str()),
        api_key,
    ));

    let mut inbox = client.inbox();
    let (stop_tx, stop_rx) = watch::channel(None::<String>);

    let run_handle = tokio::spawn(Arc::clone(&client).run(stop_rx));

    let register = RegisterPayload {
        probe_id: probe_id.clone(),
        tags: vec!["demo".into()],
        inventory: None,
    };
    if let Err(e) = client
        .send(MessageType::Register, serde_json::to_value(register).unwrap())
        .await
    {
        tracing::warn!(error = %e, "initial register send failed; the reconnect loop will retry once connected");
    }

    let inbox_task = tokio::spawn(async move {
        while let Some(envelope) = inbox.recv().await {
            tracing::info!(?envelope.message_type, "received envelope from control plane");
        }
    });

    tokio::signal::ctrl_c().await.ok();
    let _ = stop_tx.send(Some("ctrl-c".into()));
    let _ = run_handle.await;
    inbox_task.abort();
}
