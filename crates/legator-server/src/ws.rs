//! `GET /ws/probe?id={probe_id}` upgrade handler, per SPEC_FULL.md §10.
//! Accepts the probe's connection, decodes inbound envelopes into fleet
//! snapshot updates and tracker completions, and holds the per-connection
//! outbound sender so `POST /commands` can reach a live probe.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use legator_core::{
    BusEvent, CommandResultPayload, Envelope, HeartbeatPayload, MessageType, ProbeId,
    RegisterPayload,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    id: String,
}

/// Capacity of a single probe's outbound mailbox; dispatched commands and
/// policy pushes queue here until the connection's writer task drains them.
const OUTBOUND_CAPACITY: usize = 32;

pub async fn upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<ProbeQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let probe_id = ProbeId::from(query.id);
    ws.on_upgrade(move |socket| handle_connection(socket, probe_id, state))
}

#[instrument(skip(socket, state), fields(%probe_id))]
async fn handle_connection(socket: WebSocket, probe_id: ProbeId, state: AppState) {
    info!("probe connected");
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
    state.outbound.insert(probe_id.clone(), outbound_tx);

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&text, &probe_id, &state).await,
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(Message::Binary(_)) => warn!("ignoring unexpected binary frame from probe"),
        }
    }

    state.outbound.remove(&probe_id);
    state.fleet.mark_offline(&probe_id);
    state.bus.publish(BusEvent::probe_disconnected(probe_id.clone()));
    writer.abort();
    info!("probe disconnected");
}

async fn handle_text(text: &str, probe_id: &ProbeId, state: &AppState) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "malformed envelope from probe, skipping");
            return;
        }
    };

    match envelope.message_type {
        MessageType::Register => match envelope.decode_payload::<RegisterPayload>() {
            Ok(payload) => state.fleet.register(payload),
            Err(e) => warn!(error = %e, "malformed register payload, skipping"),
        },
        MessageType::Heartbeat => match envelope.decode_payload::<HeartbeatPayload>() {
            Ok(payload) => state.fleet.heartbeat(payload),
            Err(e) => warn!(error = %e, "malformed heartbeat payload, skipping"),
        },
        MessageType::Inventory => match envelope.decode_payload::<legator_core::Inventory>() {
            Ok(inventory) => state.fleet.update_inventory(probe_id, inventory),
            Err(e) => warn!(error = %e, "malformed inventory payload, skipping"),
        },
        MessageType::CommandResult => match envelope.decode_payload::<CommandResultPayload>() {
            Ok(result) => {
                let request_id = result.request_id.clone().into();
                if state.tracker.complete(&request_id, result).is_err() {
                    warn!(%request_id, "command result for unknown or expired request, dropping");
                }
            }
            Err(e) => warn!(error = %e, "malformed command_result payload, skipping"),
        },
        other => {
            warn!(?other, "unhandled message type from probe, skipping");
        }
    }
}

/// Route an outbound envelope to a connected probe's writer task. Returns
/// `false` if the probe has no live connection — the caller (the
/// `/commands` handler) treats that as a validation failure, not a retry.
pub fn dispatch(state: &AppState, probe_id: &ProbeId, envelope: &Envelope) -> bool {
    let Some(sender) = state.outbound.get(probe_id) else {
        return false;
    };
    let Ok(text) = serde_json::to_string(envelope) else {
        return false;
    };
    sender.try_send(Message::Text(text.into())).is_ok()
}
