use axum::extract::State;
use axum::Json;
use legator_core::{CommandPayload, CommandResultPayload, Envelope, MessageType, ProbeId, RequestId};
use serde::Deserialize;
use std::time::Duration;

use crate::error::ServerError;
use crate::state::AppState;
use crate::ws;

const DEFAULT_TIMEOUT_NS: u64 = 30_000_000_000;
/// Upper bound the HTTP caller waits before the response itself times out,
/// independent of the tracker's own TTL reaper — this keeps a slow client
/// from holding the connection open past the tracker's own expiry.
const RESPONSE_WAIT_CAP: Duration = Duration::from_secs(150);

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    probe_id: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default = "default_timeout_ns")]
    timeout_ns: u64,
    #[serde(default = "default_capability_level")]
    capability_level: String,
}

fn default_timeout_ns() -> u64 {
    DEFAULT_TIMEOUT_NS
}

fn default_capability_level() -> String {
    "standard".to_owned()
}

/// Dispatches a command to a connected probe and waits for its result, per
/// spec.md §4.5 / SPEC_FULL.md §10's "`POST /commands` dispatches via
/// `legator-tracker` + `legator-probe`'s outbound `send`" (the server side
/// of that send is `ws::dispatch`, the per-connection outbound mailbox).
pub async fn dispatch(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResultPayload>, ServerError> {
    if req.command.trim().is_empty() {
        return Err(ServerError::Validation("command must not be empty".into()));
    }
    let probe_id = ProbeId::from(req.probe_id);
    let request_id = RequestId::new();

    let tracked = state.tracker.track(
        request_id.clone(),
        probe_id.clone(),
        req.command.clone(),
        req.capability_level.clone(),
    );

    let envelope = Envelope::new(
        MessageType::Command,
        serde_json::to_value(CommandPayload {
            request_id: request_id.to_string(),
            command: req.command,
            args: req.args,
            timeout_ns: req.timeout_ns,
            capability_level: req.capability_level,
        })
        .expect("CommandPayload always serializes"),
    );

    if !ws::dispatch(&state, &probe_id, &envelope) {
        state.tracker.cancel(&request_id);
        return Err(ServerError::NotFound(format!(
            "probe {probe_id} is not connected"
        )));
    }

    match tokio::time::timeout(RESPONSE_WAIT_CAP, tracked.receiver).await {
        Ok(Ok(result)) => Ok(Json(result)),
        Ok(Err(_)) => Err(ServerError::Timeout),
        Err(_) => {
            state.tracker.cancel(&request_id);
            Err(ServerError::Timeout)
        }
    }
}
