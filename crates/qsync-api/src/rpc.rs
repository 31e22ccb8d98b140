//! JSON-RPC 2.0 framing and the QRC method payloads.
//!
//! Requests go out as one text frame each. Incoming frames are either
//! responses (carrying the request `id`) or notifications (carrying a
//! `method`). Frames may be NUL-terminated as on the raw TCP transport.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Error;
use crate::types::{ComponentInfo, Control, ControlUpdate};

// ── Method names ─────────────────────────────────────────────────────

pub const NO_OP: &str = "NoOp";
pub const GET_COMPONENTS: &str = "Component.GetComponents";
pub const GET_CONTROLS: &str = "Component.GetControls";
pub const COMPONENT_SET: &str = "Component.Set";
pub const CHANGE_GROUP_ADD_COMPONENT: &str = "ChangeGroup.AddComponentControl";
pub const CHANGE_GROUP_AUTO_POLL: &str = "ChangeGroup.AutoPoll";
pub const CHANGE_GROUP_POLL: &str = "ChangeGroup.Poll";
pub const ENGINE_STATUS: &str = "EngineStatus";

const JSONRPC_VERSION: &str = "2.0";

// ── Outgoing ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

/// Serialize a request frame.
pub fn encode_request(id: u64, method: &str, params: &Value) -> Result<String, Error> {
    serde_json::to_string(&Request {
        jsonrpc: JSONRPC_VERSION,
        id,
        method,
        params,
    })
    .map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: params.to_string(),
    })
}

pub fn get_controls_params(component: &str) -> Value {
    json!({ "Name": component })
}

pub fn set_value_params(component: &str, control: &str, value: f64) -> Value {
    json!({ "Name": component, "Controls": [{ "Name": control, "Value": value }] })
}

pub fn set_position_params(component: &str, control: &str, position: f64) -> Value {
    json!({ "Name": component, "Controls": [{ "Name": control, "Position": position }] })
}

pub fn add_component_controls_params(group: &str, component: &str, controls: &[String]) -> Value {
    let controls: Vec<Value> = controls.iter().map(|c| json!({ "Name": c })).collect();
    json!({ "Id": group, "Component": { "Name": component, "Controls": controls } })
}

pub fn auto_poll_params(group: &str, rate_secs: f64) -> Value {
    json!({ "Id": group, "Rate": rate_secs })
}

// ── Incoming ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// Payload of a change-group poll, pushed or returned.
///
/// `changes` stays raw so one malformed entry cannot sink the batch;
/// [`updates`](Self::updates) decodes them one at a time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PollResult {
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Value>,
}

impl PollResult {
    /// Decode each change on its own, skipping the ones that do not parse.
    pub fn updates(self) -> Vec<ControlUpdate> {
        let group = self.id;
        self.changes
            .into_iter()
            .filter_map(|change| match serde_json::from_value::<ControlUpdate>(change.clone()) {
                Ok(update) => Some(update),
                Err(e) => {
                    tracing::warn!(group = %group, error = %e, change = %change, "skipping malformed change");
                    None
                }
            })
            .collect()
    }
}

/// `Component.GetControls` result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentControls {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub controls: Vec<Control>,
}

/// A decoded incoming frame.
#[derive(Debug)]
pub enum Incoming {
    /// Reply to a request we sent.
    Response {
        id: u64,
        result: Result<Value, Error>,
    },
    /// Server-initiated `ChangeGroup.Poll`.
    Poll(PollResult),
    /// Any other notification (`EngineStatus`, ...).
    Notification { method: String, params: Value },
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<Incoming, Error> {
    let trimmed = text.trim_end_matches('\0');
    let raw: RawMessage = serde_json::from_str(trimmed).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: trimmed.to_owned(),
    })?;

    if let Some(method) = raw.method {
        let params = raw.params.unwrap_or(Value::Null);
        if method == CHANGE_GROUP_POLL {
            let poll = parse_result::<PollResult>(params)?;
            return Ok(Incoming::Poll(poll));
        }
        return Ok(Incoming::Notification { method, params });
    }

    let id = raw
        .id
        .as_ref()
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Deserialization {
            message: "frame has neither a method nor a numeric id".into(),
            body: trimmed.to_owned(),
        })?;

    let result = match raw.error {
        Some(err) => Err(Error::Rpc {
            code: err.code,
            message: err.message,
        }),
        None => Ok(raw.result.unwrap_or(Value::Null)),
    };

    Ok(Incoming::Response { id, result })
}

/// Deserialize a result payload into a typed value.
pub fn parse_result<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, Error> {
    let body = value.to_string();
    serde_json::from_value(value).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Parse a `Component.GetComponents` result.
pub fn parse_components(value: Value) -> Result<Vec<ComponentInfo>, Error> {
    parse_result(value)
}

/// Interpret a response result as poll data when it belongs to `group`.
///
/// Some cores answer `ChangeGroup.AutoPoll` with repeated responses that
/// reuse the original request id instead of pushing notifications.
pub fn poll_from_result(value: &Value, group: &str) -> Option<PollResult> {
    let poll: PollResult = serde_json::from_value(value.clone()).ok()?;
    (poll.id == group).then_some(poll)
}
