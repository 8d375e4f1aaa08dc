// Path: crates/corenet-rpc/src/protocol.rs
//! The JSON-RPC 2.0-like request/response shapes carried in the admin
//! channel's HTTP body (§6: `{method, params, id, version}` in,
//! `{type, result, id, version}` out).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    pub id: u64,
    #[serde(default)]
    pub version: u8,
}

/// One error in the array a failed command returns under `result`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    pub code: i64,
    pub message: String,
}

impl CommandError {
    pub fn new(code: i64, message: impl Into<String>) -> CommandError {
        CommandError { code, message: message.into() }
    }

    /// The reserved code for "method does not resolve to any registered
    /// command or alias".
    pub fn unknown_method(method: &str) -> CommandError {
        CommandError::new(-1, format!("unknown method '{method}'"))
    }
}

/// What a command handler returns on success. The discriminant is the
/// wire `type` tag: 0=null, 1=string, 2=int64, 3=double, 4=bool, 5=json.
#[derive(Debug, Clone)]
pub enum ResponseValue {
    Null,
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Json(Value),
}

impl ResponseValue {
    pub fn type_tag(&self) -> u8 {
        match self {
            ResponseValue::Null => 0,
            ResponseValue::Str(_) => 1,
            ResponseValue::Int(_) => 2,
            ResponseValue::Double(_) => 3,
            ResponseValue::Bool(_) => 4,
            ResponseValue::Json(_) => 5,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            ResponseValue::Null => Value::Null,
            ResponseValue::Str(s) => Value::String(s),
            ResponseValue::Int(i) => Value::from(i),
            ResponseValue::Double(d) => Value::from(d),
            ResponseValue::Bool(b) => Value::Bool(b),
            ResponseValue::Json(v) => v,
        }
    }
}

/// What a command handler returns. `Err` carries a family-specific
/// negative code plus message; the spec reserves `-1` for "unknown
/// method" specifically (see [`CommandError::unknown_method`]).
pub type CommandResult = Result<ResponseValue, Vec<CommandError>>;

#[derive(Debug, Serialize)]
struct JsonRpcResponseBody {
    #[serde(rename = "type")]
    ty: u8,
    result: Value,
    id: u64,
    version: u8,
}

/// Serializes a command's outcome into the `{type, result, id, version}`
/// body. A successful [`ResponseValue`] sets `type` to its own tag; a
/// failure always reports as `type = 5` (json) with `result` holding the
/// error array, matching the spec's "errors appear as a JSON array under
/// `result`" wording.
pub fn build_response_body(outcome: CommandResult, id: u64, version: u8) -> Vec<u8> {
    let (ty, result) = match outcome {
        Ok(value) => (value.type_tag(), value.into_json()),
        Err(errors) => (5u8, serde_json::to_value(errors).unwrap_or(Value::Null)),
    };
    serde_json::to_vec(&JsonRpcResponseBody { ty, result, id, version }).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_params_and_version() {
        let req: JsonRpcRequest = serde_json::from_str(r#"{"method":"ping","id":7}"#).unwrap();
        assert_eq!(req.method, "ping");
        assert!(req.params.is_empty());
        assert_eq!(req.version, 0);
    }

    #[test]
    fn success_body_carries_its_type_tag() {
        let body = build_response_body(Ok(ResponseValue::Int(42)), 1, 2);
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["type"], 2);
        assert_eq!(parsed["result"], 42);
        assert_eq!(parsed["id"], 1);
    }

    #[test]
    fn error_body_is_an_array_under_type_five() {
        let body = build_response_body(Err(vec![CommandError::unknown_method("nope")]), 3, 1);
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["type"], 5);
        assert_eq!(parsed["result"][0]["code"], -1);
    }
}
