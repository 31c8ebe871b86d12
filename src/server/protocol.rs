//! JSON-RPC 2.0 message types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Malformed JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Valid JSON that is not a request object.
pub const INVALID_REQUEST: i64 = -32600;
/// Unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Missing or invalid parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Failure while handling an otherwise valid request.
pub const INTERNAL_ERROR: i64 = -32603;

/// An incoming request or notification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Request {
    /// Protocol marker, expected to be `"2.0"`.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Absent for notifications. An explicit `null` is `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// A request without an `id` member is a notification and gets no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Keeps a present `null` apart from a missing field, which `#[serde(default)]`
/// turns into `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RpcError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// An outgoing response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The request id, or `null` if it could not be determined.
    pub id: Value,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Successful response.
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// A request failure carrying its JSON-RPC code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProtocolError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

impl ProtocolError {
    /// Error with `code` and `message`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: Request = serde_json::from_value(json!({ "method": "ping" })).unwrap();
        assert_eq!(req.id, None);
        assert_eq!(req.params, Value::Null);
        assert!(req.is_notification());

        let req: Request =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" })).unwrap();
        assert!(!req.is_notification());
    }

    #[test]
    fn test_null_id_is_a_request() {
        let req: Request =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": null, "method": "ping" })).unwrap();
        assert_eq!(req.id, Some(Value::Null));
        assert!(!req.is_notification());
        assert_eq!(serde_json::to_value(&req).unwrap().get("id"), Some(&Value::Null));
    }

    #[test]
    fn test_response_shape() {
        assert_eq!(
            serde_json::to_value(Response::ok(json!(1), json!({}))).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 1, "result": {} })
        );
        assert_eq!(
            serde_json::to_value(Response::err(Value::Null, PARSE_ERROR, "bad")).unwrap(),
            json!({ "jsonrpc": "2.0", "id": null, "error": { "code": -32700, "message": "bad" } })
        );
    }
}
