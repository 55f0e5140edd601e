//! JSON-RPC 2.0 message envelopes for the MCP stdio transport.
//!
//! One message per line, requests carry an `id`, notifications do not
//! and never receive a response. The server only ever answers; it
//! never initiates a message of its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC error codes used by the host. The `-32000` range codes
/// are MCP-specific.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
}

/// Incoming request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    /// Present for requests, absent for notifications. May be a number
    /// or a string; echoed back untouched.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outgoing response, exactly one of `result`/`error` set.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    /// `null` only for replies to unparseable messages.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_distinguishes_notifications() {
        let req: Request =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "ping", "id": 7}))
                .expect("request");
        assert!(!req.is_notification());
        assert_eq!(req.id, Some(json!(7)));

        let note: Request = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .expect("notification");
        assert!(note.is_notification());
        assert!(note.params.is_null());
    }

    #[test]
    fn test_response_serializes_one_branch() {
        let ok = serde_json::to_value(Response::success(json!(1), json!({"x": true})))
            .expect("serialize");
        assert_eq!(ok["jsonrpc"], "2.0");
        assert_eq!(ok["result"]["x"], true);
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(Response::failure(
            Value::Null,
            codes::PARSE_ERROR,
            "parse error",
        ))
        .expect("serialize");
        assert!(err["id"].is_null());
        assert_eq!(err["error"]["code"], -32700);
        assert!(err.get("result").is_none());
    }
}
