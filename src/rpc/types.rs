//! JSON-RPC message types.
//!
//! This module defines the request and response shapes exchanged with the
//! server process, one JSON value per line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version carried in every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Protocol version, always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// Correlation token, unique per in-flight call.
    pub id: u64,
    /// Name of the remote operation.
    pub method: String,
    /// Method-specific parameters.
    pub params: Map<String, Value>,
}

impl Request {
    /// Create a request with the given id, method and parameters.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Serialize the request to a single line of JSON (without terminator).
    ///
    /// JSON string escaping guarantees the result contains no raw newline.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter value cannot be serialized.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error object reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteError {
    /// Error code, when the server supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable message.
    pub message: String,
    /// Additional error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Payload of a well-formed response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// The call succeeded.
    Result(Value),
    /// The server reported an error.
    Error(RemoteError),
}

/// Response read from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Id echoed by the server. `None` when the server could not determine it.
    pub id: Option<u64>,
    /// Result or error payload.
    pub outcome: ResponseOutcome,
}

impl Response {
    /// Returns `true` if the server reported an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Error(_))
    }

    /// Returns the result payload, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    /// Returns the remote error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RemoteError> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(err) => Some(err),
        }
    }

    /// Convert into the result payload, or the remote error.
    ///
    /// # Errors
    ///
    /// Returns the [`RemoteError`] if the server reported one.
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.outcome {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(err) => Err(err),
        }
    }
}

/// Wire shape of a response before validation.
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteError>,
}

/// A line received from the server, classified.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Incoming {
    /// A response to some request.
    Response(Response),
    /// A server-initiated notification or request, not part of any exchange.
    Notification { method: String },
}

impl Incoming {
    /// Classify one line of server output.
    ///
    /// Returns a human-readable reason when the line is not a well-formed
    /// JSON-RPC message.
    pub(crate) fn parse(line: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;

        let Value::Object(map) = &value else {
            return Err("expected a JSON object".to_string());
        };

        if let Some(method) = map.get("method").and_then(Value::as_str) {
            if !map.contains_key("result") && !map.contains_key("error") {
                return Ok(Self::Notification {
                    method: method.to_string(),
                });
            }
        }

        // A `null` result is still a result.
        let has_result = map.contains_key("result");
        let raw: RawResponse = serde_json::from_value(value).map_err(|e| e.to_string())?;
        let outcome = match (has_result, raw.error) {
            (true, None) => ResponseOutcome::Result(raw.result.unwrap_or(Value::Null)),
            (false, Some(error)) => ResponseOutcome::Error(error),
            (true, Some(_)) => return Err("response has both result and error".to_string()),
            (false, None) => return Err("response has neither result nor error".to_string()),
        };

        Ok(Self::Response(Response {
            id: raw.id,
            outcome,
        }))
    }
}
