//! MCP tool requests and payload decoding.
//!
//! Servers expose named tools through two methods:
//! - `tools/list` enumerates them
//! - `tools/call` invokes one with `{"name": ..., "arguments": {...}}`
//!
//! A successful `tools/call` result wraps the tool's own output as text in
//! `result.content[0].text`; that text is usually JSON and is decoded again.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DriverError;
use crate::rpc::{Exchange, Request};

/// Method that lists available tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";

/// Method that invokes a tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Tool that lists the server's toolsets.
pub const TOOL_LIST_TOOLSETS: &str = "list_available_toolsets";

/// Tool that lists the tools of one toolset.
pub const TOOL_GET_TOOLSET_TOOLS: &str = "get_toolset_tools";

/// Errors that can occur while decoding a tool result.
#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    /// The result has no `content[0].text` entry.
    #[error("Result has no text content")]
    MissingContent,

    /// The result has no `tools` array.
    #[error("Result has no tool list")]
    MissingTools,

    /// The tool ran but reported failure.
    #[error("Tool reported an error: {0}")]
    ToolFailed(String),

    /// The text content is not JSON.
    #[error("Tool output is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),
}

/// A tool advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, used as `params.name` in `tools/call`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A named group of tools that can be enabled on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolset {
    /// Toolset name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the toolset is currently enabled.
    #[serde(default)]
    pub enabled: bool,
}

/// Build `tools/call` parameters.
#[must_use]
pub fn call_params(name: &str, arguments: Map<String, Value>) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("name".to_string(), Value::String(name.to_string()));
    params.insert("arguments".to_string(), Value::Object(arguments));
    params
}

impl Request {
    /// Build a `tools/list` request.
    #[must_use]
    pub fn tools_list(id: u64) -> Self {
        Self::new(id, METHOD_TOOLS_LIST, Map::new())
    }

    /// Build a `tools/call` request for `name` with `arguments`.
    #[must_use]
    pub fn tools_call(id: u64, name: &str, arguments: Map<String, Value>) -> Self {
        Self::new(id, METHOD_TOOLS_CALL, call_params(name, arguments))
    }
}

/// Extract the tool list from a `tools/list` result.
///
/// # Errors
///
/// Returns [`PayloadError::MissingTools`] if the result has no `tools` array,
/// or [`PayloadError::NotJson`] if an entry is not a tool descriptor.
pub fn parse_tool_list(result: &Value) -> Result<Vec<ToolDescriptor>, PayloadError> {
    let tools = result.get("tools").ok_or(PayloadError::MissingTools)?;
    if !tools.is_array() {
        return Err(PayloadError::MissingTools);
    }
    Ok(serde_json::from_value(tools.clone())?)
}

/// Return the text of the first content entry of a `tools/call` result.
///
/// # Errors
///
/// Returns [`PayloadError::MissingContent`] if there is no text entry, or
/// [`PayloadError::ToolFailed`] if the result is flagged with `isError`.
pub fn content_text(result: &Value) -> Result<&str, PayloadError> {
    let text = result
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingContent)?;

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(PayloadError::ToolFailed(text.to_string()));
    }

    Ok(text)
}

/// Decode the nested JSON payload of a `tools/call` result.
///
/// # Errors
///
/// See [`content_text`]; additionally [`PayloadError::NotJson`] if the text
/// does not parse.
pub fn decode_tool_payload(result: &Value) -> Result<Value, PayloadError> {
    let text = content_text(result)?;
    Ok(serde_json::from_str(text)?)
}

/// Decode a toolset listing from a `list_available_toolsets` result.
///
/// # Errors
///
/// See [`decode_tool_payload`].
pub fn parse_toolsets(result: &Value) -> Result<Vec<Toolset>, PayloadError> {
    let payload = decode_tool_payload(result)?;
    Ok(serde_json::from_value(payload)?)
}

/// Decode the tools of one toolset from a `get_toolset_tools` result.
///
/// # Errors
///
/// See [`decode_tool_payload`].
pub fn parse_toolset_tools(result: &Value) -> Result<Vec<ToolDescriptor>, PayloadError> {
    let payload = decode_tool_payload(result)?;
    Ok(serde_json::from_value(payload)?)
}

/// A toolset together with its tools.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolsetListing {
    pub toolset: Toolset,
    /// The toolset's tools, or why they could not be fetched.
    pub tools: Result<Vec<ToolDescriptor>, String>,
}

/// List every toolset, then fetch the tools of each one.
///
/// Each request is bounded by `timeout`. A failed per-toolset lookup is
/// kept in its listing and the remaining toolsets are still queried.
///
/// # Errors
///
/// Returns a `DriverError` if the toolset listing itself fails, or if the
/// session fails while fetching a toolset's tools.
pub async fn list_toolsets<E>(
    exchange: &mut E,
    timeout: Duration,
) -> Result<Vec<ToolsetListing>, DriverError>
where
    E: Exchange + ?Sized,
{
    let result = exchange
        .exchange(METHOD_TOOLS_CALL, call_params(TOOL_LIST_TOOLSETS, Map::new()), timeout)
        .await?
        .into_result()?;
    let toolsets = parse_toolsets(&result)?;

    let mut listings = Vec::with_capacity(toolsets.len());
    for toolset in toolsets {
        let mut arguments = Map::new();
        arguments.insert("toolset".to_string(), Value::String(toolset.name.clone()));

        let tools = match exchange
            .exchange(
                METHOD_TOOLS_CALL,
                call_params(TOOL_GET_TOOLSET_TOOLS, arguments),
                timeout,
            )
            .await
        {
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => Err(e.to_string()),
            Ok(response) => match response.into_result() {
                Ok(result) => parse_toolset_tools(&result).map_err(|e| e.to_string()),
                Err(remote) => Err(format!("Server error: {remote}")),
            },
        };

        if let Err(reason) = &tools {
            tracing::warn!(toolset = %toolset.name, %reason, "Could not fetch toolset tools");
        }
        listings.push(ToolsetListing { toolset, tools });
    }
    Ok(listings)
}
