//! Tool definitions, calls, and results (spec.md §3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::provider_options::ProviderOptions;

/// A locally-executable function tool, described to the model as a JSON-Schema-typed function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    /// JSON-Schema subset describing accepted arguments.
    pub parameters_schema: Value,
}

/// A reference to a provider-executed tool (e.g. `anthropic.web_search_20250305`), along with
/// provider-specific options for it. Never surfaced through `tool_name_map` — calls made by a
/// `ProviderTool` arrive only in `providerMetadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTool {
    /// Stable typed id, e.g. `"openai.web_search_preview"`.
    pub id: String,
    #[serde(default)]
    pub options: HashMap<String, Value>,
}

/// How a model may pick tools for a single call.
#[derive(Debug, Clone)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Function { name: String },
}

/// A single tool call emitted by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub call_type: String,
    pub function_name: String,
    pub arguments_json: String,
    pub provider_options: ProviderOptions,
}

impl ToolCall {
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments_json: impl Into<String>) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function_name: name.into(),
            arguments_json: arguments_json.into(),
            provider_options: ProviderOptions::default(),
        }
    }

    /// Parse `arguments_json` into a `Value`, defaulting to an empty object on malformed JSON
    /// so a single bad tool call never panics a caller that reads this eagerly.
    pub fn arguments(&self) -> Value {
        serde_json::from_str(&self.arguments_json).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// The outcome fed back to the model for a single `ToolCall`.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ToolResult { tool_call_id: tool_call_id.into(), content: content.into(), is_error: false }
    }

    pub fn failure(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        ToolResult { tool_call_id: tool_call_id.into(), content: message.into(), is_error: true }
    }

    /// JSON-encode a handler's return value into the string content the model expects, the
    /// way spec.md §4.8 step 4 requires (strings/numbers/bools pass through, everything else
    /// is JSON-encoded).
    pub fn from_handler_output(tool_call_id: impl Into<String>, output: Value) -> Self {
        let content = match &output {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        };
        ToolResult::success(tool_call_id, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_arguments_json_falls_back_to_empty_object() {
        let call = ToolCall::function("call_1", "add", "{not json");
        assert_eq!(call.arguments(), serde_json::json!({}));
    }

    #[test]
    fn handler_output_passthrough_for_scalars() {
        assert_eq!(ToolResult::from_handler_output("id", Value::String("ok".into())).content, "ok");
        assert_eq!(ToolResult::from_handler_output("id", serde_json::json!(42)).content, "42");
        assert_eq!(ToolResult::from_handler_output("id", serde_json::json!(true)).content, "true");
    }

    #[test]
    fn handler_output_json_encodes_objects() {
        let out = ToolResult::from_handler_output("id", serde_json::json!({"a": 1}));
        assert_eq!(out.content, "{\"a\":1}");
        assert!(!out.is_error);
    }
}
