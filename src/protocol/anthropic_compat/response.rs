//! Anthropic Messages response parsing, non-streaming path (spec.md §4.7).
//!
//! Grounded in `grafbase-nexus`'s `AnthropicResponse`/`AnthropicContent` shape: content blocks
//! are a flat array tagged by `type`, with `text` and `tool_use` blocks interleaved.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::error::{Error, Result};
use crate::core::message::{ChatMessage, Role, TokenUsage, TypedBody};
use crate::core::stream_part::{ChatResponse, ChatResponseWithAssistantMessage};
use crate::core::tool::ToolCall;
use crate::tool_name_map::ToolNameMap;

pub fn parse_messages_response(provider_id: &str, body: &Value, name_map: &ToolNameMap) -> Result<ChatResponseWithAssistantMessage> {
    let content = body.get("content").and_then(Value::as_array).ok_or_else(|| Error::response_format("missing content[]"))?;

    let mut text = String::new();
    let mut thinking: Option<String> = None;
    let mut tool_calls = Vec::new();
    let mut web_search_results = Vec::new();

    for block in content {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(t) = block.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                }
            }
            Some("thinking") | Some("redacted_thinking") => {
                if let Some(t) = block.get("thinking").and_then(Value::as_str) {
                    thinking.get_or_insert_with(String::new).push_str(t);
                } else if block.get("type").and_then(Value::as_str) == Some("redacted_thinking") {
                    thinking.get_or_insert_with(String::new).push_str("[redacted]");
                }
            }
            Some("tool_use") => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
                let wire_name = block.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                let arguments_json = block.get("input").map(|v| v.to_string()).unwrap_or_else(|| "{}".to_string());
                tool_calls.push(ToolCall::function(id, name_map.to_local(&wire_name), arguments_json));
            }
            Some("server_tool_use") | Some("web_search_tool_result") | Some("web_fetch_tool_result") => {
                web_search_results.push(block.clone());
            }
            _ => {}
        }
    }

    let usage = body.get("usage").map(|u| TokenUsage {
        input_tokens: u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        output_tokens: u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        total_tokens: (u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) + u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0)) as usize,
    });

    let mut provider_metadata = HashMap::new();
    let mut meta = serde_json::json!({
        "id": body.get("id").and_then(Value::as_str),
        "model": body.get("model").and_then(Value::as_str),
        "stopReason": body.get("stop_reason").and_then(Value::as_str),
    });
    if !web_search_results.is_empty() {
        meta["serverToolResults"] = Value::Array(web_search_results);
    }
    provider_metadata.insert(provider_id.to_string(), meta);

    let response = ChatResponse {
        text: if text.is_empty() { None } else { Some(text.clone()) },
        thinking: thinking.clone(),
        tool_calls: tool_calls.clone(),
        usage,
        warnings: Vec::new(),
        provider_metadata,
    };

    let assistant_message = ChatMessage {
        role: Role::Assistant,
        content_text: if text.is_empty() { None } else { Some(text) },
        typed_body: if tool_calls.is_empty() { TypedBody::Text(response.text.clone().unwrap_or_default()) } else { TypedBody::ToolUse(tool_calls) },
        reasoning: thinking,
        name: None,
        provider_options: Default::default(),
        protocol_payloads: Default::default(),
    };

    Ok(ChatResponseWithAssistantMessage { response, assistant_message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_tool_use_blocks() {
        let body = serde_json::json!({
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "tool_use",
            "content": [
                {"type": "text", "text": "checking"},
                {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "nyc"}},
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5},
        });
        let parsed = parse_messages_response("anthropic", &body, &ToolNameMap::default()).unwrap();
        assert_eq!(parsed.response.text.as_deref(), Some("checking"));
        assert_eq!(parsed.response.tool_calls[0].function_name, "get_weather");
        assert_eq!(parsed.response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn server_tool_results_surface_only_in_provider_metadata() {
        let body = serde_json::json!({
            "content": [
                {"type": "server_tool_use", "id": "srvtoolu_1", "name": "web_search", "input": {"query": "rust"}},
                {"type": "web_search_tool_result", "tool_use_id": "srvtoolu_1", "content": []},
            ],
        });
        let parsed = parse_messages_response("anthropic", &body, &ToolNameMap::default()).unwrap();
        assert!(parsed.response.tool_calls.is_empty());
        assert!(parsed.response.provider_metadata["anthropic"]["serverToolResults"].as_array().unwrap().len() == 2);
    }
}
