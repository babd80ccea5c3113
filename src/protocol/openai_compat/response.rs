//! Chat Completions response parsing, non-streaming path (spec.md §4.6).

use std::collections::HashMap;

use serde_json::Value;

use crate::core::error::{Error, Result};
use crate::core::message::{ChatMessage, Role, TypedBody};
use crate::core::stream_part::{ChatResponse, ChatResponseWithAssistantMessage};
use crate::core::tool::ToolCall;
use crate::core::message::TokenUsage;
use crate::tool_name_map::ToolNameMap;

/// Extract `<think>…</think>`-wrapped reasoning from a text response, returning
/// `(stripped_text, extracted_reasoning)`.
fn extract_think_tags(text: &str) -> (String, Option<String>) {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";
    if let Some(start) = text.find(OPEN) {
        if let Some(end) = text[start..].find(CLOSE) {
            let end = start + end;
            let reasoning = text[start + OPEN.len()..end].to_string();
            let mut stripped = String::with_capacity(text.len());
            stripped.push_str(&text[..start]);
            stripped.push_str(&text[end + CLOSE.len()..]);
            return (stripped.trim().to_string(), Some(reasoning.trim().to_string()));
        }
    }
    (text.to_string(), None)
}

pub fn parse_chat_completion_response(provider_id: &str, body: &Value, name_map: &ToolNameMap) -> Result<ChatResponseWithAssistantMessage> {
    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| Error::response_format("missing choices[0]"))?;
    let message = choice.get("message").ok_or_else(|| Error::response_format("missing choices[0].message"))?;

    let raw_text = message.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
    let (text, think_extracted) = extract_think_tags(&raw_text);

    let thinking = message
        .get("reasoning")
        .or_else(|| message.get("thinking"))
        .or_else(|| message.get("reasoning_content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(think_extracted);

    let tool_calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|c| {
                    let id = c.get("id")?.as_str()?.to_string();
                    let function = c.get("function")?;
                    let wire_name = function.get("name")?.as_str()?.to_string();
                    let arguments_json = function.get("arguments")?.as_str().unwrap_or("{}").to_string();
                    Some(ToolCall::function(id, name_map.to_local(&wire_name), arguments_json))
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = body.get("usage").map(|u| TokenUsage {
        input_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        output_tokens: u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        total_tokens: u.get("total_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
    });

    let mut provider_metadata = HashMap::new();
    provider_metadata.insert(
        provider_id.to_string(),
        serde_json::json!({
            "id": body.get("id").and_then(Value::as_str),
            "model": body.get("model").and_then(Value::as_str),
            "systemFingerprint": body.get("system_fingerprint").and_then(Value::as_str),
            "finishReason": choice.get("finish_reason").and_then(Value::as_str),
        }),
    );

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
    fn extracts_content_and_tool_calls() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4.1",
            "choices": [{
                "finish_reason": "stop",
                "message": {"content": "Hello", "tool_calls": null}
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4},
        });
        let parsed = parse_chat_completion_response("openai", &body, &ToolNameMap::default()).unwrap();
        assert_eq!(parsed.response.text.as_deref(), Some("Hello"));
        assert_eq!(parsed.response.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn think_tags_are_extracted_into_thinking() {
        let body = serde_json::json!({
            "choices": [{"finish_reason": "stop", "message": {"content": "<think>pondering</think>answer"}}],
        });
        let parsed = parse_chat_completion_response("deepseek", &body, &ToolNameMap::default()).unwrap();
        assert_eq!(parsed.response.text.as_deref(), Some("answer"));
        assert_eq!(parsed.response.thinking.as_deref(), Some("pondering"));
    }

    #[test]
    fn tool_call_names_are_translated_back_through_name_map() {
        let body = serde_json::json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "web_search__1", "arguments": "{}"}}]
                }
            }],
        });
        let (map, _) = ToolNameMap::build(
            &[crate::core::tool::FunctionTool { name: "web_search".into(), description: String::new(), parameters_schema: serde_json::json!({}) }],
            &["web_search".to_string()],
        );
        let parsed = parse_chat_completion_response("anthropic", &body, &map).unwrap();
        assert_eq!(parsed.response.tool_calls[0].function_name, "web_search");
    }
}
