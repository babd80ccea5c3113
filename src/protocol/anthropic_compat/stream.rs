//! Anthropic Messages SSE streaming (spec.md §4.7), grounded in `grafbase-nexus`'s
//! `AnthropicStreamProcessor`: a typed per-index content-block accumulator keyed by the
//! `content_block_start`/`content_block_delta`/`content_block_stop` triplet, unlike OpenAI's
//! flatter delta-only chunks.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::message::TokenUsage;
use crate::core::stream_part::{ChatResponse, PartialToolCall, StreamPart};
use crate::core::tool::ToolCall;
use crate::tool_name_map::ToolNameMap;

#[derive(Clone, Copy, PartialEq)]
enum BlockKind {
    Text,
    Thinking,
    ToolUse,
    ServerTool,
}

struct ToolAcc {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Default)]
pub struct AnthropicStreamProcessor {
    text: String,
    text_started: bool,
    reasoning: String,
    reasoning_started: bool,
    block_kinds: HashMap<u32, BlockKind>,
    tool_calls: HashMap<u32, ToolAcc>,
    tool_order: Vec<u32>,
    server_tool_blocks: Vec<Value>,
    stop_reason: Option<String>,
    usage_input: usize,
    usage_output: usize,
    id: Option<String>,
    model: Option<String>,
}

impl AnthropicStreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded SSE event payload (the `data:` JSON, tagged by its own `"type"` field —
    /// the Anthropic wire format repeats the event type in both the SSE `event:` line and the
    /// JSON body, so only the JSON is needed here).
    pub fn feed(&mut self, event: &Value) -> Vec<StreamPart> {
        let mut parts = Vec::new();
        match event.get("type").and_then(Value::as_str) {
            Some("message_start") => {
                if let Some(message) = event.get("message") {
                    self.id = message.get("id").and_then(Value::as_str).map(str::to_string);
                    self.model = message.get("model").and_then(Value::as_str).map(str::to_string);
                    if let Some(usage) = message.get("usage") {
                        self.usage_input = usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as usize;
                    }
                }
            }
            Some("content_block_start") => {
                let index = event.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                if let Some(block) = event.get("content_block") {
                    match block.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            self.block_kinds.insert(index, BlockKind::Text);
                            if !self.text_started {
                                parts.push(StreamPart::TextStart);
                                self.text_started = true;
                            }
                        }
                        Some("thinking") | Some("redacted_thinking") => {
                            self.block_kinds.insert(index, BlockKind::Thinking);
                            if !self.reasoning_started {
                                parts.push(StreamPart::ReasoningStart);
                                self.reasoning_started = true;
                            }
                        }
                        Some("tool_use") => {
                            self.block_kinds.insert(index, BlockKind::ToolUse);
                            let id = block.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
                            let name = block.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                            self.tool_order.push(index);
                            parts.push(StreamPart::ToolCallStart(PartialToolCall { id: id.clone(), function_name: name.clone(), arguments_json_delta: String::new() }));
                            self.tool_calls.insert(index, ToolAcc { id, name, arguments: String::new() });
                        }
                        Some("server_tool_use") | Some("web_search_tool_result") | Some("web_fetch_tool_result") => {
                            self.block_kinds.insert(index, BlockKind::ServerTool);
                            self.server_tool_blocks.push(block.clone());
                        }
                        _ => {}
                    }
                }
            }
            Some("content_block_delta") => {
                let index = event.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                if let Some(delta) = event.get("delta") {
                    match delta.get("type").and_then(Value::as_str) {
                        Some("text_delta") => {
                            if let Some(t) = delta.get("text").and_then(Value::as_str) {
                                self.text.push_str(t);
                                parts.push(StreamPart::TextDelta(t.to_string()));
                            }
                        }
                        Some("thinking_delta") => {
                            if let Some(t) = delta.get("thinking").and_then(Value::as_str) {
                                self.reasoning.push_str(t);
                                parts.push(StreamPart::ReasoningDelta(t.to_string()));
                            }
                        }
                        Some("input_json_delta") => {
                            if let Some(partial) = delta.get("partial_json").and_then(Value::as_str) {
                                if let Some(acc) = self.tool_calls.get_mut(&index) {
                                    acc.arguments.push_str(partial);
                                    parts.push(StreamPart::ToolCallDelta(PartialToolCall {
                                        id: acc.id.clone(),
                                        function_name: acc.name.clone(),
                                        arguments_json_delta: partial.to_string(),
                                    }));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            Some("content_block_stop") => {
                let index = event.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                if self.block_kinds.get(&index) == Some(&BlockKind::ToolUse) {
                    if let Some(acc) = self.tool_calls.get(&index) {
                        parts.push(StreamPart::ToolCallEnd(acc.id.clone()));
                    }
                }
            }
            Some("message_delta") => {
                if let Some(delta) = event.get("delta") {
                    if let Some(reason) = delta.get("stop_reason").and_then(Value::as_str) {
                        self.stop_reason = Some(reason.to_string());
                    }
                }
                if let Some(usage) = event.get("usage") {
                    self.usage_output = usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as usize;
                }
            }
            Some("message_stop") | Some("ping") => {}
            Some("error") => {
                let message = event.get("error").and_then(|e| e.get("message")).and_then(Value::as_str).unwrap_or("anthropic stream error").to_string();
                parts.push(StreamPart::Error(crate::core::error::Error::server(message)));
            }
            _ => {}
        }
        parts
    }

    /// Finalize: close open text/reasoning blocks, emit `ProviderMetadata`, then `Finish`.
    pub fn finalize(mut self, provider_id: &str, name_map: &ToolNameMap) -> Vec<StreamPart> {
        let mut parts = Vec::new();

        if self.reasoning_started {
            parts.push(StreamPart::ReasoningEnd(self.reasoning.clone()));
        }
        if self.text_started {
            parts.push(StreamPart::TextEnd(self.text.clone()));
        }

        let mut tool_calls = Vec::new();
        for index in &self.tool_order {
            if let Some(acc) = self.tool_calls.remove(index) {
                tool_calls.push(ToolCall::function(acc.id, name_map.to_local(&acc.name), acc.arguments));
            }
        }

        let mut provider_metadata = HashMap::new();
        let mut meta = serde_json::json!({"id": self.id, "model": self.model, "stopReason": self.stop_reason});
        if !self.server_tool_blocks.is_empty() {
            meta["serverToolResults"] = Value::Array(std::mem::take(&mut self.server_tool_blocks));
        }
        provider_metadata.insert(provider_id.to_string(), meta);
        parts.push(StreamPart::ProviderMetadata(provider_metadata.clone()));

        let response = ChatResponse {
            text: if self.text.is_empty() { None } else { Some(std::mem::take(&mut self.text)) },
            thinking: if self.reasoning.is_empty() { None } else { Some(std::mem::take(&mut self.reasoning)) },
            tool_calls,
            usage: Some(TokenUsage { input_tokens: self.usage_input, output_tokens: self.usage_output, total_tokens: self.usage_input + self.usage_output }),
            warnings: Vec::new(),
            provider_metadata,
        };
        parts.push(StreamPart::Finish(response));
        parts
    }
}
