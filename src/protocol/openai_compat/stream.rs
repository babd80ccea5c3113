//! Chat Completions SSE streaming (spec.md §4.6 "Streaming").
//!
//! Per-index tool-call accumulation: the provider sends the tool call's `id` only on the first
//! delta for a given `index`; `index` is the stable key used to merge subsequent argument
//! fragments, matching spec.md's scenario seed 2.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::message::TokenUsage;
use crate::core::stream_part::{ChatResponse, PartialToolCall, StreamPart};
use crate::core::tool::ToolCall;
use crate::tool_name_map::ToolNameMap;

#[derive(Default, Clone)]
struct ToolAcc {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    started: bool,
}

/// Per-stream state. Never shared between concurrent invocations (spec.md §5).
#[derive(Default)]
pub struct OpenAiStreamProcessor {
    text: String,
    text_started: bool,
    text_ended: bool,
    reasoning: String,
    reasoning_started: bool,
    reasoning_ended: bool,
    tool_order: Vec<u32>,
    tool_calls: HashMap<u32, ToolAcc>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
    model: Option<String>,
    id: Option<String>,
}

impl OpenAiStreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded JSON chunk (the `data:` payload of one SSE event). Returns the stream
    /// parts this chunk produced; does not emit `Finish` — call `finalize()` once the
    /// underlying SSE stream truly ends (`[DONE]` or connection close), since usage-only
    /// trailer chunks may still arrive after the `finish_reason` chunk.
    pub fn feed(&mut self, chunk: &Value) -> Vec<StreamPart> {
        let mut parts = Vec::new();

        if let Some(id) = chunk.get("id").and_then(Value::as_str) {
            self.id = Some(id.to_string());
        }
        if let Some(model) = chunk.get("model").and_then(Value::as_str) {
            self.model = Some(model.to_string());
        }
        if let Some(usage) = chunk.get("usage") {
            self.usage = Some(TokenUsage {
                input_tokens: usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
                output_tokens: usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
                total_tokens: usage.get("total_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
            });
        }

        let Some(choices) = chunk.get("choices").and_then(Value::as_array) else {
            return parts;
        };

        for choice in choices {
            if let Some(delta) = choice.get("delta") {
                if let Some(r) = delta.get("reasoning").or_else(|| delta.get("reasoning_content")).and_then(Value::as_str) {
                    if !r.is_empty() {
                        if !self.reasoning_started {
                            parts.push(StreamPart::ReasoningStart);
                            self.reasoning_started = true;
                        }
                        self.reasoning.push_str(r);
                        parts.push(StreamPart::ReasoningDelta(r.to_string()));
                    }
                }

                if let Some(c) = delta.get("content").and_then(Value::as_str) {
                    if !c.is_empty() {
                        if self.reasoning_started && !self.reasoning_ended {
                            parts.push(StreamPart::ReasoningEnd(self.reasoning.clone()));
                            self.reasoning_ended = true;
                        }
                        if !self.text_started {
                            parts.push(StreamPart::TextStart);
                            self.text_started = true;
                        }
                        self.text.push_str(c);
                        parts.push(StreamPart::TextDelta(c.to_string()));
                    }
                }

                if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
                    for tc in tool_calls {
                        let index = tc.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                        if !self.tool_calls.contains_key(&index) {
                            self.tool_order.push(index);
                            self.tool_calls.insert(index, ToolAcc::default());
                        }
                        let acc = self.tool_calls.get_mut(&index).unwrap();
                        if let Some(id) = tc.get("id").and_then(Value::as_str) {
                            acc.id = Some(id.to_string());
                        }
                        let mut arg_delta = String::new();
                        if let Some(function) = tc.get("function") {
                            if let Some(name) = function.get("name").and_then(Value::as_str) {
                                acc.name = Some(name.to_string());
                            }
                            if let Some(args) = function.get("arguments").and_then(Value::as_str) {
                                acc.arguments.push_str(args);
                                arg_delta = args.to_string();
                            }
                        }
                        if !acc.started {
                            acc.started = true;
                            parts.push(StreamPart::ToolCallStart(PartialToolCall {
                                id: acc.id.clone().unwrap_or_default(),
                                function_name: acc.name.clone().unwrap_or_default(),
                                arguments_json_delta: arg_delta,
                            }));
                        } else {
                            parts.push(StreamPart::ToolCallDelta(PartialToolCall {
                                id: acc.id.clone().unwrap_or_default(),
                                function_name: acc.name.clone().unwrap_or_default(),
                                arguments_json_delta: arg_delta,
                            }));
                        }
                    }
                }
            }

            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                self.finish_reason = Some(reason.to_string());
            }
        }

        parts
    }

    /// Finalize the stream: close any still-open text/reasoning/tool-call blocks, emit
    /// `ProviderMetadata`, then the single terminal `Finish`. If `finish_reason` was never
    /// observed, this still produces a best-effort `Finish` from whatever accumulated
    /// (spec.md §4.6).
    pub fn finalize(mut self, provider_id: &str, name_map: &ToolNameMap) -> Vec<StreamPart> {
        let mut parts = Vec::new();

        if self.reasoning_started && !self.reasoning_ended {
            parts.push(StreamPart::ReasoningEnd(self.reasoning.clone()));
        }
        if self.text_started && !self.text_ended {
            parts.push(StreamPart::TextEnd(self.text.clone()));
        }

        let mut tool_calls = Vec::new();
        for index in &self.tool_order {
            let acc = self.tool_calls.remove(index).unwrap_or_default();
            let id = acc.id.unwrap_or_default();
            parts.push(StreamPart::ToolCallEnd(id.clone()));
            tool_calls.push(ToolCall::function(id, name_map.to_local(&acc.name.unwrap_or_default()), acc.arguments));
        }

        let mut provider_metadata = HashMap::new();
        provider_metadata.insert(
            provider_id.to_string(),
            serde_json::json!({"finishReason": self.finish_reason, "model": self.model, "id": self.id}),
        );
        parts.push(StreamPart::ProviderMetadata(provider_metadata.clone()));

        let response = ChatResponse {
            text: if self.text.is_empty() { None } else { Some(std::mem::take(&mut self.text)) },
            thinking: if self.reasoning.is_empty() { None } else { Some(std::mem::take(&mut self.reasoning)) },
            tool_calls,
            usage: self.usage.take(),
            warnings: Vec::new(),
            provider_metadata,
        };
        parts.push(StreamPart::Finish(response));
        parts
    }
}
