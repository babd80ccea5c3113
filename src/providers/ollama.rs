//! Ollama adapter: the native `/api/chat` JSONL wire format (spec.md §6), not the
//! Chat-Completions-compatible route — this is the one built-in provider `streaming::jsonl`
//! exists for, since every other built-in provider streams SSE.
//!
//! Grounded in `protocol::openai_compat::request`'s message-flattening shape, adapted for two
//! wire differences: tool-call arguments travel as a JSON object rather than a JSON-encoded
//! string, and there is no `[DONE]` sentinel — the final JSONL line carries `"done": true`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::capability::{BoxStream, Chat, ChatStreamParts, CapabilityKind, CapabilitySet, ProviderInfo};
use crate::core::cancel::CancelToken;
use crate::core::config::LLMConfig;
use crate::core::error::{Error, Result};
use crate::core::message::{ChatMessage, Role, TokenUsage, TypedBody};
use crate::core::stream_part::{ChatResponse, ChatResponseWithAssistantMessage, StreamPart};
use crate::core::tool::{FunctionTool, ToolCall};
use crate::streaming::jsonl::JsonlParser;
use crate::streaming::utf8::Utf8Rechunker;
use crate::tool_name_map::{native_tool_names, ToolNameMap};
use crate::transport::Transport;

pub fn ollama(config: LLMConfig, transport: Arc<dyn Transport>) -> OllamaProvider {
    OllamaProvider { config, transport }
}

pub struct OllamaProvider {
    config: LLMConfig,
    transport: Arc<dyn Transport>,
}

impl OllamaProvider {
    /// Ollama's default base URL points at its OpenAI-compatibility prefix (`/v1`, for callers
    /// that want that route); this adapter instead talks to the native `/api/*` surface one
    /// level up.
    fn api_root(&self) -> String {
        self.config.base_url.trim_end_matches('/').trim_end_matches("/v1").to_string()
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        for (k, v) in &self.config.transport_options.custom_headers {
            headers.insert(k.clone(), v.clone());
        }
        headers
    }

    fn message_json(message: &ChatMessage) -> Vec<Value> {
        match &message.typed_body {
            TypedBody::ToolResult(results) => {
                results.iter().map(|r| json!({"role": "tool", "content": r.content})).collect()
            }
            TypedBody::ToolUse(calls) => {
                let tool_calls: Vec<Value> = calls
                    .iter()
                    .map(|c| json!({"function": {"name": c.function_name, "arguments": c.arguments()}}))
                    .collect();
                vec![json!({"role": "assistant", "content": message.content_text.clone().unwrap_or_default(), "tool_calls": tool_calls})]
            }
            TypedBody::Text(t) => vec![json!({"role": role_str(&message.role), "content": t})],
            TypedBody::ImageUrl(_) | TypedBody::Image { .. } | TypedBody::File { .. } => {
                vec![json!({"role": role_str(&message.role), "content": message.content_text.clone().unwrap_or_default()})]
            }
        }
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[FunctionTool], stream: bool) -> Result<Value> {
        if messages.is_empty() {
            return Err(Error::invalid_request("at least one message is required"));
        }
        let mut out = Vec::new();
        if let Some(system) = &self.config.system_prompt {
            if !messages.iter().any(|m| m.role == Role::System) {
                out.push(json!({"role": "system", "content": system}));
            }
        }
        for message in messages {
            out.extend(Self::message_json(message));
        }

        let mut options = serde_json::Map::new();
        if let Some(t) = self.config.temperature {
            options.insert("temperature".to_string(), json!(t));
        }
        if let Some(p) = self.config.top_p {
            options.insert("top_p".to_string(), json!(p));
        }
        if let Some(k) = self.config.top_k {
            options.insert("top_k".to_string(), json!(k));
        }
        if !self.config.stop_sequences.is_empty() {
            options.insert("stop".to_string(), json!(self.config.stop_sequences));
        }

        let mut body = json!({"model": self.config.model, "messages": out, "stream": stream});
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }
        if !tools.is_empty() {
            let tools_json: Vec<Value> = tools
                .iter()
                .map(|t| json!({"type": "function", "function": {"name": t.name, "description": t.description, "parameters": t.parameters_schema}}))
                .collect();
            body["tools"] = json!(tools_json);
        }
        if let Some(schema) = &self.config.json_schema {
            body["format"] = schema.clone();
        }
        Ok(body)
    }

    fn parse_message(message: &Value, name_map: &ToolNameMap) -> (Option<String>, Vec<ToolCall>) {
        let text = message.get("content").and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string);
        let tool_calls = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| {
                calls
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| {
                        let function = c.get("function")?;
                        let wire_name = function.get("name")?.as_str()?.to_string();
                        let arguments_json = function.get("arguments").map(|v| v.to_string()).unwrap_or_else(|| "{}".to_string());
                        Some(ToolCall::function(format!("ollama_call_{}", i), name_map.to_local(&wire_name), arguments_json))
                    })
                    .collect()
            })
            .unwrap_or_default();
        (text, tool_calls)
    }
}

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

impl ProviderInfo for OllamaProvider {
    fn provider_id(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new([CapabilityKind::Chat, CapabilityKind::ChatStreamParts, CapabilityKind::Embedding])
    }
}

#[async_trait]
impl Chat for OllamaProvider {
    async fn chat(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
        let native_names = native_tool_names(&self.config.provider_tools);
        let (name_map, tools) = ToolNameMap::build(&self.config.tools, &native_names);
        let body = self.build_request(messages, &tools, false)?;
        let endpoint = format!("{}/api/chat", self.api_root());
        let response = self.transport.post_json(&endpoint, &self.headers(), body, &cancel).await?;

        let message = response.get("message").ok_or_else(|| Error::response_format("missing message"))?;
        let (text, tool_calls) = Self::parse_message(message, &name_map);

        let usage = Some(TokenUsage {
            input_tokens: response.get("prompt_eval_count").and_then(Value::as_u64).unwrap_or(0) as usize,
            output_tokens: response.get("eval_count").and_then(Value::as_u64).unwrap_or(0) as usize,
            total_tokens: (response.get("prompt_eval_count").and_then(Value::as_u64).unwrap_or(0) + response.get("eval_count").and_then(Value::as_u64).unwrap_or(0)) as usize,
        });

        let mut provider_metadata = HashMap::new();
        provider_metadata.insert("ollama".to_string(), json!({"doneReason": response.get("done_reason")}));

        let response_out = ChatResponse {
            text: text.clone(),
            thinking: None,
            tool_calls: tool_calls.clone(),
            usage,
            warnings: Vec::new(),
            provider_metadata,
        };
        let assistant_message = ChatMessage {
            role: Role::Assistant,
            content_text: text.clone(),
            typed_body: if tool_calls.is_empty() { TypedBody::Text(text.unwrap_or_default()) } else { TypedBody::ToolUse(tool_calls) },
            reasoning: None,
            name: None,
            provider_options: Default::default(),
            protocol_payloads: Default::default(),
        };
        Ok(ChatResponseWithAssistantMessage { response: response_out, assistant_message })
    }
}

#[async_trait]
impl ChatStreamParts for OllamaProvider {
    async fn chat_stream_parts(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>> {
        let native_names = native_tool_names(&self.config.provider_tools);
        let (name_map, tools) = ToolNameMap::build(&self.config.tools, &native_names);
        let body = self.build_request(messages, &tools, true)?;
        let endpoint = format!("{}/api/chat", self.api_root());
        let headers = self.headers();
        let transport = self.transport.clone();

        let stream = async_stream::stream! {
            let byte_stream = match transport.post_stream(&endpoint, &headers, body, &cancel).await {
                Ok(s) => s,
                Err(e) => { yield StreamPart::Error(e); return; }
            };
            futures_util::pin_mut!(byte_stream);

            let mut rechunker = Utf8Rechunker::new();
            let mut parser = JsonlParser::new();
            let mut text = String::new();
            let mut text_started = false;
            let name_map = name_map;

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => { yield StreamPart::Error(e); return; }
                };
                let decoded = rechunker.push(&bytes);
                for line in parser.push(&decoded) {
                    let line = match line {
                        Ok(v) => v,
                        Err(_) => continue,
                    };

                    if let Some(message) = line.get("message") {
                        if let Some(delta) = message.get("content").and_then(Value::as_str) {
                            if !delta.is_empty() {
                                if !text_started {
                                    yield StreamPart::TextStart;
                                    text_started = true;
                                }
                                text.push_str(delta);
                                yield StreamPart::TextDelta(delta.to_string());
                            }
                        }
                        let (_, tool_calls) = OllamaProvider::parse_message(message, &name_map);
                        for call in &tool_calls {
                            yield StreamPart::ToolCallStart(crate::core::stream_part::PartialToolCall {
                                id: call.id.clone(),
                                function_name: call.function_name.clone(),
                                arguments_json_delta: call.arguments_json.clone(),
                            });
                            yield StreamPart::ToolCallEnd(call.id.clone());
                        }
                    }

                    if line.get("done").and_then(Value::as_bool) == Some(true) {
                        if text_started {
                            yield StreamPart::TextEnd(text.clone());
                        }
                        let (_, tool_calls) = line.get("message").map(|m| OllamaProvider::parse_message(m, &name_map)).unwrap_or((None, Vec::new()));
                        let usage = Some(TokenUsage {
                            input_tokens: line.get("prompt_eval_count").and_then(Value::as_u64).unwrap_or(0) as usize,
                            output_tokens: line.get("eval_count").and_then(Value::as_u64).unwrap_or(0) as usize,
                            total_tokens: (line.get("prompt_eval_count").and_then(Value::as_u64).unwrap_or(0) + line.get("eval_count").and_then(Value::as_u64).unwrap_or(0)) as usize,
                        });
                        let mut provider_metadata = HashMap::new();
                        provider_metadata.insert("ollama".to_string(), json!({"doneReason": line.get("done_reason")}));
                        yield StreamPart::ProviderMetadata(provider_metadata.clone());
                        yield StreamPart::Finish(ChatResponse {
                            text: if text.is_empty() { None } else { Some(text.clone()) },
                            thinking: None,
                            tool_calls,
                            usage,
                            warnings: Vec::new(),
                            provider_metadata,
                        });
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl crate::capability::Embedding for OllamaProvider {
    async fn embed(&self, inputs: &[String], cancel: CancelToken) -> Result<Vec<Vec<f32>>> {
        let endpoint = format!("{}/api/embed", self.api_root());
        let body = json!({"model": self.config.model, "input": inputs});
        let response = self.transport.post_json(&endpoint, &self.headers(), body, &cancel).await?;
        let embeddings = response.get("embeddings").and_then(Value::as_array).ok_or_else(|| Error::response_format("missing embeddings[]"))?;
        Ok(embeddings
            .iter()
            .map(|e| e.as_array().map(|a| a.iter().filter_map(Value::as_f64).map(|f| f as f32).collect()).unwrap_or_default())
            .collect())
    }
}
