//! Generic adapter for any provider that speaks the Anthropic Messages wire format
//! (spec.md §4.7), reused by `anthropic` and `minimax` (MiniMax's Anthropic-compatible route).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;

use crate::capability::{BoxStream, Chat, ChatStreamParts, CapabilityKind, CapabilitySet, PromptChat, PromptChatStreamParts, ProviderInfo};
use crate::core::cancel::CancelToken;
use crate::core::config::LLMConfig;
use crate::core::error::Result;
use crate::core::message::ChatMessage;
use crate::core::stream_part::{ChatResponseWithAssistantMessage, StreamPart};
use crate::prompt::ir::Prompt;
use crate::protocol::anthropic_compat::{build_messages_request, parse_messages_response, AnthropicCompatConfig, AnthropicStreamProcessor};
use crate::streaming::sse::{SseEventParser, SseLineBuffer, SseOutcome};
use crate::streaming::utf8::Utf8Rechunker;
use crate::tool_name_map::{native_tool_names, ToolNameMap};
use crate::transport::Transport;

pub struct AnthropicCompatibleProvider {
    provider_id: String,
    config: LLMConfig,
    transport: Arc<dyn Transport>,
    messages_path: String,
    api_version: String,
}

impl AnthropicCompatibleProvider {
    pub fn new(provider_id: impl Into<String>, config: LLMConfig, transport: Arc<dyn Transport>) -> Self {
        AnthropicCompatibleProvider {
            provider_id: provider_id.into(),
            config,
            transport,
            messages_path: "/messages".to_string(),
            api_version: "2023-06-01".to_string(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), self.messages_path)
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("anthropic-version".to_string(), self.api_version.clone());
        if let Some(key) = &self.config.api_key {
            headers.insert("x-api-key".to_string(), key.clone());
        }
        for (k, v) in &self.config.transport_options.custom_headers {
            headers.insert(k.clone(), v.clone());
        }
        headers
    }

    fn wire_config(&self) -> AnthropicCompatConfig<'_> {
        let mut cfg = AnthropicCompatConfig::new(&self.provider_id, &self.config);
        cfg.api_version = &self.api_version;
        cfg
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }
}

impl ProviderInfo for AnthropicCompatibleProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new([CapabilityKind::Chat, CapabilityKind::ChatStreamParts, CapabilityKind::PromptChat, CapabilityKind::PromptChatStreamParts])
    }
}

#[async_trait]
impl Chat for AnthropicCompatibleProvider {
    async fn chat(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
        let wire_config = self.wire_config();
        let native_names = native_tool_names(&self.config.provider_tools);
        let (name_map, tools) = ToolNameMap::build(&self.config.tools, &native_names);
        let mut body = build_messages_request(&wire_config, messages, &tools)?;
        body["stream"] = Value::Bool(false);
        let response = self.transport.post_json(&self.endpoint(), &self.headers(), body, &cancel).await?;
        parse_messages_response(&self.provider_id, &response, &name_map)
    }
}

#[async_trait]
impl ChatStreamParts for AnthropicCompatibleProvider {
    async fn chat_stream_parts(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>> {
        let wire_config = self.wire_config();
        let native_names = native_tool_names(&self.config.provider_tools);
        let (name_map, tools) = ToolNameMap::build(&self.config.tools, &native_names);
        let mut body = build_messages_request(&wire_config, messages, &tools)?;
        body["stream"] = Value::Bool(true);

        let endpoint = self.endpoint();
        let headers = self.headers();
        let transport = self.transport.clone();
        let provider_id = self.provider_id.clone();

        let stream = async_stream::stream! {
            let byte_stream = match transport.post_stream(&endpoint, &headers, body, &cancel).await {
                Ok(s) => s,
                Err(e) => { yield StreamPart::Error(e); return; }
            };
            futures_util::pin_mut!(byte_stream);

            let mut rechunker = Utf8Rechunker::new();
            let mut line_buf = SseLineBuffer::new();
            let mut sse = SseEventParser::new();
            let mut processor = AnthropicStreamProcessor::new();
            let name_map = name_map;
            let mut finished = false;

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => { yield StreamPart::Error(e); return; }
                };
                let text = rechunker.push(&bytes);
                for line in line_buf.push(&text) {
                    match sse.feed_line(&line) {
                        Some(SseOutcome::Event(ev)) => {
                            if let Ok(json) = serde_json::from_str::<Value>(&ev.data) {
                                let is_stop = json.get("type").and_then(Value::as_str) == Some("message_stop");
                                for part in processor.feed(&json) {
                                    yield part;
                                }
                                if is_stop {
                                    finished = true;
                                }
                            }
                        }
                        Some(SseOutcome::Done) => {
                            finished = true;
                        }
                        None => {}
                    }
                }
                if finished {
                    break;
                }
            }

            for part in processor.finalize(&provider_id, &name_map) {
                yield part;
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Prompt-IR entry points (spec.md §4.8 step 1's "or Prompt IR, if the provider implements the
/// Prompt variant"): flatten to legacy messages and delegate, the same conversion the tool loop
/// would otherwise have to do itself before calling this provider.
#[async_trait]
impl PromptChat for AnthropicCompatibleProvider {
    async fn prompt_chat(&self, prompt: &Prompt, cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
        let messages = prompt.to_chat_messages()?;
        self.chat(&messages, cancel).await
    }
}

#[async_trait]
impl PromptChatStreamParts for AnthropicCompatibleProvider {
    async fn prompt_chat_stream_parts(&self, prompt: &Prompt, cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>> {
        let messages = prompt.to_chat_messages()?;
        self.chat_stream_parts(&messages, cancel).await
    }
}
