//! Generic adapter for any provider that speaks the OpenAI Chat Completions wire format
//! (spec.md §4.6), reused by `openai`/`deepseek`/`groq`/`xai`/`openrouter`/`google` rather than
//! hand-rolling per-provider HTTP plumbing the way `clients/openai.rs` did for just one provider.

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
use crate::protocol::openai_compat::{build_chat_completion_request, parse_chat_completion_response, OpenAiCompatConfig, OpenAiStreamProcessor};
use crate::streaming::sse::{SseEventParser, SseLineBuffer, SseOutcome};
use crate::streaming::utf8::Utf8Rechunker;
use crate::tool_name_map::{native_tool_names, ToolNameMap};
use crate::transport::Transport;

/// One provider instance: an `LLMConfig`, a `Transport` to reach it over, and the bits that
/// differ between otherwise-identical Chat-Completions-speaking backends (auth header scheme,
/// chat endpoint path, display name used in `providerMetadata`).
pub struct OpenAiCompatibleProvider {
    provider_id: String,
    provider_name: String,
    config: LLMConfig,
    transport: Arc<dyn Transport>,
    chat_path: String,
    auth_header: AuthHeader,
}

/// Most OpenAI-shaped APIs use `Authorization: Bearer <key>`; a couple of extra headers are
/// tolerated by also threading `config.transport_options.custom_headers` through unconditionally.
enum AuthHeader {
    Bearer,
    None,
}

impl OpenAiCompatibleProvider {
    pub fn new(provider_id: impl Into<String>, provider_name: impl Into<String>, config: LLMConfig, transport: Arc<dyn Transport>) -> Self {
        OpenAiCompatibleProvider {
            provider_id: provider_id.into(),
            provider_name: provider_name.into(),
            config,
            transport,
            chat_path: "/chat/completions".to_string(),
            auth_header: AuthHeader::Bearer,
        }
    }

    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// For backends reached behind a proxy that injects its own credentials (spec.md §6's
    /// "local model servers typically need no Authorization header at all").
    pub fn without_auth_header(mut self) -> Self {
        self.auth_header = AuthHeader::None;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), self.chat_path)
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if matches!(self.auth_header, AuthHeader::Bearer) {
            if let Some(key) = &self.config.api_key {
                headers.insert("Authorization".to_string(), format!("Bearer {}", key));
            }
        }
        for (k, v) in &self.config.transport_options.custom_headers {
            headers.insert(k.clone(), v.clone());
        }
        headers
    }

    fn wire_config(&self) -> OpenAiCompatConfig<'_> {
        OpenAiCompatConfig::new(&self.provider_id, &self.provider_name, &self.config)
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl ProviderInfo for OpenAiCompatibleProvider {
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
impl Chat for OpenAiCompatibleProvider {
    async fn chat(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
        let wire_config = self.wire_config();
        let native_names = native_tool_names(&self.config.provider_tools);
        let (name_map, tools) = ToolNameMap::build(&self.config.tools, &native_names);
        let mut body = build_chat_completion_request(&wire_config, messages, &tools)?;
        body["stream"] = Value::Bool(false);
        let response = self.transport.post_json(&self.endpoint(), &self.headers(), body, &cancel).await?;
        parse_chat_completion_response(&self.provider_id, &response, &name_map)
    }
}

#[async_trait]
impl ChatStreamParts for OpenAiCompatibleProvider {
    async fn chat_stream_parts(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>> {
        let wire_config = self.wire_config();
        let native_names = native_tool_names(&self.config.provider_tools);
        let (name_map, tools) = ToolNameMap::build(&self.config.tools, &native_names);
        let mut body = build_chat_completion_request(&wire_config, messages, &tools)?;
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
            let mut processor = Some(OpenAiStreamProcessor::new());
            let name_map = name_map;

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
                                if let Some(p) = processor.as_mut() {
                                    for part in p.feed(&json) {
                                        yield part;
                                    }
                                }
                            }
                        }
                        Some(SseOutcome::Done) => {
                            if let Some(p) = processor.take() {
                                for part in p.finalize(&provider_id, &name_map) {
                                    yield part;
                                }
                            }
                            return;
                        }
                        None => {}
                    }
                }
            }

            if let Some(p) = processor.take() {
                for part in p.finalize(&provider_id, &name_map) {
                    yield part;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Prompt-IR entry points (spec.md §4.8 step 1's "or Prompt IR, if the provider implements the
/// Prompt variant"): flatten to legacy messages and delegate, the same conversion the tool loop
/// would otherwise have to do itself before calling this provider.
#[async_trait]
impl PromptChat for OpenAiCompatibleProvider {
    async fn prompt_chat(&self, prompt: &Prompt, cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
        let messages = prompt.to_chat_messages()?;
        self.chat(&messages, cancel).await
    }
}

#[async_trait]
impl PromptChatStreamParts for OpenAiCompatibleProvider {
    async fn prompt_chat_stream_parts(&self, prompt: &Prompt, cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>> {
        let messages = prompt.to_chat_messages()?;
        self.chat_stream_parts(&messages, cancel).await
    }
}
