//! OpenAI adapter: Chat Completions plus direct image generation (spec.md §6), grounded in
//! `clients/openai.rs`'s `OpenAIClient`/`ImageGenerationClient` split — a protocol-reused chat
//! path and a provider-specific endpoint hit directly through the shared transport.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::capability::{CapabilityKind, CapabilitySet, GeneratedImage, ImageGen, ImageGenOptions, ProviderInfo};
use crate::core::cancel::CancelToken;
use crate::core::config::LLMConfig;
use crate::core::error::{Error, Result};
use crate::providers::openai_compat_provider::OpenAiCompatibleProvider;
use crate::transport::Transport;

pub fn openai(config: LLMConfig, transport: Arc<dyn Transport>) -> OpenAiProvider {
    OpenAiProvider { inner: OpenAiCompatibleProvider::new("openai", "OpenAI", config, transport) }
}

/// Wraps the generic Chat-Completions adapter to add OpenAI's `/images/generations` endpoint,
/// which has no Anthropic/other-provider analogue and so isn't part of the reused protocol layer.
pub struct OpenAiProvider {
    inner: OpenAiCompatibleProvider,
}

impl ProviderInfo for OpenAiProvider {
    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new([CapabilityKind::Chat, CapabilityKind::ChatStreamParts, CapabilityKind::ImageGen])
    }
}

#[async_trait]
impl crate::capability::Chat for OpenAiProvider {
    async fn chat(&self, messages: &[crate::core::message::ChatMessage], cancel: CancelToken) -> Result<crate::core::stream_part::ChatResponseWithAssistantMessage> {
        self.inner.chat(messages, cancel).await
    }
}

#[async_trait]
impl crate::capability::ChatStreamParts for OpenAiProvider {
    async fn chat_stream_parts(
        &self,
        messages: &[crate::core::message::ChatMessage],
        cancel: CancelToken,
    ) -> Result<crate::capability::BoxStream<'static, crate::core::stream_part::StreamPart>> {
        self.inner.chat_stream_parts(messages, cancel).await
    }
}

#[async_trait]
impl ImageGen for OpenAiProvider {
    async fn generate_image(&self, prompt: &str, options: ImageGenOptions, cancel: CancelToken) -> Result<Vec<GeneratedImage>> {
        let config = self.inner.config();
        let mut body = json!({"model": config.model, "prompt": prompt});
        if let Some(size) = &options.size {
            body["size"] = json!(size);
        }
        if let Some(n) = options.n {
            body["n"] = json!(n);
        }
        if let Some(format) = &options.response_format {
            body["response_format"] = json!(format);
        }

        let mut headers = std::collections::HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(key) = &config.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {}", key));
        }

        let endpoint = format!("{}/images/generations", config.base_url.trim_end_matches('/'));
        let response = self.inner.transport().post_json(&endpoint, &headers, body, &cancel).await?;

        let data = response.get("data").and_then(Value::as_array).ok_or_else(|| Error::response_format("missing data[]"))?;
        Ok(data
            .iter()
            .map(|item| GeneratedImage {
                url: item.get("url").and_then(Value::as_str).map(str::to_string),
                bytes: item.get("b64_json").and_then(Value::as_str).map(decode_base64),
            })
            .collect())
    }
}

/// Minimal base64 decoder, the inverse of `protocol::openai_compat::request`'s encoder, for
/// OpenAI's `b64_json` image payloads.
fn decode_base64(input: &str) -> Vec<u8> {
    fn value(byte: u8) -> Option<u8> {
        match byte {
            b'A'..=b'Z' => Some(byte - b'A'),
            b'a'..=b'z' => Some(byte - b'a' + 26),
            b'0'..=b'9' => Some(byte - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }
    let clean: Vec<u8> = input.bytes().filter(|&b| b != b'=' && !b.is_ascii_whitespace()).collect();
    let mut out = Vec::with_capacity(clean.len() / 4 * 3);
    for chunk in clean.chunks(4) {
        let vals: Vec<u8> = chunk.iter().filter_map(|b| value(*b)).collect();
        if vals.len() < 2 {
            break;
        }
        out.push((vals[0] << 2) | (vals.get(1).unwrap_or(&0) >> 4));
        if vals.len() >= 3 {
            out.push((vals[1] << 4) | (vals[2] >> 2));
        }
        if vals.len() >= 4 {
            out.push((vals[2] << 6) | vals[3]);
        }
    }
    out
}
