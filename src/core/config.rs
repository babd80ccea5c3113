//! Provider configuration (spec.md §3 `LLMConfig`/`transportOptions`).
//!
//! `LLMConfig` is immutable once built — providers created from it are long-lived, matching
//! `cloudllm::config::CloudLLMConfig`'s "construct it however you want, no file parsing"
//! philosophy, generalized from a single path field to the full provider call surface.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::core::provider_options::ProviderOptions;
use crate::core::tool::{FunctionTool, ProviderTool, ToolChoice};

/// Connection-level knobs, independent of any one provider (spec.md §3).
#[derive(Clone, Default)]
pub struct TransportOptions {
    pub proxy: Option<String>,
    pub custom_headers: HashMap<String, String>,
    pub bypass_ssl: bool,
    pub ssl_cert_path: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub receive_timeout: Option<Duration>,
    pub send_timeout: Option<Duration>,
    pub enable_logging: bool,
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("proxy", &self.proxy)
            .field("custom_headers", &self.custom_headers.keys().collect::<Vec<_>>())
            .field("bypass_ssl", &self.bypass_ssl)
            .field("connect_timeout", &self.connect_timeout)
            .field("receive_timeout", &self.receive_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("enable_logging", &self.enable_logging)
            .finish()
    }
}

/// Immutable, cloneable configuration for one provider instance.
#[derive(Clone)]
pub struct LLMConfig {
    pub provider_id: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub tools: Vec<FunctionTool>,
    pub tool_choice: Option<ToolChoice>,
    pub user: Option<String>,
    pub service_tier: Option<String>,
    pub reasoning_effort: Option<String>,
    pub json_schema: Option<serde_json::Value>,
    pub provider_options: ProviderOptions,
    pub provider_tools: Vec<ProviderTool>,
    pub transport_options: TransportOptions,
}

impl LLMConfig {
    /// Start a builder for `provider_id`/`model`. See `crate::builder::LLMConfigBuilder`.
    pub fn builder(provider_id: impl Into<String>, model: impl Into<String>) -> crate::builder::LLMConfigBuilder {
        crate::builder::LLMConfigBuilder::new(provider_id, model)
    }

    /// The last 4 characters of the API key, for log lines that want to confirm "a key is
    /// configured" without risking a leak.
    pub fn api_key_suffix(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| {
            let len = k.len();
            if len <= 4 { k.as_str() } else { &k[len - 4..] }
        })
    }
}

impl fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider_id", &self.provider_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("tools", &self.tools.iter().map(|t| &t.name).collect::<Vec<_>>())
            .field("transport_options", &self.transport_options)
            .finish()
    }
}
