//! Config surface required by the OpenAI-compatible protocol layer (spec.md §4.6).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::LLMConfig;
use crate::core::tool::ToolChoice;

/// A view over `LLMConfig` exposing exactly the fields the OpenAI-compatible request builder
/// and response parser need, plus the provider-identity fields that can differ from the
/// user-facing `LLMConfig.provider_id` (e.g. `groq-openai` as the protocol-layer id vs. `Groq`
/// as the display name, per spec.md §4.6).
pub struct OpenAiCompatConfig<'a> {
    pub provider_id: &'a str,
    pub provider_name: &'a str,
    pub config: &'a LLMConfig,
    pub endpoint_prefix: Option<&'a str>,
    pub extra_body: Option<Value>,
    pub extra_headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl<'a> OpenAiCompatConfig<'a> {
    pub fn new(provider_id: &'a str, provider_name: &'a str, config: &'a LLMConfig) -> Self {
        OpenAiCompatConfig { provider_id, provider_name, config, endpoint_prefix: None, extra_body: None, extra_headers: Vec::new(), timeout: None }
    }

    pub fn get_provider_option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.provider_options.get(self.provider_id, key)
    }

    pub fn tool_choice_json(&self) -> Option<Value> {
        self.config.tool_choice.as_ref().map(|tc| match tc {
            ToolChoice::Auto => Value::String("auto".into()),
            ToolChoice::None => Value::String("none".into()),
            ToolChoice::Required => Value::String("required".into()),
            ToolChoice::Function { name } => serde_json::json!({"type": "function", "function": {"name": name}}),
        })
    }

    /// Reasoning-capable model families that suppress `temperature`/`top_p` and use
    /// `max_completion_tokens` instead of `max_tokens` (spec.md §4.6).
    pub fn is_reasoning_model(&self) -> bool {
        let model = self.config.model.to_ascii_lowercase();
        model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4") || model.contains("gpt-5")
    }
}
