//! Config surface required by the Anthropic Messages protocol layer (spec.md §4.7).

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::LLMConfig;
use crate::core::tool::ToolChoice;

pub struct AnthropicCompatConfig<'a> {
    pub provider_id: &'a str,
    pub config: &'a LLMConfig,
    pub api_version: &'a str,
    pub extra_body: Option<Value>,
    pub extra_headers: Vec<(String, String)>,
}

impl<'a> AnthropicCompatConfig<'a> {
    pub fn new(provider_id: &'a str, config: &'a LLMConfig) -> Self {
        AnthropicCompatConfig { provider_id, config, api_version: "2023-06-01", extra_body: None, extra_headers: Vec::new() }
    }

    pub fn get_provider_option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.provider_options.get(self.provider_id, key)
    }

    pub fn tool_choice_json(&self) -> Option<Value> {
        self.config.tool_choice.as_ref().map(|tc| match tc {
            ToolChoice::Auto => serde_json::json!({"type": "auto"}),
            ToolChoice::None => serde_json::json!({"type": "none"}),
            ToolChoice::Required => serde_json::json!({"type": "any"}),
            ToolChoice::Function { name } => serde_json::json!({"type": "tool", "name": name}),
        })
    }

    /// Config-level default `cache_control`, the lowest-precedence tier in spec.md §9's
    /// resolved cache_control rule (explicit per-block > message-level default > config-level
    /// default).
    pub fn default_cache_control(&self) -> Option<Value> {
        self.get_provider_option("cacheControl")
    }
}
