//! `LLMConfig` builder (spec.md §3), grounded in `cloudllm::config`'s builder-style setters
//! generalized from a handful of connection fields to the full provider call surface.

use std::time::Duration;

use serde_json::Value;

use crate::core::config::{LLMConfig, TransportOptions};
use crate::core::provider_options::ProviderOptions;
use crate::core::tool::{FunctionTool, ProviderTool, ToolChoice};

/// Builds an immutable `LLMConfig`. `provider_id` and `model` are required up front; every
/// other field defaults to "unset" and is only included on the wire when a protocol layer
/// decides it applies.
pub struct LLMConfigBuilder {
    provider_id: String,
    api_key: Option<String>,
    base_url: Option<String>,
    model: String,
    system_prompt: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    top_p: Option<f64>,
    top_k: Option<u32>,
    stop_sequences: Vec<String>,
    tools: Vec<FunctionTool>,
    tool_choice: Option<ToolChoice>,
    user: Option<String>,
    service_tier: Option<String>,
    reasoning_effort: Option<String>,
    json_schema: Option<Value>,
    provider_options: ProviderOptions,
    provider_tools: Vec<ProviderTool>,
    transport_options: TransportOptions,
}

impl LLMConfigBuilder {
    pub fn new(provider_id: impl Into<String>, model: impl Into<String>) -> Self {
        LLMConfigBuilder {
            provider_id: provider_id.into(),
            api_key: None,
            base_url: None,
            model: model.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            top_k: None,
            stop_sequences: Vec::new(),
            tools: Vec::new(),
            tool_choice: None,
            user: None,
            service_tier: None,
            reasoning_effort: None,
            json_schema: None,
            provider_options: ProviderOptions::default(),
            provider_tools: Vec::new(),
            transport_options: TransportOptions::default(),
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    pub fn tools(mut self, tools: Vec<FunctionTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn service_tier(mut self, tier: impl Into<String>) -> Self {
        self.service_tier = Some(tier.into());
        self
    }

    pub fn reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn json_schema(mut self, schema: Value) -> Self {
        self.json_schema = Some(schema);
        self
    }

    pub fn provider_option(mut self, key: &str, value: Value) -> Self {
        self.provider_options.set(&self.provider_id.clone(), key, value);
        self
    }

    pub fn provider_tool(mut self, tool: ProviderTool) -> Self {
        self.provider_tools.push(tool);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.transport_options.proxy = Some(proxy.into());
        self
    }

    pub fn custom_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport_options.custom_headers.insert(key.into(), value.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport_options.connect_timeout = Some(timeout);
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.transport_options.receive_timeout = Some(timeout);
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.transport_options.enable_logging = enabled;
        self
    }

    /// Default base URLs for the providers the built-in registry ships (spec.md §11); anything
    /// not listed here must set `base_url` explicitly.
    fn default_base_url(provider_id: &str) -> &'static str {
        match provider_id {
            "openai" => "https://api.openai.com/v1",
            "anthropic" => "https://api.anthropic.com/v1",
            "deepseek" => "https://api.deepseek.com/v1",
            "groq" => "https://api.groq.com/openai/v1",
            "xai" => "https://api.x.ai/v1",
            "minimax" => "https://api.minimax.chat/v1",
            "google" => "https://generativelanguage.googleapis.com/v1beta/openai",
            "openrouter" => "https://openrouter.ai/api/v1",
            "ollama" => "http://localhost:11434/v1",
            "elevenlabs" => "https://api.elevenlabs.io/v1",
            _ => "",
        }
    }

    pub fn build(self) -> LLMConfig {
        let base_url = self.base_url.unwrap_or_else(|| Self::default_base_url(&self.provider_id).to_string());
        LLMConfig {
            provider_id: self.provider_id,
            api_key: self.api_key,
            base_url,
            model: self.model,
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
            stop_sequences: self.stop_sequences,
            tools: self.tools,
            tool_choice: self.tool_choice,
            user: self.user,
            service_tier: self.service_tier,
            reasoning_effort: self.reasoning_effort,
            json_schema: self.json_schema,
            provider_options: self.provider_options,
            provider_tools: self.provider_tools,
            transport_options: self.transport_options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_filled_in_for_known_providers() {
        let config = LLMConfigBuilder::new("openai", "gpt-4.1").build();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn explicit_base_url_overrides_the_default() {
        let config = LLMConfigBuilder::new("openai", "gpt-4.1").base_url("https://my-proxy.internal/v1").build();
        assert_eq!(config.base_url, "https://my-proxy.internal/v1");
    }

    #[test]
    fn builder_threads_tool_choice_and_tools_through() {
        let tool = FunctionTool { name: "calc".into(), description: String::new(), parameters_schema: serde_json::json!({}) };
        let config = LLMConfigBuilder::new("openai", "gpt-4.1").tools(vec![tool]).tool_choice(ToolChoice::Required).build();
        assert_eq!(config.tools.len(), 1);
        assert!(matches!(config.tool_choice, Some(ToolChoice::Required)));
    }

}
