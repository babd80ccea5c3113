//! Anthropic adapter: the Messages API (spec.md §6), reusing `protocol::anthropic_compat`.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::anthropic_compat_provider::AnthropicCompatibleProvider;
use crate::transport::Transport;

pub fn anthropic(config: LLMConfig, transport: Arc<dyn Transport>) -> AnthropicCompatibleProvider {
    AnthropicCompatibleProvider::new("anthropic", config, transport)
}
