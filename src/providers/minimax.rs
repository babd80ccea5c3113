//! MiniMax adapter: MiniMax exposes an Anthropic-Messages-compatible route (`x-api-key` +
//! `anthropic-version` headers, spec.md §6), so it reuses `protocol::anthropic_compat` the same
//! way `anthropic.rs` does rather than a third bespoke wire format.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::anthropic_compat_provider::AnthropicCompatibleProvider;
use crate::transport::Transport;

pub fn minimax(config: LLMConfig, transport: Arc<dyn Transport>) -> AnthropicCompatibleProvider {
    AnthropicCompatibleProvider::new("minimax", config, transport)
}
