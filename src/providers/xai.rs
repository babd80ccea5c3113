//! xAI (Grok) adapter: Chat Completions plus the `search_parameters` live-search extension
//! (spec.md §6), handled entirely inside `protocol::openai_compat::request`'s
//! `liveSearch`/`webSearch` provider-options dispatch.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::openai_compat_provider::OpenAiCompatibleProvider;
use crate::transport::Transport;

pub fn xai(config: LLMConfig, transport: Arc<dyn Transport>) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new("xai", "xAI", config, transport)
}
