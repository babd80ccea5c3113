//! OpenRouter adapter: a Chat-Completions-compatible aggregator in front of many backing models
//! (spec.md §6/§9), reusing `protocol::openai_compat`. Its distinct `{reasoning:{effort}}` shape
//! for `reasoning_effort` is dispatched inside `protocol::openai_compat::request` by provider id.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::openai_compat_provider::OpenAiCompatibleProvider;
use crate::transport::Transport;

pub fn openrouter(config: LLMConfig, transport: Arc<dyn Transport>) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new("openrouter", "OpenRouter", config, transport)
}
