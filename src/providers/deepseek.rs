//! DeepSeek adapter: speaks Chat Completions (spec.md §6), reusing `protocol::openai_compat`.
//! DeepSeek's own reasoning models emit `<think>` tags in `message.content`, already handled by
//! the shared response parser's `extract_think_tags` fallback.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::openai_compat_provider::OpenAiCompatibleProvider;
use crate::transport::Transport;

pub fn deepseek(config: LLMConfig, transport: Arc<dyn Transport>) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new("deepseek", "DeepSeek", config, transport)
}
