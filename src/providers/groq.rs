//! Groq adapter: Chat-Completions-compatible inference over Groq's LPU-hosted models
//! (spec.md §6), reusing `protocol::openai_compat`.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::openai_compat_provider::OpenAiCompatibleProvider;
use crate::transport::Transport;

pub fn groq(config: LLMConfig, transport: Arc<dyn Transport>) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new("groq", "Groq", config, transport)
}
