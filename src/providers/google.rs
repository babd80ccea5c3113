//! Google Gemini adapter, reusing `protocol::openai_compat` against Gemini's own
//! OpenAI-compatibility endpoint (`{base_url}/chat/completions` under
//! `generativelanguage.googleapis.com/v1beta/openai`, spec.md §6) rather than hand-rolling
//! `generateContent`'s distinct request/response shape — the same reuse argument spec.md §9
//! makes for OpenAI- and Anthropic-shaped backends generally.

use std::sync::Arc;

use crate::core::config::LLMConfig;
use crate::providers::openai_compat_provider::OpenAiCompatibleProvider;
use crate::transport::Transport;

pub fn google(config: LLMConfig, transport: Arc<dyn Transport>) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new("google", "Google", config, transport)
}
