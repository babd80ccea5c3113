//! The legacy flat message shape.
//!
//! `ChatMessage` predates the [`Prompt`](crate::prompt::ir::Prompt) IR and remains the wire-level
//! shape protocol layers build requests from and parse responses into. `protocol_payloads`
//! carries provider-native content blocks (Anthropic `tool_use`/`thinking`/`redacted_thinking`,
//! …) so they survive verbatim across tool-loop turns — see `core::config`'s continuity note.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::core::provider_options::ProviderOptions;
use crate::core::tool::{ToolCall, ToolResult};

/// One of `system | user | assistant | tool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Accounting for a single model call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Supported inline image MIME types (spec.md §3 `Image` part).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Gif => "image/gif",
            ImageMime::Webp => "image/webp",
        }
    }
}

/// The content carried by a `ChatMessage`, discriminated the way the wire protocols expect it.
#[derive(Debug, Clone)]
pub enum TypedBody {
    Text(String),
    Image { mime: ImageMime, bytes: Arc<[u8]> },
    ImageUrl(String),
    File { mime: String, bytes: Arc<[u8]> },
    ToolUse(Vec<ToolCall>),
    ToolResult(Vec<ToolResult>),
}

/// A flat, wire-adjacent chat message.
///
/// This is the shape protocol layers (`protocol::openai_compat`, `protocol::anthropic_compat`)
/// consume directly; `Prompt`/`PromptMessage` convert to and from it via `prompt::convert`.
///
/// `content_text` is the plain-text projection (what a simple renderer would print);
/// `typed_body` is the structured payload actually sent/received on the wire. For a text-only
/// message the two carry the same string. `reasoning` holds model-produced thinking merged in
/// from `Reasoning` prompt parts — kept as a dedicated field rather than folded into
/// `typed_body` because an assistant message can carry reasoning *and* tool calls at once.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content_text: Option<String>,
    pub typed_body: TypedBody,
    pub reasoning: Option<String>,
    pub name: Option<String>,
    pub provider_options: ProviderOptions,
    /// Provider-native content blocks keyed by provider id, preserved verbatim across
    /// tool-loop turns (e.g. Anthropic `thinking` signatures).
    pub protocol_payloads: HashMap<String, Value>,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        let text = text.into();
        ChatMessage {
            role,
            content_text: Some(text.clone()),
            typed_body: TypedBody::Text(text),
            reasoning: None,
            name: None,
            provider_options: ProviderOptions::default(),
            protocol_payloads: HashMap::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }
}
