//! The Prompt intermediate representation (spec.md §3 `Prompt`).

use crate::core::message::{ImageMime, Role};
use crate::core::provider_options::ProviderOptions;

/// A single part of a `PromptMessage`. Closed tagged union per spec.md §3.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text { text: String, provider_options: ProviderOptions },
    Image { mime: ImageMime, bytes: std::sync::Arc<[u8]>, provider_options: ProviderOptions },
    ImageUrl { url: String, provider_options: ProviderOptions },
    File { mime: String, bytes: std::sync::Arc<[u8]>, provider_options: ProviderOptions },
    UrlFile { mime: String, url: String, provider_options: ProviderOptions },
    /// Model-produced thinking to replay on a later turn.
    Reasoning { text: String, provider_options: ProviderOptions },
    ToolCall {
        id: String,
        call_type: String,
        function_name: String,
        arguments_json: String,
        provider_options: ProviderOptions,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
        is_error: Option<bool>,
        provider_options: ProviderOptions,
    },
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text { text: text.into(), provider_options: ProviderOptions::default() }
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, PromptPart::ToolCall { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, PromptPart::ToolResult { .. })
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self, PromptPart::Reasoning { .. })
    }
}

/// One message in a `Prompt`. Must have at least one part (enforced by `PromptMessage::new`).
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub parts: Vec<PromptPart>,
    pub name: Option<String>,
    pub provider_options: ProviderOptions,
}

/// Returned when a `PromptMessage` or `Prompt` invariant (role/part compatibility, non-empty
/// parts) is violated while constructing one directly (as opposed to via `InvalidRequest` at
/// request-build time, which covers provider-representability failures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrInvariantViolation(pub String);

impl std::fmt::Display for IrInvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IrInvariantViolation {}

impl PromptMessage {
    /// Construct a message, validating spec.md §3's invariants:
    /// - system messages may only contain `Text` parts
    /// - `ToolCall` parts require assistant role
    /// - `ToolResult` parts require user (or tool) role
    /// - at least one part
    pub fn new(role: Role, parts: Vec<PromptPart>) -> Result<Self, IrInvariantViolation> {
        if parts.is_empty() {
            return Err(IrInvariantViolation("a PromptMessage must have at least one part".into()));
        }
        if role == Role::System && !parts.iter().all(|p| matches!(p, PromptPart::Text { .. })) {
            return Err(IrInvariantViolation("system messages may only contain Text parts".into()));
        }
        if role != Role::Assistant && parts.iter().any(|p| p.is_tool_call()) {
            return Err(IrInvariantViolation("ToolCall parts require assistant role".into()));
        }
        if !matches!(role, Role::User | Role::Tool) && parts.iter().any(|p| p.is_tool_result()) {
            return Err(IrInvariantViolation("ToolResult parts require user or tool role".into()));
        }
        Ok(PromptMessage { role, parts, name: None, provider_options: ProviderOptions::default() })
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        PromptMessage::new(role, vec![PromptPart::text(text)]).expect("single text part is always valid")
    }
}

/// An ordered sequence of `PromptMessage`s — the structured, multimodal, provider-agnostic
/// conversation representation.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub messages: Vec<PromptMessage>,
}

impl Prompt {
    pub fn new() -> Self {
        Prompt { messages: Vec::new() }
    }

    pub fn push(&mut self, message: PromptMessage) -> &mut Self {
        self.messages.push(message);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_parts_rejected() {
        assert!(PromptMessage::new(Role::User, vec![]).is_err());
    }

    #[test]
    fn system_message_with_non_text_part_rejected() {
        let part = PromptPart::ImageUrl { url: "https://x/y.png".into(), provider_options: ProviderOptions::default() };
        assert!(PromptMessage::new(Role::System, vec![part]).is_err());
    }

    #[test]
    fn tool_call_requires_assistant_role() {
        let part = PromptPart::ToolCall {
            id: "1".into(),
            call_type: "function".into(),
            function_name: "f".into(),
            arguments_json: "{}".into(),
            provider_options: ProviderOptions::default(),
        };
        assert!(PromptMessage::new(Role::User, vec![part.clone()]).is_err());
        assert!(PromptMessage::new(Role::Assistant, vec![part]).is_ok());
    }

    #[test]
    fn tool_result_requires_user_or_tool_role() {
        let part = PromptPart::ToolResult {
            tool_call_id: "1".into(),
            content: "ok".into(),
            is_error: None,
            provider_options: ProviderOptions::default(),
        };
        assert!(PromptMessage::new(Role::Assistant, vec![part.clone()]).is_err());
        assert!(PromptMessage::new(Role::User, vec![part.clone()]).is_ok());
        assert!(PromptMessage::new(Role::Tool, vec![part]).is_ok());
    }
}
