//! The unified, provider-agnostic streaming protocol (spec.md §3, §5).
//!
//! Every streaming capability yields a `Stream<Item = Result<StreamPart>>`. Ordering invariants
//! (reasoning before text, tool-call start/delta/end per id, exactly one terminal `Finish`) are
//! enforced by the protocol layers that produce these parts, not by the enum itself.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::error::Error;
use crate::core::message::ChatMessage;
use crate::core::message::TokenUsage;
use crate::core::tool::{ToolCall, ToolResult};

/// A partial tool call as it accumulates across `ToolCallDelta`s.
#[derive(Debug, Clone, Default)]
pub struct PartialToolCall {
    pub id: String,
    pub function_name: String,
    pub arguments_json_delta: String,
}

/// Free-text warnings about inputs the provider accepted but could not fully honor (dropped
/// setting, unsupported tool, …). See SPEC_FULL.md's "warnings channel" supplement.
#[derive(Debug, Clone)]
pub enum CallWarning {
    UnsupportedSetting { setting: String, detail: Option<String> },
    UnsupportedTool { tool_name: String, detail: Option<String> },
    Other(String),
}

/// The provider-agnostic result of a (possibly reassembled-from-stream) chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
    pub warnings: Vec<CallWarning>,
    pub provider_metadata: HashMap<String, Value>,
}

/// A `ChatResponse` paired with the legacy assistant message the provider actually produced,
/// including any provider-native blocks needed for continuity (spec.md §4.7/§4.8).
#[derive(Debug, Clone)]
pub struct ChatResponseWithAssistantMessage {
    pub response: ChatResponse,
    pub assistant_message: ChatMessage,
}

/// One unit of the unified streaming protocol.
#[derive(Debug)]
pub enum StreamPart {
    TextStart,
    TextDelta(String),
    TextEnd(String),
    ReasoningStart,
    ReasoningDelta(String),
    ReasoningEnd(String),
    ToolCallStart(PartialToolCall),
    ToolCallDelta(PartialToolCall),
    ToolCallEnd(String),
    ToolResult(ToolResult),
    ProviderMetadata(HashMap<String, Value>),
    Finish(ChatResponse),
    Error(Error),
}

impl StreamPart {
    pub fn is_finish(&self) -> bool {
        matches!(self, StreamPart::Finish(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamPart::Error(_))
    }
}
