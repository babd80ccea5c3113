//! Core types shared by every layer of the crate: errors, cancellation, messages, tools,
//! stream parts, and configuration (spec.md §4.1).

pub mod cancel;
pub mod config;
pub mod error;
pub mod message;
pub mod provider_options;
pub mod stream_part;
pub mod tool;

pub use cancel::CancelToken;
pub use config::{LLMConfig, TransportOptions};
pub use error::{Error, Result, ToolErrorKind};
pub use message::{ChatMessage, ImageMime, Role, TokenUsage, TypedBody};
pub use provider_options::ProviderOptions;
pub use stream_part::{CallWarning, ChatResponse, ChatResponseWithAssistantMessage, PartialToolCall, StreamPart};
pub use tool::{FunctionTool, ProviderTool, ToolCall, ToolChoice, ToolResult};
