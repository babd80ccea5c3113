//! Reusable OpenAI Chat-Completions protocol implementation (spec.md §4.6, component C6).
//!
//! Any provider speaking the Chat Completions wire format builds on this module instead of
//! re-implementing request construction, response parsing, and SSE streaming per provider.

mod config;
pub(crate) mod request;
mod response;
mod stream;

pub use config::OpenAiCompatConfig;
pub use request::build_chat_completion_request;
pub use response::parse_chat_completion_response;
pub use stream::OpenAiStreamProcessor;
