//! Reusable Anthropic Messages protocol implementation (spec.md §4.7, component C7).

mod config;
mod request;
mod response;
mod stream;

pub use config::AnthropicCompatConfig;
pub use request::build_messages_request;
pub use response::parse_messages_response;
pub use stream::AnthropicStreamProcessor;
