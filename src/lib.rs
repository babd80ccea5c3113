//! A provider-agnostic LLM client core: one set of capability traits, a unified streaming
//! protocol, and a tool-loop engine, with protocol-reused adapters for the OpenAI- and
//! Anthropic-shaped providers and native adapters for the rest.

pub mod builder;
pub mod capability;
pub mod core;
pub mod prompt;
pub mod protocol;
pub mod providers;
pub mod registry;
pub mod streaming;
pub mod task;
pub mod tool_loop;
pub mod tool_name_map;
pub mod transport;

pub use builder::LLMConfigBuilder;
pub use capability::{Chat, ChatStream, ChatStreamParts, Embedding, ImageGen, ModelListing, Moderation, ProviderInfo, Rerank, Stt, Tts};
pub use core::{ChatMessage, ChatResponse, Error, LLMConfig, Result, Role, StreamPart};
pub use registry::{create_provider, AnyProvider};
