//! Built-in provider adapters (spec.md §6), each a thin constructor over a shared protocol layer
//! where the wire format is shared, or a self-contained adapter where it isn't.

pub mod anthropic_compat_provider;
pub mod openai_compat_provider;

pub mod anthropic;
pub mod deepseek;
pub mod elevenlabs;
pub mod google;
pub mod groq;
pub mod minimax;
pub mod ollama;
pub mod openai;
pub mod openrouter;
pub mod xai;

pub use anthropic_compat_provider::AnthropicCompatibleProvider;
pub use openai_compat_provider::OpenAiCompatibleProvider;

pub use anthropic::anthropic;
pub use deepseek::deepseek;
pub use elevenlabs::{elevenlabs, ElevenLabsProvider};
pub use google::google;
pub use groq::groq;
pub use minimax::minimax;
pub use ollama::{ollama, OllamaProvider};
pub use openai::{openai, OpenAiProvider};
pub use openrouter::openrouter;
pub use xai::xai;
