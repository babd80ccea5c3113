//! Provider factory registry (spec.md §4.4), generalized from the teacher's per-provider module
//! split in `clients/mod.rs` (which had no registry — callers imported the concrete client type
//! directly) into a process-wide, late-binding lookup keyed by provider id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::capability::{Chat, ChatStreamParts, CapabilitySet, Embedding, ImageGen, ProviderInfo, Stt, Tts};
use crate::core::config::LLMConfig;
use crate::providers;
use crate::transport::Transport;

/// A concrete provider instance, erased behind one enum so the registry can hand back a single
/// type regardless of which capability traits the backing provider implements. Per-capability
/// accessors return `None` for providers that don't implement that trait, mirroring
/// `CapabilitySet::supports`'s best-effort contract rather than panicking on a wrong call.
pub enum AnyProvider {
    OpenAiCompat(providers::OpenAiCompatibleProvider),
    AnthropicCompat(providers::AnthropicCompatibleProvider),
    OpenAi(providers::OpenAiProvider),
    Ollama(providers::OllamaProvider),
    ElevenLabs(providers::ElevenLabsProvider),
}

impl ProviderInfo for AnyProvider {
    fn provider_id(&self) -> &str {
        match self {
            AnyProvider::OpenAiCompat(p) => p.provider_id(),
            AnyProvider::AnthropicCompat(p) => p.provider_id(),
            AnyProvider::OpenAi(p) => p.provider_id(),
            AnyProvider::Ollama(p) => p.provider_id(),
            AnyProvider::ElevenLabs(p) => p.provider_id(),
        }
    }

    fn model(&self) -> &str {
        match self {
            AnyProvider::OpenAiCompat(p) => p.model(),
            AnyProvider::AnthropicCompat(p) => p.model(),
            AnyProvider::OpenAi(p) => p.model(),
            AnyProvider::Ollama(p) => p.model(),
            AnyProvider::ElevenLabs(p) => p.model(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        match self {
            AnyProvider::OpenAiCompat(p) => p.capabilities(),
            AnyProvider::AnthropicCompat(p) => p.capabilities(),
            AnyProvider::OpenAi(p) => p.capabilities(),
            AnyProvider::Ollama(p) => p.capabilities(),
            AnyProvider::ElevenLabs(p) => p.capabilities(),
        }
    }
}

impl AnyProvider {
    pub fn as_chat(&self) -> Option<&dyn Chat> {
        match self {
            AnyProvider::OpenAiCompat(p) => Some(p),
            AnyProvider::AnthropicCompat(p) => Some(p),
            AnyProvider::OpenAi(p) => Some(p),
            AnyProvider::Ollama(p) => Some(p),
            AnyProvider::ElevenLabs(_) => None,
        }
    }

    pub fn as_chat_stream_parts(&self) -> Option<&dyn ChatStreamParts> {
        match self {
            AnyProvider::OpenAiCompat(p) => Some(p),
            AnyProvider::AnthropicCompat(p) => Some(p),
            AnyProvider::OpenAi(p) => Some(p),
            AnyProvider::Ollama(p) => Some(p),
            AnyProvider::ElevenLabs(_) => None,
        }
    }

    pub fn as_image_gen(&self) -> Option<&dyn ImageGen> {
        match self {
            AnyProvider::OpenAi(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_embedding(&self) -> Option<&dyn Embedding> {
        match self {
            AnyProvider::Ollama(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_tts(&self) -> Option<&dyn Tts> {
        match self {
            AnyProvider::ElevenLabs(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_stt(&self) -> Option<&dyn Stt> {
        match self {
            AnyProvider::ElevenLabs(p) => Some(p),
            _ => None,
        }
    }
}

/// Everything a registry needs to know about a provider before any config is built, plus the
/// constructor itself (spec.md §4.4).
pub struct ProviderFactory {
    pub id: &'static str,
    pub display_name: &'static str,
    pub required_api_key: bool,
    pub default_base_url: &'static str,
    pub default_model: &'static str,
    pub best_effort_capabilities: CapabilitySet,
    pub create: Box<dyn Fn(LLMConfig, Arc<dyn Transport>) -> AnyProvider + Send + Sync>,
}

impl ProviderFactory {
    pub fn create(&self, config: LLMConfig, transport: Arc<dyn Transport>) -> AnyProvider {
        (self.create)(config, transport)
    }
}

/// Maps `provider_id -> ProviderFactory` (spec.md §4.4). Registration of a given id is
/// idempotent via `register`; `register_or_replace` is the explicit last-writer-wins path.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry::default()
    }

    /// No-op if `factory.id` is already registered, so built-in registration stays idempotent
    /// across repeated calls.
    pub fn register(&mut self, factory: ProviderFactory) {
        self.factories.entry(factory.id.to_string()).or_insert(factory);
    }

    pub fn register_or_replace(&mut self, factory: ProviderFactory) {
        self.factories.insert(factory.id.to_string(), factory);
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderFactory> {
        self.factories.get(provider_id)
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn register_builtins(&mut self) {
        use crate::capability::CapabilityKind::*;

        self.register(ProviderFactory {
            id: "openai",
            display_name: "OpenAI",
            required_api_key: true,
            default_base_url: "https://api.openai.com/v1",
            default_model: "gpt-4.1",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts, ImageGen]),
            create: Box::new(|config, transport| AnyProvider::OpenAi(providers::openai(config, transport))),
        });
        self.register(ProviderFactory {
            id: "deepseek",
            display_name: "DeepSeek",
            required_api_key: true,
            default_base_url: "https://api.deepseek.com/v1",
            default_model: "deepseek-chat",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::OpenAiCompat(providers::deepseek(config, transport))),
        });
        self.register(ProviderFactory {
            id: "groq",
            display_name: "Groq",
            required_api_key: true,
            default_base_url: "https://api.groq.com/openai/v1",
            default_model: "llama-3.3-70b-versatile",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::OpenAiCompat(providers::groq(config, transport))),
        });
        self.register(ProviderFactory {
            id: "xai",
            display_name: "xAI",
            required_api_key: true,
            default_base_url: "https://api.x.ai/v1",
            default_model: "grok-2-latest",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::OpenAiCompat(providers::xai(config, transport))),
        });
        self.register(ProviderFactory {
            id: "openrouter",
            display_name: "OpenRouter",
            required_api_key: true,
            default_base_url: "https://openrouter.ai/api/v1",
            default_model: "openrouter/auto",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::OpenAiCompat(providers::openrouter(config, transport))),
        });
        self.register(ProviderFactory {
            id: "google",
            display_name: "Google",
            required_api_key: true,
            default_base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
            default_model: "gemini-2.0-flash",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::OpenAiCompat(providers::google(config, transport))),
        });
        self.register(ProviderFactory {
            id: "anthropic",
            display_name: "Anthropic",
            required_api_key: true,
            default_base_url: "https://api.anthropic.com/v1",
            default_model: "claude-sonnet-4-5",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::AnthropicCompat(providers::anthropic(config, transport))),
        });
        self.register(ProviderFactory {
            id: "minimax",
            display_name: "MiniMax",
            required_api_key: true,
            default_base_url: "https://api.minimax.chat/v1",
            default_model: "abab6.5-chat",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts]),
            create: Box::new(|config, transport| AnyProvider::AnthropicCompat(providers::minimax(config, transport))),
        });
        self.register(ProviderFactory {
            id: "ollama",
            display_name: "Ollama",
            required_api_key: false,
            default_base_url: "http://localhost:11434/v1",
            default_model: "llama3.2",
            best_effort_capabilities: CapabilitySet::new([Chat, ChatStreamParts, Embedding]),
            create: Box::new(|config, transport| AnyProvider::Ollama(providers::ollama(config, transport))),
        });
        self.register(ProviderFactory {
            id: "elevenlabs",
            display_name: "ElevenLabs",
            required_api_key: true,
            default_base_url: "https://api.elevenlabs.io/v1",
            default_model: "eleven_multilingual_v2",
            best_effort_capabilities: CapabilitySet::new([Tts, Stt]),
            create: Box::new(|config, transport| AnyProvider::ElevenLabs(providers::elevenlabs(config, transport))),
        });
    }
}

lazy_static! {
    /// Process-wide registry (spec.md §5's "shared resources" note). Built-in registration is
    /// idempotent; application code can still call `register_or_replace` on a custom
    /// `ProviderRegistry` it owns if it wants isolation from this shared instance.
    static ref GLOBAL_REGISTRY: RwLock<ProviderRegistry> = {
        let mut registry = ProviderRegistry::new();
        registry.register_builtins();
        RwLock::new(registry)
    };
}

/// Create a provider instance from the process-wide registry.
pub fn create_provider(config: LLMConfig, transport: Arc<dyn Transport>) -> crate::core::error::Result<AnyProvider> {
    let registry = GLOBAL_REGISTRY.read().unwrap();
    let factory = registry
        .get(&config.provider_id)
        .ok_or_else(|| crate::core::error::Error::invalid_request(format!("unknown provider id: {}", config.provider_id)))?;
    Ok(factory.create(config, transport))
}

/// Register or replace a factory in the process-wide registry (spec.md §4.4's explicit
/// `register_or_replace` escape hatch, e.g. to swap in a test double for `"openai"`).
pub fn register_or_replace(factory: ProviderFactory) {
    GLOBAL_REGISTRY.write().unwrap().register_or_replace(factory);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_first_writer_wins() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderFactory {
            id: "dup",
            display_name: "First",
            required_api_key: false,
            default_base_url: "",
            default_model: "",
            best_effort_capabilities: CapabilitySet::default(),
            create: Box::new(|config, transport| AnyProvider::Ollama(providers::ollama(config, transport))),
        });
        registry.register(ProviderFactory {
            id: "dup",
            display_name: "Second",
            required_api_key: false,
            default_base_url: "",
            default_model: "",
            best_effort_capabilities: CapabilitySet::default(),
            create: Box::new(|config, transport| AnyProvider::Ollama(providers::ollama(config, transport))),
        });
        assert_eq!(registry.get("dup").unwrap().display_name, "First");
    }

    #[test]
    fn register_or_replace_is_last_writer_wins() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderFactory {
            id: "dup",
            display_name: "First",
            required_api_key: false,
            default_base_url: "",
            default_model: "",
            best_effort_capabilities: CapabilitySet::default(),
            create: Box::new(|config, transport| AnyProvider::Ollama(providers::ollama(config, transport))),
        });
        registry.register_or_replace(ProviderFactory {
            id: "dup",
            display_name: "Second",
            required_api_key: false,
            default_base_url: "",
            default_model: "",
            best_effort_capabilities: CapabilitySet::default(),
            create: Box::new(|config, transport| AnyProvider::Ollama(providers::ollama(config, transport))),
        });
        assert_eq!(registry.get("dup").unwrap().display_name, "Second");
    }

    #[test]
    fn builtins_cover_every_documented_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register_builtins();
        for id in ["openai", "deepseek", "groq", "xai", "openrouter", "google", "anthropic", "minimax", "ollama", "elevenlabs"] {
            assert!(registry.get(id).is_some(), "missing builtin provider: {id}");
        }
    }
}
