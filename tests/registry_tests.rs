//! Exercises the process-wide registry through its public `create_provider`/`register_or_replace`
//! functions (the in-module unit tests in `registry.rs` only cover a private `ProviderRegistry`
//! built fresh per test, never the shared `GLOBAL_REGISTRY` callers actually use).

use std::sync::Arc;

use modelmux::builder::LLMConfigBuilder;
use modelmux::registry::{create_provider, register_or_replace, AnyProvider, ProviderFactory};
use modelmux::transport::ReqwestTransport;
use modelmux::ProviderInfo;

#[test]
fn create_provider_resolves_ollama_to_its_native_adapter() {
    let config = LLMConfigBuilder::new("ollama", "llama3.2").build();
    let provider = create_provider(config, Arc::new(ReqwestTransport::new())).unwrap();
    assert!(matches!(provider, AnyProvider::Ollama(_)));
    assert_eq!(provider.provider_id(), "ollama");
    assert!(provider.as_chat().is_some());
    assert!(provider.as_embedding().is_some());
    assert!(provider.as_tts().is_none());
}

#[test]
fn create_provider_resolves_deepseek_to_the_openai_compat_adapter() {
    let config = LLMConfigBuilder::new("deepseek", "deepseek-chat").api_key("k").build();
    let provider = create_provider(config, Arc::new(ReqwestTransport::new())).unwrap();
    assert!(matches!(provider, AnyProvider::OpenAiCompat(_)));
    assert!(provider.as_chat_stream_parts().is_some());
}

#[test]
fn create_provider_resolves_elevenlabs_to_tts_and_stt_only() {
    let config = LLMConfigBuilder::new("elevenlabs", "eleven_multilingual_v2").api_key("k").build();
    let provider = create_provider(config, Arc::new(ReqwestTransport::new())).unwrap();
    assert!(matches!(provider, AnyProvider::ElevenLabs(_)));
    assert!(provider.as_chat().is_none());
    assert!(provider.as_tts().is_some());
    assert!(provider.as_stt().is_some());
}

#[test]
fn create_provider_rejects_unknown_provider_id() {
    let config = LLMConfigBuilder::new("not-a-real-provider", "whatever").build();
    let result = create_provider(config, Arc::new(ReqwestTransport::new()));
    assert!(result.is_err());
}

#[test]
fn register_or_replace_installs_a_test_double_reachable_through_create_provider() {
    // A provider id unique to this test so concurrently-run tests never collide on the
    // shared global registry.
    let id = "test-double-registry-integration";
    register_or_replace(ProviderFactory {
        id,
        display_name: "Test Double",
        required_api_key: false,
        default_base_url: "http://localhost",
        default_model: "stub",
        best_effort_capabilities: modelmux::capability::CapabilitySet::default(),
        create: Box::new(move |config, transport| AnyProvider::Ollama(modelmux::providers::ollama(config, transport))),
    });

    let config = LLMConfigBuilder::new(id, "stub").base_url("http://localhost").build();
    let provider = create_provider(config, Arc::new(ReqwestTransport::new())).unwrap();
    assert!(matches!(provider, AnyProvider::Ollama(_)));
}
