//! Capability traits (spec.md §4.3).
//!
//! A provider adapter implements only the subset of these traits its backing API actually
//! supports; composing trait objects rather than one monolithic interface is the fix for the
//! "polymorphic capability inheritance" anti-pattern called out in spec.md §9. `supports()` is
//! advertised separately via `ProviderInfo` and is best-effort only — it must never be used to
//! reject a call before it reaches the wire (the API is the source of truth, per §4.3/§7).

use std::collections::HashSet;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::Stream;

use crate::core::cancel::CancelToken;
use crate::core::error::Result;
use crate::core::message::ChatMessage;
use crate::core::stream_part::{ChatResponseWithAssistantMessage, StreamPart};
use crate::prompt::ir::Prompt;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// One entry of the capability set named in spec.md §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Chat,
    ChatStream,
    ChatStreamParts,
    PromptChat,
    PromptChatStream,
    PromptChatStreamParts,
    Embedding,
    Rerank,
    ImageGen,
    Tts,
    Stt,
    ModelListing,
    Moderation,
}

/// A provider's self-reported, best-effort capability set.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet(HashSet<CapabilityKind>);

impl CapabilitySet {
    pub fn new(kinds: impl IntoIterator<Item = CapabilityKind>) -> Self {
        CapabilitySet(kinds.into_iter().collect())
    }

    /// Best-effort only: callers must still attempt the call and handle
    /// `Error::UnsupportedCapability` rather than gating on this.
    pub fn supports(&self, kind: CapabilityKind) -> bool {
        self.0.contains(&kind)
    }
}

/// Identity every provider instance exposes regardless of which capability traits it implements.
pub trait ProviderInfo: Send + Sync {
    fn provider_id(&self) -> &str;
    fn model(&self) -> &str;
    fn capabilities(&self) -> CapabilitySet;
}

#[async_trait]
pub trait Chat: ProviderInfo {
    async fn chat(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage>;
}

#[async_trait]
pub trait ChatStream: ProviderInfo {
    /// Plain text-delta streaming, for callers that don't need the full stream-part protocol.
    async fn chat_stream(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<BoxStream<'static, Result<String>>>;
}

#[async_trait]
pub trait ChatStreamParts: ProviderInfo {
    async fn chat_stream_parts(&self, messages: &[ChatMessage], cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>>;
}

#[async_trait]
pub trait PromptChat: ProviderInfo {
    async fn prompt_chat(&self, prompt: &Prompt, cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage>;
}

#[async_trait]
pub trait PromptChatStream: ProviderInfo {
    async fn prompt_chat_stream(&self, prompt: &Prompt, cancel: CancelToken) -> Result<BoxStream<'static, Result<String>>>;
}

#[async_trait]
pub trait PromptChatStreamParts: ProviderInfo {
    async fn prompt_chat_stream_parts(&self, prompt: &Prompt, cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>>;
}

#[async_trait]
pub trait Embedding: ProviderInfo {
    async fn embed(&self, inputs: &[String], cancel: CancelToken) -> Result<Vec<Vec<f32>>>;
}

/// A single ranked document (spec.md §4.10 `rerank_by_embedding`, generalized to also cover a
/// provider's native rerank endpoint per SPEC_FULL.md's supplement).
#[derive(Debug, Clone)]
pub struct RankedDocument {
    pub doc: String,
    pub score: f64,
    pub index: usize,
    pub original_index: usize,
}

#[async_trait]
pub trait Rerank: ProviderInfo {
    async fn rerank(&self, query: &str, documents: &[String], top_k: Option<usize>, cancel: CancelToken) -> Result<Vec<RankedDocument>>;
}

#[derive(Debug, Clone, Default)]
pub struct ImageGenOptions {
    pub size: Option<String>,
    pub n: Option<u32>,
    pub response_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Option<Vec<u8>>,
    pub url: Option<String>,
}

#[async_trait]
pub trait ImageGen: ProviderInfo {
    async fn generate_image(&self, prompt: &str, options: ImageGenOptions, cancel: CancelToken) -> Result<Vec<GeneratedImage>>;
}

#[derive(Debug, Clone, Default)]
pub struct SpeechOptions {
    pub voice: Option<String>,
    pub format: Option<String>,
}

#[async_trait]
pub trait Tts: ProviderInfo {
    async fn generate_speech(&self, text: &str, options: SpeechOptions, cancel: CancelToken) -> Result<Vec<u8>>;
    async fn stream_speech(&self, text: &str, options: SpeechOptions, cancel: CancelToken) -> Result<BoxStream<'static, Result<Vec<u8>>>>;
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptionOptions {
    pub language: Option<String>,
}

#[async_trait]
pub trait Stt: ProviderInfo {
    async fn transcribe(&self, audio: &[u8], options: TranscriptionOptions, cancel: CancelToken) -> Result<String>;
    async fn translate_audio(&self, audio: &[u8], options: TranscriptionOptions, cancel: CancelToken) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait ModelListing: ProviderInfo {
    async fn list_models(&self, cancel: CancelToken) -> Result<Vec<ModelInfo>>;
}

#[derive(Debug, Clone)]
pub struct ModerationResult {
    pub flagged: bool,
    pub categories: Vec<String>,
}

#[async_trait]
pub trait Moderation: ProviderInfo {
    async fn moderate(&self, text: &str, cancel: CancelToken) -> Result<ModerationResult>;
}
