//! ElevenLabs adapter: text-to-speech and speech-to-text over ElevenLabs' REST API (spec.md §6),
//! the one built-in provider reached through `Tts`/`Stt` rather than `Chat`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::capability::{
    BoxStream, CapabilityKind, CapabilitySet, ProviderInfo, SpeechOptions, Stt, TranscriptionOptions, Tts,
};
use crate::core::cancel::CancelToken;
use crate::core::config::LLMConfig;
use crate::core::error::{Error, Result};
use crate::transport::Transport;

pub fn elevenlabs(config: LLMConfig, transport: Arc<dyn Transport>) -> ElevenLabsProvider {
    ElevenLabsProvider { config, transport }
}

pub struct ElevenLabsProvider {
    config: LLMConfig,
    transport: Arc<dyn Transport>,
}

impl ElevenLabsProvider {
    fn headers(&self, content_type: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        if let Some(key) = &self.config.api_key {
            headers.insert("xi-api-key".to_string(), key.clone());
        }
        for (k, v) in &self.config.transport_options.custom_headers {
            headers.insert(k.clone(), v.clone());
        }
        headers
    }

    /// `voiceId` defaults to the configured model id, matching ElevenLabs' own convention of
    /// naming a voice the way other providers name a model.
    fn voice_id(&self) -> String {
        self.config
            .provider_options
            .get::<String>("elevenlabs", "voiceId")
            .unwrap_or_else(|| self.config.model.clone())
    }

    fn voice_settings(&self) -> Option<Value> {
        let mut settings = serde_json::Map::new();
        if let Some(v) = self.config.provider_options.get::<f64>("elevenlabs", "stability") {
            settings.insert("stability".to_string(), json!(v));
        }
        if let Some(v) = self.config.provider_options.get::<f64>("elevenlabs", "similarityBoost") {
            settings.insert("similarity_boost".to_string(), json!(v));
        }
        if let Some(v) = self.config.provider_options.get::<f64>("elevenlabs", "style") {
            settings.insert("style".to_string(), json!(v));
        }
        if let Some(v) = self.config.provider_options.get::<bool>("elevenlabs", "useSpeakerBoost") {
            settings.insert("use_speaker_boost".to_string(), json!(v));
        }
        if settings.is_empty() { None } else { Some(Value::Object(settings)) }
    }

    fn speech_body(&self, text: &str) -> Value {
        let mut body = json!({"text": text, "model_id": self.config.model});
        if let Some(settings) = self.voice_settings() {
            body["voice_settings"] = settings;
        }
        body
    }
}

impl ProviderInfo for ElevenLabsProvider {
    fn provider_id(&self) -> &str {
        "elevenlabs"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new([CapabilityKind::Tts, CapabilityKind::Stt])
    }
}

#[async_trait]
impl Tts for ElevenLabsProvider {
    async fn generate_speech(&self, text: &str, options: SpeechOptions, cancel: CancelToken) -> Result<Vec<u8>> {
        let voice_id = options.voice.unwrap_or_else(|| self.voice_id());
        let endpoint = format!("{}/text-to-speech/{}", self.config.base_url.trim_end_matches('/'), voice_id);
        let body = self.speech_body(text);
        let bytes = serde_json::to_vec(&body).map_err(Error::from)?;
        self.transport.post_raw_bytes(&endpoint, &self.headers("application/json"), bytes, &cancel).await
    }

    async fn stream_speech(&self, text: &str, options: SpeechOptions, cancel: CancelToken) -> Result<BoxStream<'static, Result<Vec<u8>>>> {
        let voice_id = options.voice.unwrap_or_else(|| self.voice_id());
        let endpoint = format!("{}/text-to-speech/{}/stream", self.config.base_url.trim_end_matches('/'), voice_id);
        let body = self.speech_body(text);
        let byte_stream = self.transport.post_stream(&endpoint, &self.headers("application/json"), body, &cancel).await?;
        Ok(Box::pin(byte_stream.map(|chunk| chunk)))
    }
}

#[async_trait]
impl Stt for ElevenLabsProvider {
    async fn transcribe(&self, audio: &[u8], options: TranscriptionOptions, cancel: CancelToken) -> Result<String> {
        let endpoint = format!("{}/speech-to-text", self.config.base_url.trim_end_matches('/'));
        let mut fields = vec![("model_id".to_string(), self.config.model.clone())];
        if let Some(language) = &options.language {
            fields.push(("language_code".to_string(), language.clone()));
        }
        let (body, content_type) = multipart_body(&fields, "file", "audio.wav", "audio/wav", audio);
        let response_bytes = self.transport.post_raw_bytes(&endpoint, &self.headers(&content_type), body, &cancel).await?;
        let response: Value = serde_json::from_slice(&response_bytes).map_err(|e| Error::response_format(e.to_string()))?;
        response
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::response_format("missing text"))
    }

    /// ElevenLabs has no dedicated translation endpoint; transcription with a forced target
    /// language code is the closest equivalent it exposes.
    async fn translate_audio(&self, audio: &[u8], options: TranscriptionOptions, cancel: CancelToken) -> Result<String> {
        self.transcribe(audio, options, cancel).await
    }
}

/// Minimal `multipart/form-data` encoder for the one audio-file upload this adapter needs.
fn multipart_body(fields: &[(String, String)], file_field: &str, filename: &str, file_mime: &str, file_bytes: &[u8]) -> (Vec<u8>, String) {
    let boundary = "----cloudllm-boundary-7f3a9c1e";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes());
    }
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{file_field}\"; filename=\"{filename}\"\r\nContent-Type: {file_mime}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (body, format!("multipart/form-data; boundary={boundary}"))
}
