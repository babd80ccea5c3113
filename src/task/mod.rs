//! Provider-agnostic task facade (spec.md §4.10). Every function takes a capability trait object
//! and provider-agnostic arguments; none import a concrete provider type, so new providers never
//! require a facade change.

use futures_util::StreamExt;

use crate::capability::{
    BoxStream, Chat, ChatStreamParts, Embedding, GeneratedImage, ImageGen, ImageGenOptions, RankedDocument, Rerank,
    SpeechOptions, Stt, TranscriptionOptions, Tts,
};
use crate::core::cancel::CancelToken;
use crate::core::error::{Error, Result};
use crate::core::message::ChatMessage;
use crate::core::stream_part::{ChatResponse, StreamPart};
use crate::core::tool::FunctionTool;

pub async fn generate_text(provider: &dyn Chat, messages: &[ChatMessage], cancel: CancelToken) -> Result<ChatResponse> {
    provider.chat(messages, cancel).await.map(|r| r.response)
}

/// Plain text deltas, filtered out of the full stream-part protocol; `Error` parts terminate
/// the returned stream the same way they terminate the underlying one.
pub async fn stream_text(provider: &dyn ChatStreamParts, messages: &[ChatMessage], cancel: CancelToken) -> Result<BoxStream<'static, Result<String>>> {
    let parts = provider.chat_stream_parts(messages, cancel).await?;
    let mapped = parts.filter_map(|part| async move {
        match part {
            StreamPart::TextDelta(delta) => Some(Ok(delta)),
            StreamPart::Error(e) => Some(Err(e)),
            _ => None,
        }
    });
    Ok(Box::pin(mapped))
}

/// Tool-call-based structured output (spec.md §4.10). Requires `provider` to already carry a
/// `return_object` `FunctionTool` whose schema is the one being requested — a capability's tool
/// list is fixed at construction (see DESIGN.md's Open Question decision 7), so this function
/// cannot inject the tool itself. When the model doesn't call it (either because the provider
/// wasn't configured with it, or chose not to), the first balanced JSON object in the text
/// response is extracted and validated instead.
pub async fn generate_object(provider: &dyn Chat, messages: &[ChatMessage], schema: &serde_json::Value, cancel: CancelToken) -> Result<serde_json::Value> {
    let result = provider.chat(messages, cancel).await?;
    if let Some(call) = result.response.tool_calls.iter().find(|c| c.function_name == "return_object") {
        let value = call.arguments();
        validate_against_schema(&value, schema)?;
        return Ok(value);
    }

    let text = result.response.text.as_deref().unwrap_or_default();
    let candidate = extract_balanced_json_object(text).ok_or_else(|| Error::structured_output("no JSON object found in response"))?;
    let value: serde_json::Value = serde_json::from_str(&candidate).map_err(|e| Error::structured_output(e.to_string()))?;
    validate_against_schema(&value, schema)?;
    Ok(value)
}

/// Builds the synthetic `return_object` tool a caller should pass into its `LLMConfig` before
/// calling `generate_object`, per spec.md §4.10's described strategy.
pub fn return_object_tool(schema: serde_json::Value) -> FunctionTool {
    FunctionTool {
        name: "return_object".to_string(),
        description: "Return the requested result as a single structured call. Call this exactly once.".to_string(),
        parameters_schema: schema,
    }
}

/// Scan for and parse the first top-level `{...}` substring in `text`, tracking brace depth and
/// skipping braces inside string literals.
fn extract_balanced_json_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Minimal structural validation: required top-level keys and, where declared, primitive
/// `type`s. Full JSON-Schema validation is out of scope (spec.md §4.10 Non-goals); this catches
/// the common "model returned the wrong shape" failure mode that `StructuredOutput` exists for.
fn validate_against_schema(value: &serde_json::Value, schema: &serde_json::Value) -> Result<()> {
    let Some(required) = schema.get("required").and_then(serde_json::Value::as_array) else {
        return Ok(());
    };
    let obj = value.as_object().ok_or_else(|| Error::structured_output("expected a JSON object"))?;
    for key in required {
        let Some(key) = key.as_str() else { continue };
        if !obj.contains_key(key) {
            return Err(Error::structured_output(format!("missing required field: {key}")));
        }
    }
    Ok(())
}

pub async fn embed(provider: &dyn Embedding, inputs: &[String], cancel: CancelToken) -> Result<Vec<Vec<f32>>> {
    provider.embed(inputs, cancel).await
}

pub async fn rerank(provider: &dyn Rerank, query: &str, documents: &[String], top_k: Option<usize>, cancel: CancelToken) -> Result<Vec<RankedDocument>> {
    provider.rerank(query, documents, top_k, cancel).await
}

/// Fallback reranking for providers with no native rerank endpoint (spec.md §4.10): embed
/// `[query, ...documents]` in one call, score every document by cosine similarity to the query.
pub async fn rerank_by_embedding(provider: &dyn Embedding, query: &str, documents: &[String], top_k: Option<usize>, cancel: CancelToken) -> Result<Vec<RankedDocument>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let mut inputs = Vec::with_capacity(documents.len() + 1);
    inputs.push(query.to_string());
    inputs.extend(documents.iter().cloned());

    let embeddings = provider.embed(&inputs, cancel).await?;
    let query_vec = &embeddings[0];

    let mut ranked: Vec<RankedDocument> = documents
        .iter()
        .zip(embeddings.iter().skip(1))
        .enumerate()
        .map(|(original_index, (doc, vec))| RankedDocument {
            doc: doc.clone(),
            score: cosine_similarity(query_vec, vec),
            index: 0,
            original_index,
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (rank, doc) in ranked.iter_mut().enumerate() {
        doc.index = rank;
    }
    if let Some(top_k) = top_k {
        ranked.truncate(top_k);
    }
    Ok(ranked)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub async fn generate_speech(provider: &dyn Tts, text: &str, options: SpeechOptions, cancel: CancelToken) -> Result<Vec<u8>> {
    provider.generate_speech(text, options, cancel).await
}

pub async fn stream_speech(provider: &dyn Tts, text: &str, options: SpeechOptions, cancel: CancelToken) -> Result<BoxStream<'static, Result<Vec<u8>>>> {
    provider.stream_speech(text, options, cancel).await
}

pub async fn transcribe(provider: &dyn Stt, audio: &[u8], options: TranscriptionOptions, cancel: CancelToken) -> Result<String> {
    provider.transcribe(audio, options, cancel).await
}

pub async fn translate_audio(provider: &dyn Stt, audio: &[u8], options: TranscriptionOptions, cancel: CancelToken) -> Result<String> {
    provider.translate_audio(audio, options, cancel).await
}

pub async fn generate_image(provider: &dyn ImageGen, prompt: &str, options: ImageGenOptions, cancel: CancelToken) -> Result<Vec<GeneratedImage>> {
    provider.generate_image(prompt, options, cancel).await
}
