//! End-to-end coverage for the Transport -> protocol -> capability trait wiring, which the
//! in-module unit tests exercise only in isolated halves (the SSE processor alone, or request
//! building alone). A mock `Transport` stands in for the network so these run with no I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde_json::{json, Value};

use modelmux::builder::LLMConfigBuilder;
use modelmux::capability::{Chat, ChatStreamParts};
use modelmux::core::cancel::CancelToken;
use modelmux::core::error::{Error, Result};
use modelmux::core::message::ChatMessage;
use modelmux::core::stream_part::StreamPart;
use modelmux::providers::{deepseek, OpenAiCompatibleProvider};
use modelmux::transport::{ByteStream, Transport};

/// Records the single most recent request it served and returns canned responses set up by the
/// test. Only the methods a given test actually exercises need non-default behavior.
#[derive(Default)]
struct MockTransport {
    json_response: Mutex<Option<Value>>,
    stream_chunks: Mutex<Vec<Vec<u8>>>,
    last_endpoint: Mutex<Option<String>>,
    last_headers: Mutex<Option<HashMap<String, String>>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(&self, endpoint: &str, headers: &HashMap<String, String>, _body: Value, _cancel: &CancelToken) -> Result<Value> {
        *self.last_endpoint.lock().unwrap() = Some(endpoint.to_string());
        *self.last_headers.lock().unwrap() = Some(headers.clone());
        self.json_response.lock().unwrap().clone().ok_or_else(|| Error::generic("no canned response"))
    }

    async fn get_json(&self, _endpoint: &str, _headers: &HashMap<String, String>, _query: &HashMap<String, String>, _cancel: &CancelToken) -> Result<Value> {
        Err(Error::generic("not implemented in mock"))
    }

    async fn post_form(&self, _endpoint: &str, _headers: &HashMap<String, String>, _form: &HashMap<String, String>, _cancel: &CancelToken) -> Result<Value> {
        Err(Error::generic("not implemented in mock"))
    }

    async fn post_raw_bytes(&self, _endpoint: &str, _headers: &HashMap<String, String>, _body: Vec<u8>, _cancel: &CancelToken) -> Result<Vec<u8>> {
        Err(Error::generic("not implemented in mock"))
    }

    async fn post_stream(&self, endpoint: &str, headers: &HashMap<String, String>, _body: Value, _cancel: &CancelToken) -> Result<ByteStream> {
        *self.last_endpoint.lock().unwrap() = Some(endpoint.to_string());
        *self.last_headers.lock().unwrap() = Some(headers.clone());
        let chunks = self.stream_chunks.lock().unwrap().clone();
        let s = stream::iter(chunks.into_iter().map(Ok));
        let boxed: ByteStream = Box::pin(s);
        Ok(boxed)
    }
}

fn sse_bytes(events: &[&str]) -> Vec<u8> {
    let mut out = String::new();
    for event in events {
        out.push_str("data: ");
        out.push_str(event);
        out.push_str("\n\n");
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

#[tokio::test]
async fn openai_compat_streaming_happy_path_matches_scenario_seed_one() {
    let transport = Arc::new(MockTransport::default());
    *transport.stream_chunks.lock().unwrap() = vec![sse_bytes(&[
        r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
        r#"{"choices":[{"index":0,"delta":{"content":"lo"}}]}"#,
        r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
    ])];

    let config = LLMConfigBuilder::new("deepseek", "deepseek-chat").api_key("test-key").build();
    let provider = deepseek(config, transport.clone());

    let messages = vec![ChatMessage::user("hi")];
    let mut stream = provider.chat_stream_parts(&messages, CancelToken::new()).await.unwrap();

    let mut parts = Vec::new();
    while let Some(part) = stream.next().await {
        parts.push(part);
    }

    assert!(matches!(parts[0], StreamPart::TextStart));
    assert!(matches!(&parts[1], StreamPart::TextDelta(s) if s == "Hel"));
    assert!(matches!(&parts[2], StreamPart::TextDelta(s) if s == "lo"));
    assert!(matches!(&parts[3], StreamPart::TextEnd(s) if s == "Hello"));
    assert!(matches!(parts[4], StreamPart::ProviderMetadata(_)));
    match &parts[5] {
        StreamPart::Finish(response) => assert_eq!(response.text.as_deref(), Some("Hello")),
        other => panic!("expected Finish, got {other:?}"),
    }

    let endpoint = transport.last_endpoint.lock().unwrap().clone().unwrap();
    assert_eq!(endpoint, "https://api.deepseek.com/v1/chat/completions");
    let headers = transport.last_headers.lock().unwrap().clone().unwrap();
    assert_eq!(headers.get("Authorization"), Some(&"Bearer test-key".to_string()));
}

#[tokio::test]
async fn openai_compat_non_streaming_chat_parses_canned_response() {
    let transport = Arc::new(MockTransport::default());
    *transport.json_response.lock().unwrap() = Some(json!({
        "id": "chatcmpl-1",
        "model": "deepseek-chat",
        "choices": [{
            "message": {"role": "assistant", "content": "the sky is blue"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 4, "total_tokens": 9}
    }));

    let config = LLMConfigBuilder::new("deepseek", "deepseek-chat").api_key("test-key").build();
    let provider = OpenAiCompatibleProvider::new("deepseek", "DeepSeek", config, transport);

    let messages = vec![ChatMessage::user("what color is the sky?")];
    let turn = provider.chat(&messages, CancelToken::new()).await.unwrap();

    assert_eq!(turn.response.text.as_deref(), Some("the sky is blue"));
    assert_eq!(turn.response.usage.unwrap().total_tokens, 9);
    assert_eq!(turn.assistant_message.role, modelmux::core::message::Role::Assistant);
}

#[tokio::test]
async fn transport_error_on_non_streaming_chat_propagates() {
    let transport = Arc::new(MockTransport::default());
    let config = LLMConfigBuilder::new("deepseek", "deepseek-chat").api_key("test-key").build();
    let provider = OpenAiCompatibleProvider::new("deepseek", "DeepSeek", config, transport);

    let messages = vec![ChatMessage::user("hi")];
    let result = provider.chat(&messages, CancelToken::new()).await;
    assert!(result.is_err());
}
