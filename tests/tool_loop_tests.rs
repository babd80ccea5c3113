//! Drives `run_tool_loop`/`stream_tool_loop_parts` through the public `modelmux` API with a fake
//! streaming provider, complementing the non-streaming scenarios already covered by
//! `tool_loop::engine`'s in-module unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;

use modelmux::capability::{BoxStream, CapabilitySet, ChatStreamParts, ProviderInfo};
use modelmux::core::cancel::CancelToken;
use modelmux::core::error::Result;
use modelmux::core::message::ChatMessage;
use modelmux::core::stream_part::{ChatResponse, StreamPart};
use modelmux::core::tool::ToolCall;
use modelmux::tool_loop::{stream_tool_loop_parts, ApprovalConfig, PromptInput, ToolHandler, ToolHandlerMap, ToolLoopOptions};

struct ScriptedStreamingProvider {
    calls: AtomicUsize,
}

impl ProviderInfo for ScriptedStreamingProvider {
    fn provider_id(&self) -> &str {
        "scripted-stream"
    }
    fn model(&self) -> &str {
        "scripted-model"
    }
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::default()
    }
}

#[async_trait]
impl ChatStreamParts for ScriptedStreamingProvider {
    async fn chat_stream_parts(&self, _messages: &[ChatMessage], _cancel: CancelToken) -> Result<BoxStream<'static, StreamPart>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let parts: Vec<StreamPart> = if n == 0 {
            let call = ToolCall::function("call_1", "double", r#"{"n":21}"#);
            vec![StreamPart::Finish(ChatResponse { tool_calls: vec![call], ..Default::default() })]
        } else {
            vec![
                StreamPart::TextStart,
                StreamPart::TextDelta("42".to_string()),
                StreamPart::TextEnd("42".to_string()),
                StreamPart::Finish(ChatResponse { text: Some("42".to_string()), ..Default::default() }),
            ]
        };
        Ok(Box::pin(futures_util::stream::iter(parts)))
    }
}

fn double_handler() -> ToolHandler {
    Arc::new(|args, _cancel| {
        Box::pin(async move {
            let n = args.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::from(n * 2))
        })
    })
}

#[tokio::test]
async fn streaming_tool_loop_executes_a_tool_then_forwards_the_final_answer() {
    let provider = Arc::new(ScriptedStreamingProvider { calls: AtomicUsize::new(0) });
    let mut handlers: ToolHandlerMap = HashMap::new();
    handlers.insert("double".to_string(), double_handler());

    let stream = stream_tool_loop_parts(
        provider,
        None,
        PromptInput::Text("double 21".to_string()),
        handlers,
        ToolLoopOptions::default(),
        ApprovalConfig::default(),
        CancelToken::new(),
    )
    .await
    .unwrap();

    let parts: Vec<StreamPart> = stream.collect().await;

    let tool_result = parts.iter().find_map(|p| match p {
        StreamPart::ToolResult(r) => Some(r),
        _ => None,
    });
    assert_eq!(tool_result.unwrap().content, "42");
    assert!(!tool_result.unwrap().is_error);

    let finish = parts.iter().find_map(|p| match p {
        StreamPart::Finish(r) => Some(r),
        _ => None,
    });
    assert_eq!(finish.unwrap().text.as_deref(), Some("42"));

    // Exactly one Finish should reach the caller even though two steps ran.
    assert_eq!(parts.iter().filter(|p| p.is_finish()).count(), 1);
}

#[tokio::test]
async fn streaming_tool_loop_surfaces_approval_gate_as_an_error_part() {
    let provider = Arc::new(ScriptedStreamingProvider { calls: AtomicUsize::new(0) });
    let mut handlers: ToolHandlerMap = HashMap::new();
    handlers.insert("double".to_string(), double_handler());
    let approval = ApprovalConfig::new().with_tool("double", Arc::new(|_| true));

    let stream = stream_tool_loop_parts(
        provider,
        None,
        PromptInput::Text("double 21".to_string()),
        handlers,
        ToolLoopOptions::default(),
        approval,
        CancelToken::new(),
    )
    .await
    .unwrap();

    let parts: Vec<StreamPart> = stream.collect().await;
    assert_eq!(parts.len(), 1);
    assert!(parts[0].is_error());
}
