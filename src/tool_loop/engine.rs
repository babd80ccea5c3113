//! Per-step loop driver (spec.md §4.8).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;

use crate::capability::{BoxStream, Chat, ChatStreamParts, PromptChat, PromptChatStreamParts};
use crate::core::cancel::CancelToken;
use crate::core::error::{Error, Result};
use crate::core::message::{ChatMessage, Role, TypedBody};
use crate::core::stream_part::{ChatResponse, StreamPart};
use crate::core::tool::{ToolCall, ToolResult};
use crate::prompt::ir::Prompt;

use super::approval::ApprovalConfig;

pub type ToolHandlerFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;
/// A local tool implementation: parsed arguments and a child `CancelToken` in, a JSON (or
/// scalar) result out.
pub type ToolHandler = Arc<dyn Fn(Value, CancelToken) -> ToolHandlerFuture + Send + Sync>;
pub type ToolHandlerMap = HashMap<String, ToolHandler>;

/// The three prompt shapes §4.8 accepts. Exactly one variant is ever in play, so this is a
/// closed enum rather than three optional fields a caller could set inconsistently.
pub enum PromptInput {
    Text(String),
    Messages(Vec<ChatMessage>),
    PromptIr(Prompt),
}

#[derive(Debug, Clone)]
pub struct ToolLoopOptions {
    pub max_steps: usize,
    pub parallel_tool_calls: bool,
    pub continue_on_tool_error: bool,
    pub system: Option<String>,
}

impl Default for ToolLoopOptions {
    fn default() -> Self {
        ToolLoopOptions { max_steps: 10, parallel_tool_calls: false, continue_on_tool_error: true, system: None }
    }
}

/// One completed model turn within a run.
#[derive(Debug, Clone)]
pub struct ToolLoopStep {
    pub index: usize,
    pub assistant_message: ChatMessage,
    pub response: ChatResponse,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
}

/// Final outcome of `run_tool_loop`.
#[derive(Debug, Clone)]
pub enum ToolLoopOutcome {
    Completed { response: ChatResponse, assistant_message: ChatMessage, steps: Vec<ToolLoopStep>, messages: Vec<ChatMessage> },
    Blocked {
        step_index: usize,
        response: ChatResponse,
        tool_calls: Vec<ToolCall>,
        needing_approval: Vec<ToolCall>,
        prior_steps: Vec<ToolLoopStep>,
        messages: Vec<ChatMessage>,
    },
}

fn standardize_input(input: PromptInput, system: &Option<String>) -> Result<(Vec<ChatMessage>, Option<Prompt>)> {
    let (mut messages, prompt_ir) = match input {
        PromptInput::Text(text) => {
            if text.trim().is_empty() {
                return Err(Error::invalid_request("prompt text must not be empty"));
            }
            (vec![ChatMessage::user(text)], None)
        }
        PromptInput::Messages(messages) => {
            if messages.is_empty() {
                return Err(Error::invalid_request("messages must not be empty"));
            }
            (messages, None)
        }
        PromptInput::PromptIr(prompt) => {
            if prompt.messages.is_empty() {
                return Err(Error::invalid_request("prompt must not be empty"));
            }
            let messages = prompt.to_chat_messages()?;
            (messages, Some(prompt))
        }
    };

    if let Some(system) = system {
        if !messages.iter().any(|m| m.role == Role::System) {
            messages.insert(0, ChatMessage::system(system.clone()));
        }
    }

    Ok((messages, prompt_ir))
}

/// Append the assistant's produced content back onto whichever representation the caller
/// standardized on, so continuity (e.g. Anthropic thinking signatures riding in
/// `protocol_payloads`) survives into the next step without being reconstructed from scratch.
fn append_assistant_turn(messages: &mut Vec<ChatMessage>, prompt_ir: &mut Option<Prompt>, assistant_message: &ChatMessage) -> Result<()> {
    messages.push(assistant_message.clone());
    if let Some(prompt) = prompt_ir {
        prompt.push(assistant_message.to_prompt_message()?);
    }
    Ok(())
}

fn tool_result_message(results: Vec<ToolResult>) -> ChatMessage {
    ChatMessage {
        role: Role::Tool,
        content_text: None,
        typed_body: TypedBody::ToolResult(results),
        reasoning: None,
        name: None,
        provider_options: Default::default(),
        protocol_payloads: Default::default(),
    }
}

fn append_tool_results(messages: &mut Vec<ChatMessage>, prompt_ir: &mut Option<Prompt>, results: Vec<ToolResult>) -> Result<()> {
    let tool_message = tool_result_message(results);
    messages.push(tool_message.clone());
    if let Some(prompt) = prompt_ir {
        prompt.push(tool_message.to_prompt_message()?);
    }
    Ok(())
}

/// Reconstruct an assistant `ChatMessage` from an aggregated `ChatResponse`, for the streaming
/// path where `ChatStreamParts` only yields `StreamPart`s, never the provider's native assistant
/// message object. `run_tool_loop`'s non-streaming path instead threads the provider's verbatim
/// `assistant_message` through, which preserves more (e.g. `protocol_payloads`).
fn response_to_assistant_message(response: &ChatResponse) -> ChatMessage {
    let typed_body = if !response.tool_calls.is_empty() {
        TypedBody::ToolUse(response.tool_calls.clone())
    } else {
        TypedBody::Text(response.text.clone().unwrap_or_default())
    };
    ChatMessage {
        role: Role::Assistant,
        content_text: response.text.clone(),
        typed_body,
        reasoning: response.thinking.clone(),
        name: None,
        provider_options: Default::default(),
        protocol_payloads: Default::default(),
    }
}

async fn run_one_tool(call: &ToolCall, handlers: &ToolHandlerMap, cancel: &CancelToken) -> ToolResult {
    match handlers.get(&call.function_name) {
        Some(handler) => match handler(call.arguments(), cancel.child()).await {
            Ok(output) => ToolResult::from_handler_output(call.id.clone(), output),
            Err(err) => ToolResult::failure(call.id.clone(), err.to_string()),
        },
        None => ToolResult::failure(call.id.clone(), format!("no handler registered for tool \"{}\"", call.function_name)),
    }
}

async fn execute_tool_calls(tool_calls: &[ToolCall], handlers: &ToolHandlerMap, parallel: bool, continue_on_error: bool, cancel: &CancelToken) -> Vec<ToolResult> {
    if parallel {
        let futures = tool_calls.iter().map(|call| run_one_tool(call, handlers, cancel));
        futures_util::future::join_all(futures).await
    } else {
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            let result = run_one_tool(call, handlers, cancel).await;
            let is_error = result.is_error;
            results.push(result);
            if is_error && !continue_on_error {
                break;
            }
        }
        results
    }
}

/// Run the non-streaming tool loop (spec.md §4.8's 5-step algorithm): call the model, return if
/// it made no tool calls, otherwise check approval gates, execute the calls, append results, and
/// repeat — up to `options.max_steps`. When the caller passed `PromptInput::PromptIr` and also
/// supplies `prompt_provider`, step 1 calls the model with the Prompt IR directly instead of the
/// flattened `messages` (spec.md §4.8 step 1's "or Prompt IR, if the provider implements the
/// Prompt variant"); otherwise it falls back to `provider.chat` on the flattened messages.
pub async fn run_tool_loop(
    provider: &(dyn Chat + Send + Sync),
    prompt_provider: Option<&(dyn PromptChat + Send + Sync)>,
    input: PromptInput,
    handlers: &ToolHandlerMap,
    options: &ToolLoopOptions,
    approval: &ApprovalConfig,
    cancel: CancelToken,
) -> Result<ToolLoopOutcome> {
    let (mut messages, mut prompt_ir) = standardize_input(input, &options.system)?;
    let mut steps = Vec::new();

    for step_index in 0..options.max_steps {
        cancel.check()?;

        let step_cancel = cancel.child();
        let turn = match (&prompt_ir, prompt_provider) {
            (Some(prompt), Some(pp)) => pp.prompt_chat(prompt, step_cancel.clone()).await?,
            _ => provider.chat(&messages, step_cancel.clone()).await?,
        };
        let response = turn.response;
        let assistant_message = turn.assistant_message;

        if response.tool_calls.is_empty() {
            append_assistant_turn(&mut messages, &mut prompt_ir, &assistant_message)?;
            steps.push(ToolLoopStep {
                index: step_index,
                assistant_message: assistant_message.clone(),
                response: response.clone(),
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
            });
            return Ok(ToolLoopOutcome::Completed { response, assistant_message, steps, messages });
        }

        let needing_approval: Vec<ToolCall> = response.tool_calls.iter().filter(|c| approval.needs_approval(c)).cloned().collect();
        if !needing_approval.is_empty() {
            append_assistant_turn(&mut messages, &mut prompt_ir, &assistant_message)?;
            return Ok(ToolLoopOutcome::Blocked {
                step_index,
                response: response.clone(),
                tool_calls: response.tool_calls.clone(),
                needing_approval,
                prior_steps: steps,
                messages,
            });
        }

        let tool_calls = response.tool_calls.clone();
        let tool_results = execute_tool_calls(&tool_calls, handlers, options.parallel_tool_calls, options.continue_on_tool_error, &step_cancel).await;

        append_assistant_turn(&mut messages, &mut prompt_ir, &assistant_message)?;
        append_tool_results(&mut messages, &mut prompt_ir, tool_results.clone())?;

        steps.push(ToolLoopStep { index: step_index, assistant_message, response, tool_calls, tool_results });
    }

    Err(Error::invalid_request("maxSteps exceeded"))
}

/// Run the streaming tool loop. Forwards every `StreamPart` from each step's provider stream
/// unchanged, except it swallows the intermediate `Finish` of every step but the last (the loop
/// emits exactly one terminal `Finish`, and a `ToolResult` part between steps for each executed
/// call). An approval gate ends the stream with a single `Error` part rather than returning a
/// `Blocked` value, since the streaming contract has no return channel for it.
pub async fn stream_tool_loop_parts(
    provider: Arc<dyn ChatStreamParts + Send + Sync>,
    prompt_provider: Option<Arc<dyn PromptChatStreamParts + Send + Sync>>,
    input: PromptInput,
    handlers: ToolHandlerMap,
    options: ToolLoopOptions,
    approval: ApprovalConfig,
    cancel: CancelToken,
) -> Result<BoxStream<'static, StreamPart>> {
    let (messages, prompt_ir) = standardize_input(input, &options.system)?;

    let stream = async_stream::stream! {
        let mut messages = messages;
        let mut prompt_ir = prompt_ir;

        for _step_index in 0..options.max_steps {
            if let Err(e) = cancel.check() {
                yield StreamPart::Error(e);
                return;
            }

            let step_cancel = cancel.child();
            let provider_stream = match (&prompt_ir, &prompt_provider) {
                (Some(prompt), Some(pp)) => pp.prompt_chat_stream_parts(prompt, step_cancel.clone()).await,
                _ => provider.chat_stream_parts(&messages, step_cancel.clone()).await,
            };
            let provider_stream = match provider_stream {
                Ok(s) => s,
                Err(e) => {
                    yield StreamPart::Error(e);
                    return;
                }
            };
            futures_util::pin_mut!(provider_stream);

            let mut step_response: Option<ChatResponse> = None;
            while let Some(part) = provider_stream.next().await {
                match part {
                    StreamPart::Finish(response) => step_response = Some(response),
                    StreamPart::Error(e) => {
                        yield StreamPart::Error(e);
                        return;
                    }
                    other => yield other,
                }
            }

            let response = match step_response {
                Some(r) => r,
                None => {
                    yield StreamPart::Error(Error::response_format("stream ended without a Finish part"));
                    return;
                }
            };

            if response.tool_calls.is_empty() {
                yield StreamPart::Finish(response);
                return;
            }

            let needing_approval = response.tool_calls.iter().any(|c| approval.needs_approval(c));
            if needing_approval {
                let names: Vec<&str> = response.tool_calls.iter().map(|c| c.function_name.as_str()).collect();
                yield StreamPart::Error(Error::generic(format!("tool approval required for: {}", names.join(", "))));
                return;
            }

            let assistant_message = response_to_assistant_message(&response);
            let tool_calls = response.tool_calls.clone();
            let tool_results = execute_tool_calls(&tool_calls, &handlers, options.parallel_tool_calls, options.continue_on_tool_error, &step_cancel).await;

            for result in &tool_results {
                yield StreamPart::ToolResult(result.clone());
            }

            if let Err(e) = append_assistant_turn(&mut messages, &mut prompt_ir, &assistant_message) {
                yield StreamPart::Error(e);
                return;
            }
            if let Err(e) = append_tool_results(&mut messages, &mut prompt_ir, tool_results) {
                yield StreamPart::Error(e);
                return;
            }
        }

        yield StreamPart::Error(Error::invalid_request("maxSteps exceeded"));
    };

    Ok(Box::pin(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilitySet, ProviderInfo};
    use crate::core::stream_part::ChatResponseWithAssistantMessage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        calls: AtomicUsize,
    }

    impl ProviderInfo for ScriptedProvider {
        fn provider_id(&self) -> &str {
            "scripted"
        }
        fn model(&self) -> &str {
            "scripted-model"
        }
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::default()
        }
    }

    #[async_trait]
    impl Chat for ScriptedProvider {
        async fn chat(&self, _messages: &[ChatMessage], _cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                let call = ToolCall::function("call_1", "add", "{\"a\":1,\"b\":2}");
                let response = ChatResponse { tool_calls: vec![call.clone()], ..Default::default() };
                let assistant_message = ChatMessage {
                    role: Role::Assistant,
                    content_text: None,
                    typed_body: TypedBody::ToolUse(vec![call]),
                    reasoning: None,
                    name: None,
                    provider_options: Default::default(),
                    protocol_payloads: Default::default(),
                };
                Ok(ChatResponseWithAssistantMessage { response, assistant_message })
            } else {
                let response = ChatResponse { text: Some("the answer is 3".to_string()), ..Default::default() };
                let assistant_message = ChatMessage::assistant("the answer is 3");
                Ok(ChatResponseWithAssistantMessage { response, assistant_message })
            }
        }
    }

    fn add_handler() -> ToolHandler {
        Arc::new(|args, _cancel| {
            Box::pin(async move {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
                Ok(Value::from(a + b))
            })
        })
    }

    #[tokio::test]
    async fn runs_until_model_stops_calling_tools() {
        let provider = ScriptedProvider { calls: AtomicUsize::new(0) };
        let mut handlers: ToolHandlerMap = HashMap::new();
        handlers.insert("add".to_string(), add_handler());

        let outcome = run_tool_loop(
            &provider,
            None,
            PromptInput::Text("what is 1+2?".to_string()),
            &handlers,
            &ToolLoopOptions::default(),
            &ApprovalConfig::default(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        match outcome {
            ToolLoopOutcome::Completed { response, steps, .. } => {
                assert_eq!(response.text.as_deref(), Some("the answer is 3"));
                assert_eq!(steps.len(), 2);
                assert_eq!(steps[0].tool_results[0].content, "3");
            }
            ToolLoopOutcome::Blocked { .. } => panic!("expected Completed"),
        }
    }

    #[tokio::test]
    async fn missing_handler_produces_error_tool_result_and_keeps_looping() {
        let provider = ScriptedProvider { calls: AtomicUsize::new(0) };
        let handlers: ToolHandlerMap = HashMap::new();

        let outcome = run_tool_loop(
            &provider,
            None,
            PromptInput::Text("what is 1+2?".to_string()),
            &handlers,
            &ToolLoopOptions::default(),
            &ApprovalConfig::default(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        match outcome {
            ToolLoopOutcome::Completed { steps, .. } => {
                assert!(steps[0].tool_results[0].is_error);
                assert!(steps[0].tool_results[0].content.contains("no handler registered"));
            }
            ToolLoopOutcome::Blocked { .. } => panic!("expected Completed"),
        }
    }

    #[tokio::test]
    async fn approval_required_blocks_before_executing() {
        let provider = ScriptedProvider { calls: AtomicUsize::new(0) };
        let mut handlers: ToolHandlerMap = HashMap::new();
        handlers.insert("add".to_string(), add_handler());
        let approval = ApprovalConfig::new().with_tool("add", Arc::new(|_| true));

        let outcome = run_tool_loop(
            &provider,
            None,
            PromptInput::Text("what is 1+2?".to_string()),
            &handlers,
            &ToolLoopOptions::default(),
            &approval,
            CancelToken::new(),
        )
        .await
        .unwrap();

        match outcome {
            ToolLoopOutcome::Blocked { needing_approval, step_index, .. } => {
                assert_eq!(step_index, 0);
                assert_eq!(needing_approval.len(), 1);
                assert_eq!(needing_approval[0].function_name, "add");
            }
            ToolLoopOutcome::Completed { .. } => panic!("expected Blocked"),
        }
    }

    #[tokio::test]
    async fn empty_prompt_text_is_rejected() {
        let provider = ScriptedProvider { calls: AtomicUsize::new(0) };
        let handlers: ToolHandlerMap = HashMap::new();
        let result = run_tool_loop(
            &provider,
            None,
            PromptInput::Text("   ".to_string()),
            &handlers,
            &ToolLoopOptions::default(),
            &ApprovalConfig::default(),
            CancelToken::new(),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn max_steps_of_zero_exceeds_immediately() {
        let provider = ScriptedProvider { calls: AtomicUsize::new(0) };
        let handlers: ToolHandlerMap = HashMap::new();
        let options = ToolLoopOptions { max_steps: 0, ..Default::default() };
        let result = run_tool_loop(&provider, None, PromptInput::Text("hi".to_string()), &handlers, &options, &ApprovalConfig::default(), CancelToken::new()).await;
        assert!(matches!(result, Err(Error::InvalidRequest { message }) if message == "maxSteps exceeded"));
    }

    /// A provider that only implements `PromptChat`, never `Chat`, so the test fails if the loop
    /// ever falls through to the flattened-messages path instead of the Prompt IR one.
    struct PromptOnlyProvider;

    impl ProviderInfo for PromptOnlyProvider {
        fn provider_id(&self) -> &str {
            "prompt-only"
        }
        fn model(&self) -> &str {
            "prompt-only-model"
        }
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::default()
        }
    }

    #[async_trait]
    impl Chat for PromptOnlyProvider {
        async fn chat(&self, _messages: &[ChatMessage], _cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
            panic!("run_tool_loop must prefer the Prompt IR path when prompt_provider is supplied");
        }
    }

    #[async_trait]
    impl PromptChat for PromptOnlyProvider {
        async fn prompt_chat(&self, prompt: &Prompt, _cancel: CancelToken) -> Result<ChatResponseWithAssistantMessage> {
            assert_eq!(prompt.messages.len(), 1);
            let response = ChatResponse { text: Some("answered via prompt ir".to_string()), ..Default::default() };
            Ok(ChatResponseWithAssistantMessage { response, assistant_message: ChatMessage::assistant("answered via prompt ir") })
        }
    }

    #[tokio::test]
    async fn prompt_ir_input_dispatches_to_the_prompt_chat_provider_when_supplied() {
        use crate::prompt::ir::PromptMessage;

        let provider = PromptOnlyProvider;
        let handlers: ToolHandlerMap = HashMap::new();
        let mut prompt = Prompt::new();
        prompt.push(PromptMessage::text(Role::User, "hi"));

        let outcome = run_tool_loop(
            &provider,
            Some(&provider),
            PromptInput::PromptIr(prompt),
            &handlers,
            &ToolLoopOptions::default(),
            &ApprovalConfig::default(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        match outcome {
            ToolLoopOutcome::Completed { response, .. } => assert_eq!(response.text.as_deref(), Some("answered via prompt ir")),
            ToolLoopOutcome::Blocked { .. } => panic!("expected Completed"),
        }
    }
}
