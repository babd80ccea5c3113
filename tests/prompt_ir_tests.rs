//! Round-trips and invariant checks for the `Prompt` IR through the public API, complementing the
//! conversion-focused unit tests already living in `prompt::convert`.

use modelmux::core::message::{Role, TypedBody};
use modelmux::core::provider_options::ProviderOptions;
use modelmux::prompt::ir::{Prompt, PromptMessage, PromptPart};

fn tool_call_part() -> PromptPart {
    PromptPart::ToolCall {
        id: "call_1".into(),
        call_type: "function".into(),
        function_name: "lookup".into(),
        arguments_json: r#"{"q":"weather"}"#.into(),
        provider_options: ProviderOptions::default(),
    }
}

fn tool_result_part() -> PromptPart {
    PromptPart::ToolResult { tool_call_id: "call_1".into(), content: "sunny".into(), is_error: None, provider_options: ProviderOptions::default() }
}

fn reasoning_part() -> PromptPart {
    PromptPart::Reasoning { text: "thinking it over".into(), provider_options: ProviderOptions::default() }
}

#[test]
fn prompt_with_mixed_roles_converts_to_chat_messages_and_back() {
    let mut prompt = Prompt::new();
    prompt.push(PromptMessage::new(Role::System, vec![PromptPart::text("be terse")]).unwrap());
    prompt.push(PromptMessage::new(Role::User, vec![PromptPart::text("what is 2+2?")]).unwrap());

    let messages = prompt.to_chat_messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].content_text.as_deref(), Some("what is 2+2?"));

    let round_tripped: Vec<PromptMessage> = messages.iter().map(|m| m.to_prompt_message().unwrap()).collect();
    assert_eq!(round_tripped.len(), 2);
}

#[test]
fn tool_call_part_requires_assistant_role() {
    let result = PromptMessage::new(Role::User, vec![tool_call_part()]);
    assert!(result.is_err());
}

#[test]
fn tool_result_part_requires_user_or_tool_role() {
    assert!(PromptMessage::new(Role::User, vec![tool_result_part()]).is_ok());
    assert!(PromptMessage::new(Role::Assistant, vec![tool_result_part()]).is_err());
}

#[test]
fn empty_parts_are_rejected() {
    let result = PromptMessage::new(Role::User, vec![]);
    assert!(result.is_err());
}

#[test]
fn system_message_with_a_non_text_part_is_rejected() {
    let result = PromptMessage::new(Role::System, vec![tool_result_part()]);
    assert!(result.is_err());
}

#[test]
fn reasoning_and_tool_call_merge_into_one_assistant_chat_message() {
    let mut prompt = Prompt::new();
    prompt.push(PromptMessage::new(Role::Assistant, vec![reasoning_part(), tool_call_part()]).unwrap());

    let messages = prompt.to_chat_messages().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].reasoning.as_deref(), Some("thinking it over"));
    assert!(matches!(messages[0].typed_body, TypedBody::ToolUse(ref calls) if calls.len() == 1));
}
