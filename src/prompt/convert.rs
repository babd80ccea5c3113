//! Lossy/lossless bridges between `Prompt` and the legacy `ChatMessage` shape (spec.md §4.2).

use crate::core::error::{Error, Result};
use crate::core::message::{ChatMessage, Role, TypedBody};
use crate::core::tool::{ToolCall, ToolResult};
use crate::prompt::ir::{Prompt, PromptMessage, PromptPart};

impl Prompt {
    /// Flatten into legacy messages. Within one `PromptMessage`, `Reasoning` and `ToolCall`
    /// parts merge into a single assistant `ChatMessage` (reasoning text concatenated,
    /// then all tool calls collected); `ToolResult` parts merge into a single tool-role
    /// `ChatMessage`. A message with only `Text` parts becomes a plain text `ChatMessage`.
    /// Mixed-modality non-tool content (e.g. text + image) is represented via `typed_body`,
    /// with `content_text` carrying the first text part found, if any.
    pub fn to_chat_messages(&self) -> Result<Vec<ChatMessage>> {
        let mut out = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            out.push(prompt_message_to_chat_message(message)?);
        }
        Ok(out)
    }
}

fn prompt_message_to_chat_message(message: &PromptMessage) -> Result<ChatMessage> {
    let tool_calls: Vec<ToolCall> = message
        .parts
        .iter()
        .filter_map(|p| match p {
            PromptPart::ToolCall { id, call_type, function_name, arguments_json, provider_options } => Some(ToolCall {
                id: id.clone(),
                call_type: call_type.clone(),
                function_name: function_name.clone(),
                arguments_json: arguments_json.clone(),
                provider_options: provider_options.clone(),
            }),
            _ => None,
        })
        .collect();

    let tool_results: Vec<ToolResult> = message
        .parts
        .iter()
        .filter_map(|p| match p {
            PromptPart::ToolResult { tool_call_id, content, is_error, .. } => {
                Some(ToolResult { tool_call_id: tool_call_id.clone(), content: content.clone(), is_error: is_error.unwrap_or(false) })
            }
            _ => None,
        })
        .collect();

    let reasoning_text: Vec<&str> = message
        .parts
        .iter()
        .filter_map(|p| match p {
            PromptPart::Reasoning { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let reasoning = if reasoning_text.is_empty() { None } else { Some(reasoning_text.join("")) };

    let first_text = message.parts.iter().find_map(|p| match p {
        PromptPart::Text { text, .. } => Some(text.clone()),
        _ => None,
    });

    if !tool_results.is_empty() {
        return Ok(ChatMessage {
            role: Role::Tool,
            content_text: None,
            typed_body: TypedBody::ToolResult(tool_results),
            reasoning: None,
            name: message.name.clone(),
            provider_options: message.provider_options.clone(),
            protocol_payloads: Default::default(),
        });
    }

    if !tool_calls.is_empty() {
        return Ok(ChatMessage {
            role: Role::Assistant,
            content_text: first_text,
            typed_body: TypedBody::ToolUse(tool_calls),
            reasoning,
            name: message.name.clone(),
            provider_options: message.provider_options.clone(),
            protocol_payloads: Default::default(),
        });
    }

    // Single non-text multimodal part: represent directly.
    if message.parts.len() == 1 {
        if let Some(typed_body) = single_part_to_typed_body(&message.parts[0])? {
            return Ok(ChatMessage {
                role: message.role.clone(),
                content_text: first_text,
                typed_body,
                reasoning,
                name: message.name.clone(),
                provider_options: message.provider_options.clone(),
                protocol_payloads: Default::default(),
            });
        }
    }

    // Fall back to the text projection; non-representable combinations of mixed multimodal
    // parts without a single canonical typed_body raise InvalidRequest rather than dropping
    // content, per spec.md §4.2.
    match first_text {
        Some(text) => Ok(ChatMessage {
            role: message.role.clone(),
            content_text: Some(text.clone()),
            typed_body: TypedBody::Text(text),
            reasoning,
            name: message.name.clone(),
            provider_options: message.provider_options.clone(),
            protocol_payloads: Default::default(),
        }),
        None => Err(Error::invalid_request(
            "message has no text part and no single representable typed_body; cannot flatten to ChatMessage",
        )),
    }
}

fn single_part_to_typed_body(part: &PromptPart) -> Result<Option<TypedBody>> {
    Ok(match part {
        PromptPart::Text { text, .. } => Some(TypedBody::Text(text.clone())),
        PromptPart::Image { mime, bytes, .. } => Some(TypedBody::Image { mime: *mime, bytes: bytes.clone() }),
        PromptPart::ImageUrl { url, .. } => Some(TypedBody::ImageUrl(url.clone())),
        PromptPart::File { mime, bytes, .. } => Some(TypedBody::File { mime: mime.clone(), bytes: bytes.clone() }),
        PromptPart::UrlFile { .. } => {
            return Err(Error::invalid_request("UrlFile has no legacy ChatMessage representation"));
        }
        PromptPart::Reasoning { .. } | PromptPart::ToolCall { .. } | PromptPart::ToolResult { .. } => None,
    })
}

impl ChatMessage {
    /// Inverse of `Prompt::to_chat_messages` for a single message, preserving per-part
    /// provider options where the legacy shape kept them at the message level (they are
    /// attached to the resulting single part).
    pub fn to_prompt_message(&self) -> Result<PromptMessage> {
        let parts = match &self.typed_body {
            TypedBody::Text(text) => vec![PromptPart::Text { text: text.clone(), provider_options: self.provider_options.clone() }],
            TypedBody::Image { mime, bytes } => {
                vec![PromptPart::Image { mime: *mime, bytes: bytes.clone(), provider_options: self.provider_options.clone() }]
            }
            TypedBody::ImageUrl(url) => {
                vec![PromptPart::ImageUrl { url: url.clone(), provider_options: self.provider_options.clone() }]
            }
            TypedBody::File { mime, bytes } => {
                vec![PromptPart::File { mime: mime.clone(), bytes: bytes.clone(), provider_options: self.provider_options.clone() }]
            }
            TypedBody::ToolUse(calls) => {
                let mut parts = Vec::new();
                if let Some(reasoning) = &self.reasoning {
                    parts.push(PromptPart::Reasoning { text: reasoning.clone(), provider_options: ProviderOptionsDefault::default() });
                }
                for call in calls {
                    parts.push(PromptPart::ToolCall {
                        id: call.id.clone(),
                        call_type: call.call_type.clone(),
                        function_name: call.function_name.clone(),
                        arguments_json: call.arguments_json.clone(),
                        provider_options: call.provider_options.clone(),
                    });
                }
                parts
            }
            TypedBody::ToolResult(results) => results
                .iter()
                .map(|r| PromptPart::ToolResult {
                    tool_call_id: r.tool_call_id.clone(),
                    content: r.content.clone(),
                    is_error: Some(r.is_error),
                    provider_options: ProviderOptionsDefault::default(),
                })
                .collect(),
        };

        PromptMessage::new(self.role.clone(), parts).map_err(|e| Error::invalid_request(e.0))
    }
}

// Local alias so the conversions above read naturally without importing the type twice.
type ProviderOptionsDefault = crate::core::provider_options::ProviderOptions;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider_options::ProviderOptions;

    #[test]
    fn text_round_trips_through_chat_message() {
        let prompt_message = PromptMessage::text(Role::User, "hello");
        let mut prompt = Prompt::new();
        prompt.push(prompt_message.clone());

        let chat = prompt.to_chat_messages().unwrap();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].content_text.as_deref(), Some("hello"));

        let back = chat[0].to_prompt_message().unwrap();
        assert_eq!(back.parts.len(), 1);
        assert!(matches!(&back.parts[0], PromptPart::Text { text, .. } if text == "hello"));
    }

    #[test]
    fn reasoning_and_tool_call_parts_merge_into_one_assistant_message() {
        let parts = vec![
            PromptPart::Reasoning { text: "thinking...".into(), provider_options: ProviderOptions::default() },
            PromptPart::ToolCall {
                id: "call_1".into(),
                call_type: "function".into(),
                function_name: "add".into(),
                arguments_json: "{\"a\":1}".into(),
                provider_options: ProviderOptions::default(),
            },
        ];
        let message = PromptMessage::new(Role::Assistant, parts).unwrap();
        let mut prompt = Prompt::new();
        prompt.push(message);

        let chat = prompt.to_chat_messages().unwrap();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].reasoning.as_deref(), Some("thinking..."));
        match &chat[0].typed_body {
            TypedBody::ToolUse(calls) => assert_eq!(calls.len(), 1),
            other => panic!("expected ToolUse, got {:?}", other),
        }
    }

    #[test]
    fn tool_result_parts_merge_into_one_tool_role_message() {
        let parts = vec![
            PromptPart::ToolResult { tool_call_id: "1".into(), content: "a".into(), is_error: None, provider_options: ProviderOptions::default() },
            PromptPart::ToolResult { tool_call_id: "2".into(), content: "b".into(), is_error: Some(true), provider_options: ProviderOptions::default() },
        ];
        let message = PromptMessage::new(Role::User, parts).unwrap();
        let mut prompt = Prompt::new();
        prompt.push(message);

        let chat = prompt.to_chat_messages().unwrap();
        assert_eq!(chat[0].role, Role::Tool);
        match &chat[0].typed_body {
            TypedBody::ToolResult(results) => assert_eq!(results.len(), 2),
            other => panic!("expected ToolResult, got {:?}", other),
        }
    }

    #[test]
    fn url_file_is_not_representable_in_legacy_shape() {
        let part = PromptPart::UrlFile { mime: "application/pdf".into(), url: "https://x/y.pdf".into(), provider_options: ProviderOptions::default() };
        let message = PromptMessage::new(Role::User, vec![part]).unwrap();
        let mut prompt = Prompt::new();
        prompt.push(message);

        assert!(prompt.to_chat_messages().is_err());
    }
}
