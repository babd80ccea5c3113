//! Chat Completions request construction (spec.md §4.6).
//!
//! Grounded in `cloudllm::clients::common::send_with_native_tools`'s manual JSON body
//! construction (hand-rolled `serde_json::json!` rather than a typed request struct, matching
//! the teacher's style for this exact endpoint).

use serde_json::{json, Value};

use crate::core::error::{Error, Result};
use crate::core::message::{ChatMessage, Role, TypedBody};
use crate::core::tool::FunctionTool;
use crate::protocol::openai_compat::config::OpenAiCompatConfig;

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn content_part_json(typed_body: &TypedBody, content_text: &Option<String>) -> Result<Value> {
    match typed_body {
        TypedBody::Text(t) => Ok(Value::String(t.clone())),
        TypedBody::ImageUrl(url) => Ok(json!([{"type": "image_url", "image_url": {"url": url}}])),
        TypedBody::Image { mime, bytes } => {
            let b64 = base64_encode(bytes);
            let data_url = format!("data:{};base64,{}", mime.as_str(), b64);
            Ok(json!([{"type": "image_url", "image_url": {"url": data_url}}]))
        }
        TypedBody::File { mime, bytes } => {
            let b64 = base64_encode(bytes);
            Ok(json!([{"type": "file", "file": {"file_data": format!("data:{};base64,{}", mime, b64)}}]))
        }
        TypedBody::ToolUse(_) | TypedBody::ToolResult(_) => Ok(Value::String(content_text.clone().unwrap_or_default())),
    }
}

/// Minimal base64 encoder (no external crate beyond what the teacher already depends on is
/// pulled in just for this); standard alphabet, with padding.
pub(crate) fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32;
        out.push(ALPHABET[(n >> 18 & 0x3F) as usize] as char);
        out.push(ALPHABET[(n >> 12 & 0x3F) as usize] as char);
        out.push(if chunk.len() > 1 { ALPHABET[(n >> 6 & 0x3F) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { ALPHABET[(n & 0x3F) as usize] as char } else { '=' });
    }
    out
}

/// Flatten legacy messages into the OpenAI `role/content` array, expanding `ToolResult` parts
/// into `role:"tool"` messages and `ToolUse` into `tool_calls` on an assistant message.
fn messages_to_json(messages: &[ChatMessage], system_prompt: Option<&str>) -> Result<Vec<Value>> {
    let has_system = messages.iter().any(|m| m.role == Role::System);
    let mut out = Vec::with_capacity(messages.len() + 1);

    if let (false, Some(prompt)) = (has_system, system_prompt) {
        out.push(json!({"role": "system", "content": prompt}));
    }

    for message in messages {
        match &message.typed_body {
            TypedBody::ToolResult(results) => {
                for r in results {
                    out.push(json!({"role": "tool", "tool_call_id": r.tool_call_id, "content": r.content}));
                }
            }
            TypedBody::ToolUse(calls) => {
                let tool_calls: Vec<Value> = calls
                    .iter()
                    .map(|c| json!({"id": c.id, "type": "function", "function": {"name": c.function_name, "arguments": c.arguments_json}}))
                    .collect();
                let mut entry = json!({
                    "role": "assistant",
                    "content": message.content_text.clone().unwrap_or_default(),
                    "tool_calls": tool_calls,
                });
                if let Some(name) = &message.name {
                    entry["name"] = Value::String(name.clone());
                }
                out.push(entry);
            }
            other => {
                let content = content_part_json(other, &message.content_text)?;
                let mut entry = json!({"role": role_str(&message.role), "content": content});
                if let Some(name) = &message.name {
                    entry["name"] = Value::String(name.clone());
                }
                out.push(entry);
            }
        }
    }

    Ok(out)
}

fn reasoning_effort_json(cfg: &OpenAiCompatConfig, effort: &str) -> Option<Value> {
    match cfg.provider_id {
        "openrouter" | "openrouter-openai" => Some(json!({"reasoning": {"effort": effort}})),
        id if id.starts_with("anthropic") || id == "minimax" => {
            let budget: u32 = match effort {
                "low" => 4096,
                "high" => 32768,
                _ => 16384,
            };
            Some(json!({"thinking": {"type": "enabled", "budget_tokens": budget}}))
        }
        "groq" | "groq-openai" | "google" | "google-openai" => None,
        _ => Some(json!({"reasoning_effort": effort})),
    }
}

/// Build the `chat/completions` request body per spec.md §4.6's ordered rules.
pub fn build_chat_completion_request(cfg: &OpenAiCompatConfig, messages: &[ChatMessage], tools: &[FunctionTool]) -> Result<Value> {
    invalid_request_if_empty(messages)?;
    let config = cfg.config;
    let mut body = json!({
        "model": config.model,
        "messages": messages_to_json(messages, config.system_prompt.as_deref())?,
        "stream": false,
    });

    if cfg.is_reasoning_model() {
        if let Some(max_tokens) = config.max_tokens {
            body["max_completion_tokens"] = json!(max_tokens);
        }
    } else {
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = config.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(top_k) = config.top_k {
            body["top_k"] = json!(top_k);
        }
    }

    if !config.stop_sequences.is_empty() {
        body["stop"] = json!(config.stop_sequences);
    }

    if let Some(effort) = &config.reasoning_effort {
        if let Some(extra) = reasoning_effort_json(cfg, effort) {
            merge_object(&mut body, extra);
        }
    }

    if !tools.is_empty() {
        let tools_json: Vec<Value> = tools
            .iter()
            .map(|t| json!({"type": "function", "function": {"name": t.name, "description": t.description, "parameters": t.parameters_schema}}))
            .collect();
        body["tools"] = json!(tools_json);
    }
    for provider_tool in &config.provider_tools {
        let entry: Value = serde_json::to_value(&provider_tool.options).unwrap_or_default();
        let mut entry = if entry.is_object() { entry } else { json!({}) };
        let wire_type = provider_tool.id.split_once('.').map(|(_, rest)| rest).unwrap_or(&provider_tool.id);
        entry["type"] = json!(wire_type);
        body.as_object_mut().unwrap().entry("tools").or_insert_with(|| json!([])).as_array_mut().unwrap().push(entry);
    }
    if let Some(choice) = cfg.tool_choice_json() {
        body["tool_choice"] = choice;
    }

    if let Some(schema) = &config.json_schema {
        let mut schema = schema.clone();
        if let Value::Object(obj) = &mut schema {
            obj.entry("additionalProperties").or_insert(Value::Bool(false));
        }
        let structured_outputs: Option<bool> = cfg.get_provider_option("structuredOutputs");
        if structured_outputs == Some(false) {
            body["response_format"] = json!({"type": "json_object"});
        } else {
            body["response_format"] = json!({"type": "json_schema", "json_schema": {"name": "response", "schema": schema, "strict": true}});
        }
    }

    apply_provider_passthroughs(cfg, &mut body);

    if cfg.get_provider_option::<bool>("liveSearch") == Some(true) || cfg.get_provider_option::<bool>("webSearch") == Some(true) {
        let params: Value = cfg.get_provider_option("searchParameters").unwrap_or_else(|| json!({"mode": "auto"}));
        body["search_parameters"] = params;
    }

    if let Some(user) = &config.user {
        body["user"] = json!(user);
    }
    if let Some(tier) = &config.service_tier {
        body["service_tier"] = json!(tier);
    }

    if let Some(extra) = cfg.extra_body.clone() {
        merge_object(&mut body, extra);
    }

    Ok(body)
}

fn apply_provider_passthroughs(cfg: &OpenAiCompatConfig, body: &mut Value) {
    const KEYS: &[&str] = &[
        "frequencyPenalty",
        "presencePenalty",
        "logitBias",
        "seed",
        "parallelToolCalls",
        "logprobs",
        "topLogprobs",
        "verbosity",
        "reasoningFormat",
    ];
    const WIRE_KEYS: &[&str] = &[
        "frequency_penalty",
        "presence_penalty",
        "logit_bias",
        "seed",
        "parallel_tool_calls",
        "logprobs",
        "top_logprobs",
        "verbosity",
        "reasoning_format",
    ];
    for (key, wire_key) in KEYS.iter().zip(WIRE_KEYS.iter()) {
        if let Some(value) = cfg.config.provider_options.get_raw(cfg.provider_id, key) {
            body[*wire_key] = value.clone();
        }
    }
}

fn merge_object(base: &mut Value, overlay: Value) {
    if let (Value::Object(base_map), Value::Object(overlay_map)) = (base, overlay) {
        for (k, v) in overlay_map {
            base_map.insert(k, v);
        }
    }
}

pub(crate) fn invalid_request_if_empty(messages: &[ChatMessage]) -> Result<()> {
    if messages.is_empty() {
        Err(Error::invalid_request("at least one message is required"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LLMConfig;

    fn cfg(model: &str) -> LLMConfig {
        LLMConfig::builder("openai", model).build()
    }

    #[test]
    fn reasoning_model_uses_max_completion_tokens_and_suppresses_sampling() {
        let mut config = cfg("o3-mini");
        config.max_tokens = Some(100);
        config.temperature = Some(0.7);
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &[]).unwrap();
        assert_eq!(body["max_completion_tokens"], 100);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn non_reasoning_model_keeps_sampling_params() {
        let mut config = cfg("gpt-4.1");
        config.temperature = Some(0.5);
        config.max_tokens = Some(50);
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &[]).unwrap();
        assert_eq!(body["max_tokens"], 50);
        assert_eq!(body["temperature"], 0.5);
    }

    #[test]
    fn system_prompt_prepended_only_when_absent() {
        let mut config = cfg("gpt-4.1");
        config.system_prompt = Some("be terse".into());
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &[]).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be terse");

        let with_explicit_system = [ChatMessage::system("explicit"), ChatMessage::user("hi")];
        let body2 = build_chat_completion_request(&wrapper, &with_explicit_system, &[]).unwrap();
        assert_eq!(body2["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn json_schema_gets_additional_properties_false_injected() {
        let mut config = cfg("gpt-4.1");
        config.json_schema = Some(json!({"type": "object", "properties": {}}));
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &[]).unwrap();
        assert_eq!(body["response_format"]["json_schema"]["schema"]["additionalProperties"], false);
    }

    #[test]
    fn tool_result_parts_become_role_tool_messages() {
        let config = cfg("gpt-4.1");
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let tool_result_msg = ChatMessage {
            typed_body: TypedBody::ToolResult(vec![crate::core::tool::ToolResult::success("call_1", "42")]),
            ..ChatMessage::user("")
        };
        let body = build_chat_completion_request(&wrapper, &[tool_result_msg], &[]).unwrap();
        assert_eq!(body["messages"][0]["role"], "tool");
        assert_eq!(body["messages"][0]["tool_call_id"], "call_1");
    }

    #[test]
    fn provider_tools_are_appended_to_the_tools_array_with_their_family_prefix_stripped() {
        let mut config = cfg("gpt-4.1");
        config.provider_tools = vec![crate::core::tool::ProviderTool { id: "openai.web_search_preview".into(), options: Default::default() }];
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &[]).unwrap();
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "web_search_preview");
    }

    #[test]
    fn provider_tools_coexist_with_local_function_tools() {
        let config = cfg("gpt-4.1");
        let wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        let local = [FunctionTool { name: "calculator".into(), description: String::new(), parameters_schema: json!({}) }];
        let mut body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &local).unwrap();
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        body = {
            let mut config = cfg("gpt-4.1");
            config.provider_tools = vec![crate::core::tool::ProviderTool { id: "google.code_execution".into(), options: Default::default() }];
            let wrapper = OpenAiCompatConfig::new("google", "Google", &config);
            build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &local).unwrap()
        };
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["function"]["name"], "calculator");
        assert_eq!(tools[1]["type"], "code_execution");
    }

    #[test]
    fn extra_body_wins_on_key_collision() {
        let mut config = cfg("gpt-4.1");
        config.max_tokens = Some(10);
        let mut wrapper = OpenAiCompatConfig::new("openai", "OpenAI", &config);
        wrapper.extra_body = Some(json!({"max_tokens": 999}));
        let body = build_chat_completion_request(&wrapper, &[ChatMessage::user("hi")], &[]).unwrap();
        assert_eq!(body["max_tokens"], 999);
    }
}
