//! Anthropic Messages request construction (spec.md §4.7).
//!
//! Grounded in `JTan2231-wire`'s `AnthropicClient::format_messages` (system prompt lifted to a
//! top-level field, consecutive tool-result messages grouped into one `user` turn, tool calls
//! folded into the assistant turn's content array).

use serde_json::{json, Value};

use crate::core::error::Result;
use crate::core::message::{ChatMessage, Role, TypedBody};
use crate::core::tool::FunctionTool;
use crate::protocol::anthropic_compat::config::AnthropicCompatConfig;
use crate::protocol::openai_compat::request::invalid_request_if_empty;

/// Resolve the effective `cache_control` for one block: an explicit value set on the message's
/// `provider_options["anthropic"]["cacheControl"]` wins, otherwise fall back to the
/// config-level default (spec.md §9).
fn resolve_cache_control(message: &ChatMessage, cfg: &AnthropicCompatConfig) -> Option<Value> {
    message
        .provider_options
        .get::<Value>("anthropic", "cacheControl")
        .or_else(|| cfg.default_cache_control())
}

fn apply_cache_control(block: &mut Value, cache_control: &Option<Value>) {
    if let (Some(cc), Value::Object(obj)) = (cache_control, block) {
        obj.insert("cache_control".to_string(), cc.clone());
    }
}

fn content_block_json(typed_body: &TypedBody, content_text: &Option<String>) -> Value {
    match typed_body {
        TypedBody::Text(t) => json!({"type": "text", "text": t}),
        TypedBody::ImageUrl(url) => json!({"type": "image", "source": {"type": "url", "url": url}}),
        TypedBody::Image { mime, bytes } => {
            json!({"type": "image", "source": {"type": "base64", "media_type": mime.as_str(), "data": crate::protocol::openai_compat::request::base64_encode(bytes)}})
        }
        TypedBody::File { .. } | TypedBody::ToolUse(_) | TypedBody::ToolResult(_) => {
            json!({"type": "text", "text": content_text.clone().unwrap_or_default()})
        }
    }
}

/// Build the Anthropic `messages` array and the top-level `system` string, grouping
/// `ToolResult` parts into one `user` turn and `ToolUse` calls into the assistant turn's
/// content array, mirroring spec.md §4.7's wire shape.
fn build_messages_and_system(messages: &[ChatMessage], cfg: &AnthropicCompatConfig) -> (Vec<Value>, Option<String>) {
    let mut system_parts = Vec::new();
    let mut out = Vec::new();

    for message in messages {
        let cache_control = resolve_cache_control(message, cfg);

        match (&message.role, &message.typed_body) {
            (Role::System, TypedBody::Text(t)) => system_parts.push(t.clone()),
            (_, TypedBody::ToolResult(results)) => {
                let blocks: Vec<Value> = results
                    .iter()
                    .map(|r| {
                        let mut b = json!({
                            "type": "tool_result",
                            "tool_use_id": r.tool_call_id,
                            "content": r.content,
                        });
                        if r.is_error {
                            b["is_error"] = Value::Bool(true);
                        }
                        apply_cache_control(&mut b, &cache_control);
                        b
                    })
                    .collect();
                out.push(json!({"role": "user", "content": blocks}));
            }
            (Role::Assistant, TypedBody::ToolUse(calls)) => {
                let mut blocks = Vec::new();
                if let Some(text) = &message.content_text {
                    if !text.is_empty() {
                        blocks.push(json!({"type": "text", "text": text}));
                    }
                }
                for call in calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.function_name,
                        "input": call.arguments(),
                    }));
                }
                out.push(json!({"role": "assistant", "content": blocks}));
            }
            (role, typed_body) => {
                let mut block = content_block_json(typed_body, &message.content_text);
                apply_cache_control(&mut block, &cache_control);
                let role_str = if *role == Role::Assistant { "assistant" } else { "user" };
                out.push(json!({"role": role_str, "content": [block]}));
            }
        }
    }

    let system = if system_parts.is_empty() { None } else { Some(system_parts.join("\n\n")) };
    (out, system)
}

/// Build the `messages` request body per spec.md §4.7's ordered rules.
pub fn build_messages_request(cfg: &AnthropicCompatConfig, messages: &[ChatMessage], tools: &[FunctionTool]) -> Result<Value> {
    invalid_request_if_empty(messages)?;
    let config = cfg.config;
    let (messages_json, system_from_messages) = build_messages_and_system(messages, cfg);
    let system = config.system_prompt.clone().or(system_from_messages);

    let mut body = json!({
        "model": config.model,
        "messages": messages_json,
        "max_tokens": config.max_tokens.unwrap_or(4096),
        "stream": false,
    });

    if let Some(system) = system {
        body["system"] = json!(system);
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
    if !config.stop_sequences.is_empty() {
        body["stop_sequences"] = json!(config.stop_sequences);
    }

    if let Some(effort) = &config.reasoning_effort {
        let budget: u32 = match effort.as_str() {
            "low" => 4096,
            "high" => 32768,
            _ => 16384,
        };
        body["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
        body.as_object_mut().unwrap().remove("temperature");
        body.as_object_mut().unwrap().remove("top_p");
    }

    if !tools.is_empty() {
        let tools_json: Vec<Value> = tools
            .iter()
            .map(|t| json!({"name": t.name, "description": t.description, "input_schema": t.parameters_schema}))
            .collect();
        body["tools"] = json!(tools_json);
    }
    for provider_tool in &config.provider_tools {
        let entry: Value = serde_json::to_value(&provider_tool.options).unwrap_or_default();
        let mut entry = if entry.is_object() { entry } else { json!({}) };
        entry["type"] = json!(provider_tool.id);
        body.as_object_mut().unwrap().entry("tools").or_insert_with(|| json!([])).as_array_mut().unwrap().push(entry);
    }
    if let Some(choice) = cfg.tool_choice_json() {
        body["tool_choice"] = choice;
    }

    if let Some(extra) = cfg.extra_body.clone() {
        if let (Value::Object(base), Value::Object(overlay)) = (&mut body, extra) {
            for (k, v) in overlay {
                base.insert(k, v);
            }
        }
    }

    Ok(body)
}
