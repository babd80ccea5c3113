//! Collision-safe rewriting of local tool names against provider-native tool names
//! (spec.md §4.9).
//!
//! Before a request is built, the set of names the provider will itself inject (e.g.
//! `web_search` for Anthropic's server-side search tool) is known. Any local `FunctionTool`
//! whose name collides gets rewritten to `name__1`, `name__2`, … in the outgoing request; the
//! map translates provider tool-call names back to the caller's original names. Provider-native
//! server-tool calls never pass through this map — they only ever reach `providerMetadata`.

use std::collections::HashMap;

use crate::core::tool::{FunctionTool, ProviderTool};

/// Derive the native tool names a provider will itself place on the wire from its configured
/// `providerTools` catalog entries (spec.md §4.9 / scenario seed 6), keyed off each
/// `ProviderTool.id`'s `"<family>.<wire-name>"` shape. Anthropic's ids carry a dated suffix
/// (`anthropic.web_search_20250305`) that collapses to the stable native name the model actually
/// calls (`web_search`); OpenAI's and Google's ids already equal their wire type once the family
/// prefix is stripped.
pub fn native_tool_names(provider_tools: &[ProviderTool]) -> Vec<String> {
    provider_tools.iter().filter_map(|t| native_tool_name(&t.id)).collect()
}

fn native_tool_name(id: &str) -> Option<String> {
    let (family, rest) = id.split_once('.')?;
    match family {
        "anthropic" => {
            if rest.starts_with("web_search") {
                Some("web_search".to_string())
            } else if rest.starts_with("web_fetch") {
                Some("web_fetch".to_string())
            } else {
                None
            }
        }
        "openai" | "google" => Some(rest.to_string()),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct ToolNameMap {
    /// rewritten name -> original local name
    rewritten_to_local: HashMap<String, String>,
}

impl ToolNameMap {
    /// Build the map and return the (possibly renamed) tool list to send on the wire. Rewrites
    /// are stable within one request: the first colliding tool becomes `name__1`, the next
    /// `name__2`, and so on, in input order.
    pub fn build(tools: &[FunctionTool], native_names: &[String]) -> (Self, Vec<FunctionTool>) {
        let native: std::collections::HashSet<&str> = native_names.iter().map(String::as_str).collect();
        let mut rewritten_to_local = HashMap::new();
        let mut used_names: std::collections::HashSet<String> = native_names.iter().cloned().collect();
        let mut out = Vec::with_capacity(tools.len());

        for tool in tools {
            if native.contains(tool.name.as_str()) || used_names.contains(&tool.name) {
                let mut n = 1u32;
                let mut candidate = format!("{}__{}", tool.name, n);
                while used_names.contains(&candidate) {
                    n += 1;
                    candidate = format!("{}__{}", tool.name, n);
                }
                used_names.insert(candidate.clone());
                rewritten_to_local.insert(candidate.clone(), tool.name.clone());
                out.push(FunctionTool { name: candidate, description: tool.description.clone(), parameters_schema: tool.parameters_schema.clone() });
            } else {
                used_names.insert(tool.name.clone());
                out.push(tool.clone());
            }
        }

        (ToolNameMap { rewritten_to_local }, out)
    }

    /// Translate a name seen in a model response back to the caller's original local name.
    /// Names that were never rewritten pass through unchanged.
    pub fn to_local(&self, wire_name: &str) -> String {
        self.rewritten_to_local.get(wire_name).cloned().unwrap_or_else(|| wire_name.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.rewritten_to_local.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> FunctionTool {
        FunctionTool { name: name.to_string(), description: String::new(), parameters_schema: serde_json::json!({}) }
    }

    #[test]
    fn non_colliding_tools_pass_through_unchanged() {
        let (map, out) = ToolNameMap::build(&[tool("calculator")], &["web_search".into()]);
        assert_eq!(out[0].name, "calculator");
        assert!(map.is_empty());
        assert_eq!(map.to_local("calculator"), "calculator");
    }

    #[test]
    fn colliding_tool_is_rewritten_and_mapped_back() {
        let (map, out) = ToolNameMap::build(&[tool("web_search")], &["web_search_20250305".to_string(), "web_search".to_string()]);
        assert_eq!(out[0].name, "web_search__1");
        assert_eq!(map.to_local("web_search__1"), "web_search");
    }

    #[test]
    fn multiple_collisions_get_stable_incrementing_suffixes() {
        let (_, out) = ToolNameMap::build(&[tool("search"), tool("search")], &["search".to_string()]);
        assert_eq!(out[0].name, "search__1");
        assert_eq!(out[1].name, "search__2");
    }

    fn provider_tool(id: &str) -> ProviderTool {
        ProviderTool { id: id.to_string(), options: HashMap::new() }
    }

    #[test]
    fn anthropic_dated_web_search_id_collapses_to_its_stable_native_name() {
        let names = native_tool_names(&[provider_tool("anthropic.web_search_20250305")]);
        assert_eq!(names, vec!["web_search".to_string()]);
    }

    #[test]
    fn openai_and_google_ids_strip_to_their_wire_type() {
        let names = native_tool_names(&[provider_tool("openai.web_search_preview"), provider_tool("google.code_execution")]);
        assert_eq!(names, vec!["web_search_preview".to_string(), "code_execution".to_string()]);
    }

    #[test]
    fn a_local_tool_colliding_with_a_provider_tool_gets_rewritten() {
        let native = native_tool_names(&[provider_tool("anthropic.web_search_20250305")]);
        let (map, out) = ToolNameMap::build(&[tool("web_search")], &native);
        assert_eq!(out[0].name, "web_search__1");
        assert_eq!(map.to_local("web_search__1"), "web_search");
    }
}
