//! Approval interrupts for the tool-loop engine (spec.md §4.8 step 3).

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::tool::ToolCall;

/// Returns `true` when a tool call requires human approval before execution.
pub type ApprovalPredicate = Arc<dyn Fn(&ToolCall) -> bool + Send + Sync>;

/// Per-tool predicates take precedence over the global one; a tool with no specific predicate
/// falls back to `global`, which defaults to "never needs approval".
#[derive(Clone, Default)]
pub struct ApprovalConfig {
    pub per_tool: HashMap<String, ApprovalPredicate>,
    pub global: Option<ApprovalPredicate>,
}

impl ApprovalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: impl Into<String>, predicate: ApprovalPredicate) -> Self {
        self.per_tool.insert(name.into(), predicate);
        self
    }

    pub fn with_global(mut self, predicate: ApprovalPredicate) -> Self {
        self.global = Some(predicate);
        self
    }

    pub fn needs_approval(&self, call: &ToolCall) -> bool {
        if let Some(predicate) = self.per_tool.get(&call.function_name) {
            return predicate(call);
        }
        self.global.as_ref().map(|p| p(call)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_tool_predicate_overrides_global() {
        let config = ApprovalConfig::new()
            .with_global(Arc::new(|_| true))
            .with_tool("safe_tool", Arc::new(|_| false));
        assert!(!config.needs_approval(&ToolCall::function("1", "safe_tool", "{}")));
        assert!(config.needs_approval(&ToolCall::function("2", "other_tool", "{}")));
    }

    #[test]
    fn no_predicates_means_never_needs_approval() {
        let config = ApprovalConfig::new();
        assert!(!config.needs_approval(&ToolCall::function("1", "anything", "{}")));
    }
}
