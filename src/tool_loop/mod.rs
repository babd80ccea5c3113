//! The agentic tool-loop engine (spec.md §4.8), grounded in `tagawa0525-opencode-rs`'s
//! `stream_response_agentic`/`process_stream`/`handle_stream_result` step shape: call the
//! model, inspect what came back for pending tool calls, run them, append results, repeat.

mod approval;
mod engine;

pub use approval::{ApprovalConfig, ApprovalPredicate};
pub use engine::{
    run_tool_loop, stream_tool_loop_parts, PromptInput, ToolHandler, ToolHandlerFuture, ToolHandlerMap, ToolLoopOptions,
    ToolLoopOutcome, ToolLoopStep,
};
