//! JSONL chunk parser (spec.md §4.5 item 4), used by the Ollama provider adapter: same line
//! buffering as SSE, but every complete line is a full JSON value rather than a `data:`-wrapped
//! event.

use serde_json::Value;

use crate::streaming::sse::SseLineBuffer;

#[derive(Debug, Default)]
pub struct JsonlParser {
    lines: SseLineBuffer,
}

/// One parsed line: malformed JSON is reported as an error without tearing down the parser,
/// matching spec.md §4.5's "malformed JSON within a single event is reported with a warning and
/// skipped without terminating the stream."
pub type JsonlLine = std::result::Result<Value, String>;

impl JsonlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<JsonlLine> {
        self.lines
            .push(chunk)
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<Value>(&line).map_err(|e| e.to_string()))
            .collect()
    }

    pub fn reset(&mut self) {
        self.lines.reset();
    }
}
