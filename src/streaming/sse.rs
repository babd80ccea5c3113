//! Server-Sent Events parsing (spec.md §4.5 items 2–3).
//!
//! Split into a line buffer (byte/string boundaries rarely align with SSE lines either) and an
//! event parser (groups `event:`/`data:` directives into one event per blank line). Grounded in
//! the raw SSE loop in `wire`'s `AnthropicClient::process_stream` (see
//! `examples/other_examples/68d8bff5_JTan2231-wire__crates-wire-src-anthropic.rs.rs`), adapted
//! into a reusable per-stream state machine rather than one inline loop.

/// Accumulates a string buffer and emits complete lines (split on `\n`, with a trailing `\r`
/// trimmed), retaining any trailing partial line across calls.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let mut line: String = self.buf.drain(..=pos).collect();
            line.pop(); // drop the '\n' itself
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// One parsed SSE event: an optional `event:` name and the joined `data:` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// The result of feeding one line into `SseEventParser`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseOutcome {
    /// A full event is ready.
    Event(SseEvent),
    /// A `[DONE]` sentinel was observed — the parser has already reset itself.
    Done,
}

/// Groups complete SSE lines into events. Tolerates keep-alive comment lines (`:…`), bare
/// `data:` lines with no preceding `event:` (OpenAI-style), and `[DONE]` sentinels, on which it
/// resets.
#[derive(Debug, Default)]
pub struct SseEventParser {
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseEventParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) -> Option<SseOutcome> {
        if line.is_empty() {
            if self.event.is_none() && self.data_lines.is_empty() {
                return None; // stray blank line between events
            }
            let data = self.data_lines.join("\n");
            let event = self.event.take();
            self.data_lines.clear();
            return Some(SseOutcome::Event(SseEvent { event, data }));
        }

        if line.starts_with(':') {
            return None; // keep-alive comment
        }

        if let Some(rest) = line.strip_prefix("event:") {
            self.event = Some(rest.trim_start().to_string());
            return None;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let value = rest.trim_start().to_string();
            if value == "[DONE]" {
                self.reset();
                return Some(SseOutcome::Done);
            }
            self.data_lines.push(value);
            return None;
        }

        // No recognized prefix: treat as a bare data line.
        if line == "[DONE]" {
            self.reset();
            return Some(SseOutcome::Done);
        }
        self.data_lines.push(line.to_string());
        None
    }

    pub fn reset(&mut self) {
        self.event = None;
        self.data_lines.clear();
    }
}
