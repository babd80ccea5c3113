//! Byte-stream parsing primitives shared by every wire protocol (spec.md §4.5). Each parser is
//! a small, per-stream state machine — never shared between concurrent invocations, per the
//! concurrency model in spec.md §5.

pub mod jsonl;
pub mod sse;
pub mod utf8;

pub use jsonl::{JsonlLine, JsonlParser};
pub use sse::{SseEvent, SseEventParser, SseLineBuffer, SseOutcome};
pub use utf8::Utf8Rechunker;
