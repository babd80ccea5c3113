//! The closed error type shared by every capability, protocol layer, and provider adapter.
//!
//! All fallible operations in this crate return `Result<T, Error>`. Provider-specific detail
//! lives in the variant's fields (message, status, body excerpt), never as a new variant —
//! see the error-taxonomy redesign note in `DESIGN.md`.

use thiserror::Error;

/// The one error type every public operation in this crate can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing credentials (HTTP 401/403).
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The request was malformed, or asked for something the target model/provider cannot
    /// represent (e.g. an image URL sent to a provider that only accepts base64 images).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// HTTP 429 without an explicit quota-exhaustion signal in the body.
    #[error("rate limited: {message}")]
    RateLimit { message: String },

    /// HTTP 429 (or equivalent) where the body indicates the account's quota, not just its
    /// rate, has been exhausted.
    #[error("quota exceeded: {message}")]
    QuotaExceeded { message: String },

    /// HTTP 404 or an equivalent "no such model" response.
    #[error("model not available: {message}")]
    ModelNotAvailable { message: String },

    /// The transport's connect/receive/send timeout elapsed. Distinct from `Cancelled`.
    #[error("timed out: {message}")]
    Timeout { message: String },

    /// A `CancelToken` registered to this call was cancelled.
    #[error("cancelled: {message}")]
    Cancelled { message: String },

    /// The provider returned a response this layer could not parse into the expected shape.
    #[error("unexpected response format: {message}")]
    ResponseFormat { message: String },

    /// A failure attributable to tool handling, further classified by `ToolErrorKind`.
    #[error("tool error ({kind:?}): {message}")]
    Tool { kind: ToolErrorKind, message: String },

    /// `generate_object` could not produce a value that validates against the requested schema.
    #[error("structured output error: {message}")]
    StructuredOutput { message: String },

    /// The provider refused to generate content for policy reasons.
    #[error("content filtered: {message}")]
    ContentFilter { message: String },

    /// HTTP 5xx or an equivalent server-side failure.
    #[error("server error: {message}")]
    Server { message: String },

    /// The capability was invoked on a provider that does not implement it. `supports()` is
    /// best-effort; this variant is the authoritative rejection when the wire call itself fails.
    #[error("unsupported capability: {message}")]
    UnsupportedCapability { message: String },

    /// JSON (de)serialization failure not otherwise classified.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP status code the transport could not map to a more specific variant.
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },

    /// Catch-all for conditions that don't fit any other kind.
    #[error("{0}")]
    Generic(String),
}

/// Sub-classification for `Error::Tool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The tool definition itself is malformed (bad schema, duplicate name, …).
    Config,
    /// Arguments returned by the model failed validation against the tool's schema.
    Validation,
    /// The local tool handler ran and raised an error.
    Execution,
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth { message: message.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest { message: message.into() }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Error::RateLimit { message: message.into() }
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Error::QuotaExceeded { message: message.into() }
    }

    pub fn model_not_available(message: impl Into<String>) -> Self {
        Error::ModelNotAvailable { message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout { message: message.into() }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Error::Cancelled { message: message.into() }
    }

    pub fn response_format(message: impl Into<String>) -> Self {
        Error::ResponseFormat { message: message.into() }
    }

    pub fn tool(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Error::Tool { kind, message: message.into() }
    }

    pub fn structured_output(message: impl Into<String>) -> Self {
        Error::StructuredOutput { message: message.into() }
    }

    pub fn content_filter(message: impl Into<String>) -> Self {
        Error::ContentFilter { message: message.into() }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Error::Server { message: message.into() }
    }

    pub fn unsupported_capability(message: impl Into<String>) -> Self {
        Error::UnsupportedCapability { message: message.into() }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Http { status, message: message.into() }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Error::Generic(message.into())
    }

    /// Map an HTTP status code to the error taxonomy per spec.md §6's transport contract.
    /// `quota` lets the caller signal that the response body indicated quota exhaustion
    /// rather than plain rate limiting (only meaningful for 429).
    pub fn from_status(status: u16, body_excerpt: impl Into<String>, quota: bool) -> Self {
        let message = body_excerpt.into();
        match status {
            401 | 403 => Error::auth(message),
            429 if quota => Error::quota_exceeded(message),
            429 => Error::rate_limit(message),
            404 => Error::model_not_available(message),
            408 | 504 => Error::timeout(message),
            500..=599 => Error::server(message),
            400..=499 => Error::invalid_request(message),
            other => Error::http(other, message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert!(matches!(Error::from_status(401, "x", false), Error::Auth { .. }));
        assert!(matches!(Error::from_status(429, "x", false), Error::RateLimit { .. }));
        assert!(matches!(Error::from_status(429, "x", true), Error::QuotaExceeded { .. }));
        assert!(matches!(Error::from_status(404, "x", false), Error::ModelNotAvailable { .. }));
        assert!(matches!(Error::from_status(408, "x", false), Error::Timeout { .. }));
        assert!(matches!(Error::from_status(500, "x", false), Error::Server { .. }));
        assert!(matches!(Error::from_status(422, "x", false), Error::InvalidRequest { .. }));
        assert!(matches!(Error::from_status(999, "x", false), Error::Http { status: 999, .. }));
    }

    #[test]
    fn timeout_and_cancelled_are_distinct_variants() {
        let t = Error::timeout("slow");
        let c = Error::cancelled("stopped");
        assert!(matches!(t, Error::Timeout { .. }));
        assert!(matches!(c, Error::Cancelled { .. }));
    }
}
