//! Decoding of structured JSON results out of completion text.
//!
//! The completion service is asked for raw JSON but routinely wraps it in a
//! markdown code fence anyway.  [`unwrap_code_fence`] strips one such fence
//! (tagged ` ```json ` or bare ` ``` `); [`parse_structured`] then runs a
//! strict whole-record serde decode.  Every parse site in the crate goes
//! through these two functions.

use serde::de::DeserializeOwned;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// A completion could not be decoded into the expected record shape.
///
/// Carries the raw completion text so failures can be diagnosed without
/// re-running the request.
#[derive(Debug, Error)]
#[error("failed to parse structured result: {source}")]
pub struct ParseError {
    #[source]
    pub source: serde_json::Error,
    /// The unmodified completion text that failed to decode.
    pub raw: String,
}

// ---------------------------------------------------------------------------
// Fence stripping
// ---------------------------------------------------------------------------

/// Strip one leading/trailing markdown code fence, if present.
///
/// Recognizes both the tagged form (` ```json `) and the bare form
/// (` ``` `).  Text without a leading fence is returned trimmed but
/// otherwise untouched.  A missing closing fence is tolerated.
///
/// ```
/// use sahayak::gateway::unwrap_code_fence;
///
/// assert_eq!(unwrap_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(unwrap_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(unwrap_code_fence("  {\"a\":1}  "), "{\"a\":1}");
/// ```
pub fn unwrap_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    // The tagged form must be tried first so "json" is not left in the body.
    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}

// ---------------------------------------------------------------------------
// parse_structured
// ---------------------------------------------------------------------------

/// Unwrap a possible code fence, then decode the whole record.
///
/// A missing or mistyped **required** field fails the entire decode; there
/// are no partial records.  Optional fields are the record types' own
/// business (`Option` / `#[serde(default)]`).
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let body = unwrap_code_fence(text);

    serde_json::from_str(body).map_err(|source| ParseError {
        source,
        raw: text.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
