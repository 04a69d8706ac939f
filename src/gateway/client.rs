//! Core `Gateway` trait and `HttpGateway` implementation.
//!
//! `HttpGateway` calls a Gemini-style `generateContent` endpoint: one prompt
//! plus an optional inline image/audio attachment in, the first candidate's
//! text out.  All connection details come from [`GatewayConfig`]; nothing is
//! hardcoded.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::gateway::attachment::Attachment;

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Errors that can occur while requesting a completion.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The prompt text was empty; nothing was sent.
    #[error("prompt text is empty")]
    EmptyPrompt,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("completion request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("completion service error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The HTTP response could not be decoded as the expected JSON shape.
    #[error("failed to decode completion response: {0}")]
    Decode(String),

    /// The response carried no candidates or no usable text.
    #[error("completion returned no usable text")]
    NoCandidates,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// PromptRequest
// ---------------------------------------------------------------------------

/// One completion request: instruction text, optional attachment, optional
/// per-request model override.
///
/// Built fresh for every pipeline stage and never mutated afterwards.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    /// Instruction text sent as the first part.
    pub prompt: &'a str,
    /// Binary payload inlined as a second part, when present.
    pub attachment: Option<&'a Attachment>,
    /// Model id override; `None` uses the configured default.
    pub model: Option<&'a str>,
}

impl<'a> PromptRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            attachment: None,
            model: None,
        }
    }

    pub fn with_attachment(mut self, attachment: &'a Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_model(mut self, model: &'a str) -> Self {
        self.model = Some(model);
        self
    }
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Async interface to the multimodal completion service.
///
/// Implementors must be `Send + Sync` so the three module orchestrators can
/// share one instance behind an `Arc<dyn Gateway>`.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn complete(&self, request: PromptRequest<'_>) -> Result<String, GatewayError>;
}

// Compile-time assertion: Box<dyn Gateway> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Gateway>) {}
};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Build the `generateContent` request body: the prompt text as the first
/// part, the attachment (when present) base64-inlined as the second.
fn build_request_body(request: &PromptRequest<'_>) -> serde_json::Value {
    let mut parts = vec![serde_json::json!({ "text": request.prompt })];

    if let Some(att) = request.attachment {
        parts.push(serde_json::json!({
            "inline_data": {
                "mime_type": att.media_type,
                "data": STANDARD.encode(&att.bytes),
            }
        }));
    }

    serde_json::json!({ "contents": [{ "parts": parts }] })
}

/// Concatenated text of the first candidate's parts.
fn first_candidate_text(response: GenerateResponse) -> Result<String, GatewayError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GatewayError::NoCandidates)?;

    let text: String = candidate.content.parts.into_iter().map(|p| p.text).collect();

    if text.trim().is_empty() {
        return Err(GatewayError::NoCandidates);
    }
    Ok(text)
}

/// Map a non-success response to [`GatewayError::Upstream`], preferring the
/// service's own `{"error":{"message":…}}` body over the status reason.
fn upstream_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    GatewayError::Upstream {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// HttpGateway
// ---------------------------------------------------------------------------

/// Production [`Gateway`] over HTTP.
///
/// POSTs to `{base_url}/models/{model}:generateContent`.  The `key` query
/// parameter is attached **only** when `config.api_key` is a non-empty
/// string, so a proxy that injects credentials itself keeps working.
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Build an `HttpGateway` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Endpoint URL for one request; a per-request model override falls back
    /// to the configured model.
    fn endpoint(&self, request: &PromptRequest<'_>) -> String {
        let model = request.model.unwrap_or(&self.config.model);
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn complete(&self, request: PromptRequest<'_>) -> Result<String, GatewayError> {
        if request.prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }

        let url = self.endpoint(&request);
        let body = build_request_body(&request);

        log::debug!(
            "gateway: POST {url} (attachment: {})",
            request
                .attachment
                .map(|a| a.media_type.as_str())
                .unwrap_or("none")
        );

        let mut req = self.client.post(&url).json(&body);

        // Attach the key query parameter only when api_key is non-empty.
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.query(&[("key", key)]);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status, &body));
        }

        let decoded: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        first_candidate_text(decoded)
    }
}

// ---------------------------------------------------------------------------
// MockGateway  (test-only)
// ---------------------------------------------------------------------------

/// A scripted test double: pops one queued response per `complete` call and
/// records what each call asked for.  An exhausted script answers with a
/// `Request` error naming the mock, so an over-calling pipeline fails loudly.
#[cfg(test)]
pub struct MockGateway {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, GatewayError>>>,
    calls: std::sync::Mutex<Vec<RecordedCall>>,
}

/// What one `complete` call carried, as seen by [`MockGateway`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub media_type: Option<String>,
}

#[cfg(test)]
impl MockGateway {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose first call returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.push_ok(text);
        mock
    }

    /// Create a mock whose first call returns `Err(error)`.
    pub fn err(error: GatewayError) -> Self {
        let mock = Self::new();
        mock.push_err(error);
        mock
    }

    /// Queue another `Ok` response.
    pub fn push_ok(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(text.into()));
    }

    /// Queue another `Err` response.
    pub fn push_err(&self, error: GatewayError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Gateway for MockGateway {
    async fn complete(&self, request: PromptRequest<'_>) -> Result<String, GatewayError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: request.prompt.to_string(),
            media_type: request.attachment.map(|a| a.media_type.clone()),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Request("mock: no scripted response".into())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::attachment::Attachment;

    fn make_config(api_key: Option<&str>) -> GatewayConfig {
        GatewayConfig {
            base_url: "http://localhost:9".into(),
            api_key: api_key.map(|s| s.to_string()),
            model: "gemini-2.5-flash".into(),
            timeout_secs: 5,
        }
    }

    // --- HttpGateway construction ---

    #[test]
    fn from_config_builds_without_panic() {
        let _gateway = HttpGateway::from_config(&make_config(None));
    }

    #[test]
    fn from_config_accepts_empty_api_key() {
        let _gateway = HttpGateway::from_config(&make_config(Some("")));
    }

    #[test]
    fn from_config_accepts_real_api_key() {
        let _gateway = HttpGateway::from_config(&make_config(Some("AIza-test-1234")));
    }

    /// Verify that `HttpGateway` is object-safe (usable as `dyn Gateway`).
    #[test]
    fn gateway_is_object_safe() {
        let gateway: Box<dyn Gateway> = Box::new(HttpGateway::from_config(&make_config(None)));
        drop(gateway);
    }

    /// An empty prompt must be rejected before any request is attempted.
    #[tokio::test]
    async fn empty_prompt_is_rejected_without_network() {
        let gateway = HttpGateway::from_config(&make_config(None));
        let err = gateway.complete(PromptRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, GatewayError::EmptyPrompt));
    }

    // --- Endpoint ---

    #[test]
    fn endpoint_uses_the_configured_model_by_default() {
        let gateway = HttpGateway::from_config(&make_config(None));
        assert_eq!(
            gateway.endpoint(&PromptRequest::new("assess")),
            "http://localhost:9/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn with_model_overrides_the_configured_model() {
        let gateway = HttpGateway::from_config(&make_config(None));
        let request = PromptRequest::new("assess").with_model("gemini-2.0-flash");
        assert_eq!(
            gateway.endpoint(&request),
            "http://localhost:9/models/gemini-2.0-flash:generateContent"
        );
    }

    // --- Request body ---

    #[test]
    fn text_only_body_has_single_part() {
        let body = build_request_body(&PromptRequest::new("describe this"));
        let parts = &body["contents"][0]["parts"];

        assert_eq!(parts.as_array().unwrap().len(), 1);
        assert_eq!(parts[0]["text"], "describe this");
    }

    #[test]
    fn attachment_is_inlined_as_base64_second_part() {
        let att = Attachment::from_bytes("wound.jpg", vec![0xDE, 0xAD], None).unwrap();
        let request = PromptRequest::new("assess").with_attachment(&att);
        let body = build_request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(
            parts[1]["inline_data"]["data"].as_str().unwrap(),
            STANDARD.encode([0xDE, 0xAD])
        );
    }

    // --- Response decoding ---

    #[test]
    fn first_candidate_parts_are_concatenated() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();

        assert_eq!(first_candidate_text(response).unwrap(), "Hello world");
    }

    #[test]
    fn later_candidates_are_ignored() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"first"}]}},
                {"content":{"parts":[{"text":"second"}]}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(first_candidate_text(response).unwrap(), "first");
    }

    #[test]
    fn empty_candidate_list_is_no_candidates() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            first_candidate_text(response).unwrap_err(),
            GatewayError::NoCandidates
        ));
    }

    #[test]
    fn blank_candidate_text_is_no_candidates() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  \n"}]}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            first_candidate_text(response).unwrap_err(),
            GatewayError::NoCandidates
        ));
    }

    // --- Upstream errors ---

    #[test]
    fn upstream_error_prefers_service_message() {
        let err = upstream_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":{"message":"quota exceeded"}}"#,
        );
        match err {
            GatewayError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected Upstream, got: {other:?}"),
        }
    }

    #[test]
    fn upstream_error_falls_back_to_status_reason() {
        let err = upstream_error(reqwest::StatusCode::NOT_FOUND, "<html>oops</html>");
        match err {
            GatewayError::Upstream { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected Upstream, got: {other:?}"),
        }
    }

    // --- MockGateway ---

    #[tokio::test]
    async fn mock_pops_responses_in_order() {
        let mock = MockGateway::ok("one");
        mock.push_ok("two");

        assert_eq!(mock.complete(PromptRequest::new("a")).await.unwrap(), "one");
        assert_eq!(mock.complete(PromptRequest::new("b")).await.unwrap(), "two");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_records_prompt_and_media_type() {
        let mock = MockGateway::ok("reply");
        let att = Attachment::from_bytes("x.png", vec![1], None).unwrap();

        mock.complete(PromptRequest::new("look").with_attachment(&att))
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].prompt, "look");
        assert_eq!(calls[0].media_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn mock_err_surfaces_configured_error() {
        let mock = MockGateway::err(GatewayError::Timeout);
        let err = mock.complete(PromptRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout));
    }
}
