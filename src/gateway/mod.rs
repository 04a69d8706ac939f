//! Multimodal completion gateway.
//!
//! This module provides:
//! * [`Gateway`] — async trait implemented by all completion backends.
//! * [`HttpGateway`] — production client for a Gemini-style
//!   `generateContent` endpoint.
//! * [`PromptRequest`] — one request: prompt + optional attachment.
//! * [`Attachment`] / [`MediaKind`] — image/audio payloads with media-type
//!   resolution.
//! * [`unwrap_code_fence`] / [`parse_structured`] — fence-tolerant decoding
//!   of structured JSON results.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use sahayak::config::GatewayConfig;
//! use sahayak::gateway::{Attachment, Gateway, HttpGateway, PromptRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = HttpGateway::from_config(&GatewayConfig::default());
//!
//!     let att = Attachment::load("wound.jpg", None).await.unwrap();
//!     let text = gateway
//!         .complete(PromptRequest::new("Describe the injury.").with_attachment(&att))
//!         .await
//!         .unwrap();
//!     println!("{text}");
//! }
//! ```

pub mod attachment;
pub mod client;
pub mod parse;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use attachment::{Attachment, AttachmentError, MediaKind};
pub use client::{Gateway, GatewayError, HttpGateway, PromptRequest};
pub use parse::{parse_structured, unwrap_code_fence, ParseError};

// test-only re-export so orchestrator test modules can import MockGateway
// without `use sahayak::gateway::client::MockGateway`.
#[cfg(test)]
pub use client::{MockGateway, RecordedCall};
