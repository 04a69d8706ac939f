//! Per-module session state.
//!
//! Each clinical module owns exactly one [`ModuleSession`]: the currently
//! selected upload plus the last successful result.  The session is mutated
//! only by that module's orchestrator — selection and the pipeline replace
//! its contents, the explicit clear action empties it.  Nothing here is
//! shared across modules.

use crate::gateway::Attachment;

// ---------------------------------------------------------------------------
// ModuleSession
// ---------------------------------------------------------------------------

/// Selected upload and last successful result for one clinical module.
///
/// `R` is the module's result type (e.g. a triage report).  A new selection
/// replaces the attachment wholesale but keeps the previous result on screen
/// until the next run overwrites it; [`clear`](Self::clear) drops both.
#[derive(Debug)]
pub struct ModuleSession<R> {
    attachment: Option<Attachment>,
    result: Option<R>,
}

impl<R> ModuleSession<R> {
    /// Create an empty session: no file selected, no result stored.
    pub fn new() -> Self {
        Self {
            attachment: None,
            result: None,
        }
    }

    /// Replace the selected upload.
    ///
    /// The previous attachment (if any) is dropped.  The stored result is
    /// left untouched so the UI keeps showing it until the next run.
    pub fn select(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    /// Store the result of a successful pipeline run.
    pub fn store(&mut self, result: R) {
        self.result = Some(result);
    }

    /// Drop both the attachment and the result.
    ///
    /// Idempotent — clearing an already-empty session is a no-op.
    pub fn clear(&mut self) {
        self.attachment = None;
        self.result = None;
    }

    /// The currently selected upload, if any.
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// The last successful result, if any.
    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }
}

impl<R> Default for ModuleSession<R> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
