//! Error types for ware loading and orchestration.

use serde_json::Value;

use crate::callback::CallbackShape;
use crate::signals::{Signal, SignalKind};

/// Errors raised by callbacks, wares, the loader and the manager.
#[derive(Debug, thiserror::Error)]
pub enum WareError {
    /// A lifecycle signal (termination, completion, misuse or structural).
    #[error("{0}")]
    Signal(Signal),

    #[error("Shape mismatch: ware '{ware}' callback '{callback}' is a {found} callback, expected {expected}")]
    ShapeMismatch {
        ware: String,
        callback: String,
        expected: CallbackShape,
        found: CallbackShape,
    },

    #[error("Callback not found: ware '{ware}' has no callback '{callback}'")]
    CallbackNotFound { ware: String, callback: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Resetter failed for ware '{ware}': {reason}")]
    ResetterFailed { ware: String, reason: String },

    #[error("Panicked: {0}")]
    Panicked(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Result type for ware operations.
pub type Result<T> = std::result::Result<T, WareError>;

impl WareError {
    /// Failure raised by callback code.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        WareError::ExecutionFailed(reason.to_string())
    }

    /// The lifecycle signal, if this error is one.
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            WareError::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn is_signal(&self, kind: SignalKind) -> bool {
        self.signal().is_some_and(|s| s.is(kind))
    }

    /// Whether this error only reports that a sequence finished.
    pub fn is_completion(&self) -> bool {
        self.signal().is_some_and(|s| s.kind().is_completion())
    }

    /// Final value carried by a completion signal.
    pub fn completion_payload(&self) -> Option<&Value> {
        self.signal()
            .filter(|s| s.kind().is_completion())
            .and_then(Signal::payload)
    }

    /// Convert a caught panic payload into an error.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let reason = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        WareError::Panicked(reason)
    }
}
