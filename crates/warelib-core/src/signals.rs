//! Lifecycle signals and the registry that names them.
//!
//! Signals are the conditions used to drive and observe callback state
//! machines: termination requests injected into running sequences,
//! completion notifications, lifecycle misuse and structural load failures.
//!
//! Every signal has a logical [`SignalKind`]. The concrete name a signal is
//! raised under comes from a [`SignalRegistry`], so a deployment can brand
//! them (e.g. `MicrogameEnded` instead of `WareCallbackEnded`) without
//! changing how they are compared: comparisons always go through the kind.
//!
//! # Usage
//!
//! ```rust,ignore
//! use warelib_core::signals::{SignalKind, SignalRegistry};
//!
//! let registry = SignalRegistry::new()
//!     .with_name(SignalKind::WareCallbackEnded, "MicrogameEnded");
//!
//! let signal = registry.signal(SignalKind::WareCallbackEnded, "tick finished");
//! assert_eq!(signal.name(), "MicrogameEnded");
//! assert!(signal.is(SignalKind::WareCallbackEnded));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WareError};

static GLOBAL_REGISTRY: OnceCell<Arc<SignalRegistry>> = OnceCell::new();

// ============================================================================
// Signal kinds
// ============================================================================

/// Logical name of a lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// A whole ware is requested to end.
    WareMustEnd,
    /// A single callback sequence is requested to end.
    WareCallbackMustEnd,
    /// A step sequence finished; carries its final value.
    WareCallbackEnded,
    /// An async step sequence finished.
    AsyncWareCallbackEnded,
    /// `begin` was called on a sequence that already began.
    WareCallbackBegun,
    /// A sequence was stepped before it began.
    WareCallbackNotBegun,
    /// A loaded unit does not match the expected schema.
    InvalidWareStructure,
}

/// Broad grouping of signal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalCategory {
    Termination,
    Completion,
    Misuse,
    Structural,
}

impl SignalKind {
    /// All kinds, in declaration order.
    pub const ALL: [SignalKind; 7] = [
        SignalKind::WareMustEnd,
        SignalKind::WareCallbackMustEnd,
        SignalKind::WareCallbackEnded,
        SignalKind::AsyncWareCallbackEnded,
        SignalKind::WareCallbackBegun,
        SignalKind::WareCallbackNotBegun,
        SignalKind::InvalidWareStructure,
    ];

    /// Built-in name used when a registry has no override.
    pub fn default_name(&self) -> &'static str {
        match self {
            SignalKind::WareMustEnd => "WareMustEnd",
            SignalKind::WareCallbackMustEnd => "WareCallbackMustEnd",
            SignalKind::WareCallbackEnded => "WareCallbackEnded",
            SignalKind::AsyncWareCallbackEnded => "AsyncWareCallbackEnded",
            SignalKind::WareCallbackBegun => "WareCallbackBegun",
            SignalKind::WareCallbackNotBegun => "WareCallbackNotBegun",
            SignalKind::InvalidWareStructure => "InvalidWareStructure",
        }
    }

    pub fn category(&self) -> SignalCategory {
        match self {
            SignalKind::WareMustEnd | SignalKind::WareCallbackMustEnd => {
                SignalCategory::Termination
            }
            SignalKind::WareCallbackEnded | SignalKind::AsyncWareCallbackEnded => {
                SignalCategory::Completion
            }
            SignalKind::WareCallbackBegun | SignalKind::WareCallbackNotBegun => {
                SignalCategory::Misuse
            }
            SignalKind::InvalidWareStructure => SignalCategory::Structural,
        }
    }

    /// Whether this kind may be injected into a running sequence.
    pub fn is_termination(&self) -> bool {
        self.category() == SignalCategory::Termination
    }

    /// Whether this kind reports normal sequence completion.
    pub fn is_completion(&self) -> bool {
        self.category() == SignalCategory::Completion
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

// ============================================================================
// Signal
// ============================================================================

/// A raised lifecycle signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    kind: SignalKind,
    name: Arc<str>,
    message: String,
    payload: Option<Value>,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Name the signal was raised under (possibly branded).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Final value carried by a completion signal.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }

    pub fn is(&self, kind: SignalKind) -> bool {
        self.kind == kind
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl From<Signal> for WareError {
    fn from(signal: Signal) -> Self {
        WareError::Signal(signal)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Table of branded signal names.
///
/// Kinds without an entry are raised under [`SignalKind::default_name`].
/// Serializes as a map of logical name to branded name, e.g.
/// `{"WareCallbackEnded": "MicrogameEnded"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalRegistry {
    names: HashMap<SignalKind, String>,
}

impl SignalRegistry {
    /// Registry that raises every signal under its built-in name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the name a kind is raised under.
    pub fn with_name(mut self, kind: SignalKind, name: impl Into<String>) -> Self {
        self.names.insert(kind, name.into());
        self
    }

    /// Name a kind is currently raised under.
    pub fn name(&self, kind: SignalKind) -> &str {
        self.names
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_name())
    }

    /// Whether the kind has a branded name.
    pub fn is_overridden(&self, kind: SignalKind) -> bool {
        self.names.contains_key(&kind)
    }

    /// Build a signal of the given kind.
    pub fn signal(&self, kind: SignalKind, message: impl Into<String>) -> Signal {
        Signal {
            kind,
            name: Arc::from(self.name(kind)),
            message: message.into(),
            payload: None,
        }
    }

    /// Build a signal wrapped as an error.
    pub fn error(&self, kind: SignalKind, message: impl Into<String>) -> WareError {
        WareError::Signal(self.signal(kind, message))
    }

    /// Install a process-wide default registry.
    ///
    /// Can succeed only once, and only before [`SignalRegistry::global`] has
    /// been read.
    pub fn install(self) -> Result<()> {
        GLOBAL_REGISTRY.set(Arc::new(self)).map_err(|_| {
            WareError::AlreadyInitialized("process-wide signal registry".to_string())
        })
    }

    /// The process-wide default registry (built-in names unless installed).
    pub fn global() -> Arc<SignalRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(SignalRegistry::default()))
            .clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
