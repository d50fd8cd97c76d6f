//! Ware callbacks.
//!
//! A callback is one named unit of ware behavior in one of four shapes:
//!
//! | Shape        | Type                    | Operations                       |
//! |--------------|-------------------------|----------------------------------|
//! | `Plain`      | [`PlainCallback`]       | `invoke`                         |
//! | `Step`       | [`StepCallback`]        | `begin`, `step`, `resume`, `reset` |
//! | `AsyncPlain` | [`AsyncPlainCallback`]  | `invoke` (async)                 |
//! | `AsyncStep`  | [`AsyncStepCallback`]   | `begin`, `step`, `reset` (async) |
//!
//! [`WareCallback`] is the closed union over the four; callers match on it
//! instead of inspecting types at runtime.

pub mod async_step;
pub mod plain;
pub mod step;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use async_step::{AsyncStepCallback, AsyncStepProcess};
pub use plain::{AsyncPlainCallback, PlainCallback};
pub use step::{SequenceState, Step, StepCallback, StepProcess};

use crate::signals::SignalRegistry;

/// Free-form callback metadata.
pub type CallbackMetadata = HashMap<String, Value>;

/// The execution model of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackShape {
    Plain,
    Step,
    AsyncPlain,
    AsyncStep,
}

impl CallbackShape {
    pub fn is_async(&self) -> bool {
        matches!(self, Self::AsyncPlain | Self::AsyncStep)
    }

    /// Whether callbacks of this shape keep sequence state.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Step | Self::AsyncStep)
    }
}

impl fmt::Display for CallbackShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Step => write!(f, "step-sequence"),
            Self::AsyncPlain => write!(f, "async plain"),
            Self::AsyncStep => write!(f, "async step-sequence"),
        }
    }
}

/// A callback in any of the four shapes.
#[derive(Debug)]
pub enum WareCallback {
    Plain(PlainCallback),
    Step(StepCallback),
    AsyncPlain(AsyncPlainCallback),
    AsyncStep(AsyncStepCallback),
}

impl WareCallback {
    pub fn shape(&self) -> CallbackShape {
        match self {
            Self::Plain(_) => CallbackShape::Plain,
            Self::Step(_) => CallbackShape::Step,
            Self::AsyncPlain(_) => CallbackShape::AsyncPlain,
            Self::AsyncStep(_) => CallbackShape::AsyncStep,
        }
    }

    pub fn metadata(&self) -> &CallbackMetadata {
        match self {
            Self::Plain(cb) => cb.metadata(),
            Self::Step(cb) => cb.metadata(),
            Self::AsyncPlain(cb) => cb.metadata(),
            Self::AsyncStep(cb) => cb.metadata(),
        }
    }

    /// Sequence state; `None` for single-shot shapes.
    pub fn sequence_state(&self) -> Option<SequenceState> {
        match self {
            Self::Step(cb) => Some(cb.state()),
            Self::AsyncStep(cb) => Some(cb.state()),
            Self::Plain(_) | Self::AsyncPlain(_) => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.sequence_state() == Some(SequenceState::Active)
    }

    /// Point sequence callbacks at a signal registry.
    pub fn set_signals(&mut self, signals: Arc<SignalRegistry>) {
        match self {
            Self::Step(cb) => cb.set_signals(signals),
            Self::AsyncStep(cb) => cb.set_signals(signals),
            Self::Plain(_) | Self::AsyncPlain(_) => {}
        }
    }
}

impl From<PlainCallback> for WareCallback {
    fn from(cb: PlainCallback) -> Self {
        Self::Plain(cb)
    }
}

impl From<StepCallback> for WareCallback {
    fn from(cb: StepCallback) -> Self {
        Self::Step(cb)
    }
}

impl From<AsyncPlainCallback> for WareCallback {
    fn from(cb: AsyncPlainCallback) -> Self {
        Self::AsyncPlain(cb)
    }
}

impl From<AsyncStepCallback> for WareCallback {
    fn from(cb: AsyncStepCallback) -> Self {
        Self::AsyncStep(cb)
    }
}
