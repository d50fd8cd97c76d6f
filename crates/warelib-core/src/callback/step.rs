//! Resumable step sequences.
//!
//! A [`StepCallback`] owns a factory for [`StepProcess`]es and at most one
//! live process at a time. Its lifecycle:
//!
//! ```text
//!   NotStarted ──begin──▶ Active ──step (Complete / failure)──▶ Ended
//!       ▲                   │
//!       └──────reset────────┘
//! ```
//!
//! `Ended` is terminal: reset leaves it alone and begin refuses it.
//!
//! `begin` creates the process and advances it once with `Value::Null`;
//! `step` sends a value and returns the next yielded one. When the process
//! completes, `step` fails with a `WareCallbackEnded` signal carrying the
//! final value. [`StepCallback::resume`] reports the same outcome as a
//! tagged [`Step`] instead.

use std::fmt;
use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::CallbackMetadata;
use crate::error::{Result, WareError};
use crate::signals::{Signal, SignalKind, SignalRegistry};

/// Outcome of advancing a step process once.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The process produced a value and can be resumed again.
    Yielded(Value),
    /// The process finished with a final value.
    Complete(Value),
}

/// Observable state of a step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    #[default]
    NotStarted,
    Active,
    Ended,
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::Active => write!(f, "Active"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

/// A synchronous resumable process.
pub trait StepProcess: Send {
    /// Send `input` in and run until the next yield or completion.
    fn resume(&mut self, input: Value) -> Result<Step>;

    /// Unwind after `signal` is injected.
    ///
    /// May return a final value. Failing with `signal` itself counts as a
    /// clean unwind.
    fn terminate(&mut self, signal: &Signal) -> Result<Option<Value>> {
        let _ = signal;
        Ok(None)
    }
}

impl<F> StepProcess for F
where
    F: FnMut(Value) -> Result<Step> + Send,
{
    fn resume(&mut self, input: Value) -> Result<Step> {
        self(input)
    }
}

/// Holder of the live process, if any.
pub(crate) enum Slot<P> {
    NotStarted,
    Active(P),
    Ended,
}

impl<P> Slot<P> {
    pub(crate) fn state(&self) -> SequenceState {
        match self {
            Slot::NotStarted => SequenceState::NotStarted,
            Slot::Active(_) => SequenceState::Active,
            Slot::Ended => SequenceState::Ended,
        }
    }
}

type StepFactory = dyn Fn(&Value) -> Box<dyn StepProcess> + Send + Sync;

/// Callback whose invocations are resumable step sequences.
pub struct StepCallback {
    factory: Arc<StepFactory>,
    slot: Slot<Box<dyn StepProcess>>,
    signals: Arc<SignalRegistry>,
    metadata: CallbackMetadata,
}

impl StepCallback {
    /// Create a callback from a process factory; `args` come from `begin`.
    pub fn new<F, P>(factory: F) -> Self
    where
        F: Fn(&Value) -> P + Send + Sync + 'static,
        P: StepProcess + 'static,
    {
        Self {
            factory: Arc::new(move |args| Box::new(factory(args)) as Box<dyn StepProcess>),
            slot: Slot::NotStarted,
            signals: SignalRegistry::global(),
            metadata: CallbackMetadata::new(),
        }
    }

    pub fn with_signals(mut self, signals: Arc<SignalRegistry>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub(crate) fn set_signals(&mut self, signals: Arc<SignalRegistry>) {
        self.signals = signals;
    }

    pub fn signals(&self) -> &Arc<SignalRegistry> {
        &self.signals
    }

    pub fn metadata(&self) -> &CallbackMetadata {
        &self.metadata
    }

    pub fn state(&self) -> SequenceState {
        self.slot.state()
    }

    /// Began and not yet ended.
    pub fn is_active(&self) -> bool {
        self.state() == SequenceState::Active
    }

    pub fn has_ended(&self) -> bool {
        self.state() == SequenceState::Ended
    }

    /// Create a new process and advance it once with `Value::Null`.
    ///
    /// Fails with `WareCallbackBegun` unless the sequence is `NotStarted`;
    /// a failed call leaves the existing state untouched.
    pub fn begin(&mut self, args: &Value) -> Result<Value> {
        if !matches!(self.slot, Slot::NotStarted) {
            return Err(self.signals.error(
                SignalKind::WareCallbackBegun,
                "step callback has already begun a sequence",
            ));
        }

        self.slot = Slot::Active((self.factory)(args));
        trace!("step sequence begun");
        self.step(Value::Null)
    }

    /// Advance the process, reporting completion as [`Step::Complete`].
    ///
    /// A process that completes or fails is released and the sequence is
    /// `Ended`. Resuming an `Ended` sequence reports `Complete(Null)`.
    pub fn resume(&mut self, input: Value) -> Result<Step> {
        match mem::replace(&mut self.slot, Slot::Ended) {
            Slot::NotStarted => {
                self.slot = Slot::NotStarted;
                Err(self.signals.error(
                    SignalKind::WareCallbackNotBegun,
                    "step callback has not begun a sequence",
                ))
            }
            Slot::Ended => Ok(Step::Complete(Value::Null)),
            Slot::Active(mut process) => {
                let step = process.resume(input)?;
                match step {
                    Step::Yielded(_) => self.slot = Slot::Active(process),
                    Step::Complete(_) => trace!("step sequence completed"),
                }
                Ok(step)
            }
        }
    }

    /// Advance the process and return the value it yields.
    ///
    /// Completion surfaces as a `WareCallbackEnded` signal carrying the
    /// final value; on an already `Ended` sequence the signal carries none.
    pub fn step(&mut self, input: Value) -> Result<Value> {
        let was_ended = self.has_ended();
        match self.resume(input)? {
            Step::Yielded(value) => Ok(value),
            Step::Complete(value) => {
                let signal = self
                    .signals
                    .signal(SignalKind::WareCallbackEnded, "step sequence ended");
                if was_ended {
                    Err(signal.into())
                } else {
                    Err(signal.with_payload(value).into())
                }
            }
        }
    }

    /// Inject `signal` into the active process and release it.
    ///
    /// Returns the value the process produced while unwinding. On a
    /// `NotStarted` or `Ended` sequence this is a no-op.
    pub fn terminate(&mut self, signal: &Signal) -> Result<Option<Value>> {
        match mem::replace(&mut self.slot, Slot::NotStarted) {
            Slot::NotStarted => Ok(None),
            Slot::Ended => {
                self.slot = Slot::Ended;
                Ok(None)
            }
            Slot::Active(mut process) => {
                trace!(signal = %signal.name(), "terminating step sequence");
                match process.terminate(signal) {
                    Ok(value) => Ok(value),
                    Err(WareError::Signal(raised)) if raised.kind() == signal.kind() => Ok(None),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Terminate with a `WareCallbackMustEnd` signal.
    pub fn reset(&mut self) -> Result<Option<Value>> {
        let signal = self
            .signals
            .signal(SignalKind::WareCallbackMustEnd, "step callback reset");
        self.terminate(&signal)
    }
}

impl fmt::Debug for StepCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCallback")
            .field("state", &self.state())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(from: i64) -> StepCallback {
        StepCallback::new(move |_args| {
            let mut left = from;
            move |_input: Value| -> Result<Step> {
                if left == 0 {
                    return Ok(Step::Complete(Value::from("liftoff")));
                }
                left -= 1;
                Ok(Step::Yielded(Value::from(left + 1)))
            }
        })
    }

    #[test]
    fn test_begin_yields_first_value() {
        let mut cb = countdown(2);
        assert_eq!(cb.state(), SequenceState::NotStarted);
        assert_eq!(cb.begin(&Value::Null).unwrap(), Value::from(2));
        assert!(cb.is_active());
    }

    #[test]
    fn test_resume_reports_completion_as_tag() {
        let mut cb = countdown(1);
        cb.begin(&Value::Null).unwrap();
        assert_eq!(
            cb.resume(Value::Null).unwrap(),
            Step::Complete(Value::from("liftoff"))
        );
        assert!(cb.has_ended());
        assert_eq!(cb.resume(Value::Null).unwrap(), Step::Complete(Value::Null));
    }

    #[test]
    fn test_step_before_begin() {
        let mut cb = countdown(1);
        let err = cb.step(Value::Null).unwrap_err();
        assert!(err.is_signal(SignalKind::WareCallbackNotBegun));
        assert_eq!(cb.state(), SequenceState::NotStarted);
    }

    #[test]
    fn test_reset_on_ended_is_noop() {
        let mut cb = countdown(0);
        let err = cb.begin(&Value::Null).unwrap_err();
        assert_eq!(err.completion_payload(), Some(&Value::from("liftoff")));
        assert!(cb.has_ended());

        assert_eq!(cb.reset().unwrap(), None);
        assert_eq!(cb.state(), SequenceState::Ended);
        assert!(cb
            .begin(&Value::Null)
            .unwrap_err()
            .is_signal(SignalKind::WareCallbackBegun));
    }
}
