//! Resumable step sequences whose steps may suspend.

use std::fmt;
use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use super::step::{SequenceState, Slot};
use super::CallbackMetadata;
use crate::error::Result;
use crate::signals::{SignalKind, SignalRegistry};

/// An asynchronous resumable process.
#[async_trait]
pub trait AsyncStepProcess: Send {
    /// Send `input` in and await the next yielded value.
    ///
    /// `None` means the process is exhausted.
    async fn resume(&mut self, input: Value) -> Result<Option<Value>>;

    /// Release held resources. Errors raised here are discarded.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

type AsyncStepFactory = dyn Fn(&Value) -> Box<dyn AsyncStepProcess> + Send + Sync;

/// Callback whose invocations are asynchronous step sequences.
pub struct AsyncStepCallback {
    factory: Arc<AsyncStepFactory>,
    slot: Slot<Box<dyn AsyncStepProcess>>,
    signals: Arc<SignalRegistry>,
    metadata: CallbackMetadata,
}

impl AsyncStepCallback {
    pub fn new<F, P>(factory: F) -> Self
    where
        F: Fn(&Value) -> P + Send + Sync + 'static,
        P: AsyncStepProcess + 'static,
    {
        Self {
            factory: Arc::new(move |args| Box::new(factory(args)) as Box<dyn AsyncStepProcess>),
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

    pub fn is_active(&self) -> bool {
        self.state() == SequenceState::Active
    }

    pub fn has_ended(&self) -> bool {
        self.state() == SequenceState::Ended
    }

    /// Create a new process and await its first advance.
    ///
    /// The first yielded value is discarded.
    pub async fn begin(&mut self, args: &Value) -> Result<()> {
        if !matches!(self.slot, Slot::NotStarted) {
            return Err(self.signals.error(
                SignalKind::WareCallbackBegun,
                "async step callback has already begun a sequence",
            ));
        }

        self.slot = Slot::Active((self.factory)(args));
        trace!("async step sequence begun");
        self.step(Value::Null).await.map(|_| ())
    }

    /// Advance the process and return the value it yields.
    ///
    /// Exhaustion surfaces as an `AsyncWareCallbackEnded` signal.
    pub async fn step(&mut self, input: Value) -> Result<Value> {
        match mem::replace(&mut self.slot, Slot::Ended) {
            Slot::NotStarted => {
                self.slot = Slot::NotStarted;
                Err(self.signals.error(
                    SignalKind::WareCallbackNotBegun,
                    "async step callback has not begun a sequence",
                ))
            }
            Slot::Ended => Err(self.ended()),
            Slot::Active(mut process) => match process.resume(input).await? {
                Some(value) => {
                    self.slot = Slot::Active(process);
                    Ok(value)
                }
                None => {
                    trace!("async step sequence exhausted");
                    Err(self.ended())
                }
            },
        }
    }

    /// Close the active process cooperatively and release it.
    ///
    /// Never fails: errors raised while closing are discarded. A
    /// `NotStarted` or `Ended` sequence is left as it is.
    pub async fn reset(&mut self) {
        if let Some(mut process) = self.take_active() {
            if let Err(e) = process.close().await {
                debug!(error = %e, "Discarded error while closing async step sequence");
            }
        }
    }

    /// Release the process without awaiting its closure.
    ///
    /// Returns whether an active process was dropped.
    pub fn abandon(&mut self) -> bool {
        self.take_active().is_some()
    }

    fn take_active(&mut self) -> Option<Box<dyn AsyncStepProcess>> {
        if !self.is_active() {
            return None;
        }
        match mem::replace(&mut self.slot, Slot::NotStarted) {
            Slot::Active(process) => Some(process),
            _ => None,
        }
    }

    fn ended(&self) -> crate::error::WareError {
        self.signals.error(
            SignalKind::AsyncWareCallbackEnded,
            "async step sequence ended",
        )
    }
}

impl fmt::Debug for AsyncStepCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncStepCallback")
            .field("state", &self.state())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
