//! Step processes with scripted behavior.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use warelib_core::{AsyncStepProcess, Result, Signal, Step, StepProcess, WareError};

use crate::resetter::EventLog;

/// Shared record of every value sent into a process.
#[derive(Debug, Clone, Default)]
pub struct InputProbe {
    inputs: Arc<Mutex<Vec<Value>>>,
}

impl InputProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, value: Value) {
        self.inputs.lock().push(value);
    }

    pub fn inputs(&self) -> Vec<Value> {
        self.inputs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inputs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.lock().is_empty()
    }
}

/// What a scripted process does when a termination signal is injected.
#[derive(Debug, Clone, Default)]
pub enum TerminateBehavior {
    /// Let the signal propagate.
    #[default]
    Propagate,
    /// Catch the signal and return a final value.
    Return(Value),
    /// Fail with an unrelated error.
    Fail(String),
}

/// Yields a fixed list of values, then completes or fails.
#[derive(Debug, Clone)]
pub struct ScriptedSequence {
    yields: VecDeque<Value>,
    outcome: std::result::Result<Value, String>,
    on_terminate: TerminateBehavior,
    probe: InputProbe,
    log: Option<(EventLog, String)>,
}

impl ScriptedSequence {
    pub fn new(yields: impl IntoIterator<Item = Value>, final_value: Value) -> Self {
        Self {
            yields: yields.into_iter().collect(),
            outcome: Ok(final_value),
            on_terminate: TerminateBehavior::default(),
            probe: InputProbe::new(),
            log: None,
        }
    }

    /// Fail with `reason` instead of completing.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.outcome = Err(reason.into());
        self
    }

    pub fn on_terminate(mut self, behavior: TerminateBehavior) -> Self {
        self.on_terminate = behavior;
        self
    }

    /// Record sent values into `probe`.
    pub fn with_probe(mut self, probe: InputProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Log `terminate:<label>:<signal name>` whenever a signal is injected.
    pub fn with_event_log(mut self, log: EventLog, label: impl Into<String>) -> Self {
        self.log = Some((log, label.into()));
        self
    }
}

impl StepProcess for ScriptedSequence {
    fn resume(&mut self, input: Value) -> Result<Step> {
        self.probe.record(input);
        match self.yields.pop_front() {
            Some(value) => Ok(Step::Yielded(value)),
            None => match &self.outcome {
                Ok(value) => Ok(Step::Complete(value.clone())),
                Err(reason) => Err(WareError::failed(reason)),
            },
        }
    }

    fn terminate(&mut self, signal: &Signal) -> Result<Option<Value>> {
        if let Some((log, label)) = &self.log {
            log.record(format!("terminate:{}:{}", label, signal.name()));
        }
        match &self.on_terminate {
            TerminateBehavior::Propagate => Err(signal.clone().into()),
            TerminateBehavior::Return(value) => Ok(Some(value.clone())),
            TerminateBehavior::Fail(reason) => Err(WareError::failed(reason)),
        }
    }
}

/// Yields 1, 2, 3, ... forever.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    next: u64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepProcess for Counter {
    fn resume(&mut self, _input: Value) -> Result<Step> {
        self.next += 1;
        Ok(Step::Yielded(Value::from(self.next)))
    }
}

/// Async process yielding a fixed list, suspending before every step.
#[derive(Debug, Clone)]
pub struct AsyncScripted {
    yields: VecDeque<Value>,
    probe: InputProbe,
    closed: InputProbe,
    close_error: Option<String>,
    resume_error: Option<String>,
}

impl AsyncScripted {
    pub fn new(yields: impl IntoIterator<Item = Value>) -> Self {
        Self {
            yields: yields.into_iter().collect(),
            probe: InputProbe::new(),
            closed: InputProbe::new(),
            close_error: None,
            resume_error: None,
        }
    }

    pub fn with_probe(mut self, probe: InputProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Record a `true` into `probe` each time the process is closed.
    pub fn with_close_probe(mut self, probe: InputProbe) -> Self {
        self.closed = probe;
        self
    }

    /// Fail with `reason` instead of running dry.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.resume_error = Some(reason.into());
        self
    }

    /// Fail with `reason` while closing.
    pub fn failing_close(mut self, reason: impl Into<String>) -> Self {
        self.close_error = Some(reason.into());
        self
    }
}

#[async_trait]
impl AsyncStepProcess for AsyncScripted {
    async fn resume(&mut self, input: Value) -> Result<Option<Value>> {
        tokio::task::yield_now().await;
        self.probe.record(input);
        match (self.yields.pop_front(), &self.resume_error) {
            (Some(value), _) => Ok(Some(value)),
            (None, Some(reason)) => Err(WareError::failed(reason)),
            (None, None) => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        tokio::task::yield_now().await;
        self.closed.record(Value::Bool(true));
        match &self.close_error {
            Some(reason) => Err(WareError::failed(reason)),
            None => Ok(()),
        }
    }
}

/// Async process yielding 1, 2, 3, ... forever.
#[derive(Debug, Clone, Default)]
pub struct AsyncCounter {
    next: u64,
}

impl AsyncCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AsyncStepProcess for AsyncCounter {
    async fn resume(&mut self, _input: Value) -> Result<Option<Value>> {
        tokio::task::yield_now().await;
        self.next += 1;
        Ok(Some(Value::from(self.next)))
    }
}
