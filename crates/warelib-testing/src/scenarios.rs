//! Test scenario builder
//!
//! Assembles small collections of wares that share one [`EventLog`].

use serde_json::Value;
use warelib_core::{
    AsyncStepCallback, PlainCallback, StepCallback, Ware, WareBuilder, WareError,
};

use crate::resetter::EventLog;
use crate::sequences::{AsyncCounter, Counter, ScriptedSequence, TerminateBehavior};

/// One ware under construction, with a logging `reset` callback.
pub struct ScenarioWare {
    name: String,
    log: EventLog,
    builder: WareBuilder,
}

impl ScenarioWare {
    fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            builder: Ware::builder(name).global("title", Value::from(name)),
        }
    }

    /// `callback` yields `yields`, then completes with `final_value`.
    pub fn finite(self, callback: &str, yields: Vec<Value>, final_value: Value) -> Self {
        self.finite_with(callback, yields, final_value, TerminateBehavior::Propagate)
    }

    pub fn finite_with(
        mut self,
        callback: &str,
        yields: Vec<Value>,
        final_value: Value,
        on_terminate: TerminateBehavior,
    ) -> Self {
        let log = self.log.clone();
        let label = format!("{}.{}", self.name, callback);
        self.builder = self.builder.callback(
            callback,
            StepCallback::new(move |_| {
                ScriptedSequence::new(yields.clone(), final_value.clone())
                    .on_terminate(on_terminate.clone())
                    .with_event_log(log.clone(), label.clone())
            }),
        );
        self
    }

    /// `callback` counts up forever.
    pub fn endless(mut self, callback: &str) -> Self {
        self.builder = self
            .builder
            .callback(callback, StepCallback::new(|_| Counter::new()));
        self
    }

    /// `callback` counts up forever, asynchronously.
    pub fn endless_async(mut self, callback: &str) -> Self {
        self.builder = self
            .builder
            .callback(callback, AsyncStepCallback::new(|_| AsyncCounter::new()));
        self
    }

    /// Plain `callback` returning the ware's name.
    pub fn echo(mut self, callback: &str) -> Self {
        let name = self.name.clone();
        self.builder = self
            .builder
            .callback(callback, PlainCallback::new(move |_| Ok(Value::from(name.as_str()))));
        self
    }

    /// Plain `callback` that always fails.
    pub fn broken(mut self, callback: &str) -> Self {
        let name = self.name.clone();
        self.builder = self.builder.callback(
            callback,
            PlainCallback::new(move |_| Err(WareError::failed(format!("{} is broken", name)))),
        );
        self
    }

    /// Plain `callback` that panics.
    pub fn panicking(mut self, callback: &str) -> Self {
        let name = self.name.clone();
        self.builder = self.builder.callback(
            callback,
            PlainCallback::new(move |_| panic!("{} panicked", name)),
        );
        self
    }

    fn build(self) -> Ware {
        let reset = self.log.reset_hook(&self.name);
        self.builder.callback("reset", reset).build()
    }
}

/// Builder for collections of test wares.
#[derive(Default)]
pub struct ScenarioBuilder {
    log: EventLog,
    wares: Vec<Ware>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log shared by every ware in the scenario.
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    /// Add a ware configured by `configure`.
    pub fn ware<F>(mut self, name: &str, configure: F) -> Self
    where
        F: FnOnce(ScenarioWare) -> ScenarioWare,
    {
        let ware = configure(ScenarioWare::new(name, &self.log)).build();
        self.wares.push(ware);
        self
    }

    pub fn build(self) -> (Vec<Ware>, EventLog) {
        (self.wares, self.log)
    }

    /// Ware `A` whose `tick` yields 1, 2 then completes with `"done-A"`, and
    /// ware `B` whose `tick` never completes.
    pub fn tick_pair() -> Self {
        Self::new()
            .ware("A", |w| {
                w.finite("tick", vec![Value::from(1), Value::from(2)], Value::from("done-A"))
            })
            .ware("B", |w| w.endless("tick"))
    }
}
