//! Ware manager.
//!
//! Multiplexes callback operations across a fixed, ordered collection of
//! wares. Every operation is a batch: it is attempted on each targeted ware
//! in registration order, and each ware lands in exactly one of the
//! outcome's `successes` or `errors`. Nothing raised while processing one
//! ware (panics included) reaches another.
//!
//! # Reset protocol
//!
//! For each targeted ware, in order:
//!
//! 1. the host [`WareResetter`] runs;
//! 2. every active sequence callback other than the reset callback is
//!    terminated; ended sequences stay ended;
//! 3. the reset callback (plain, named `reset` by default) runs, and any
//!    failure it raises is swallowed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use warelib_core::prelude::*;
//!
//! let mut manager = WareManager::new(wares, |_: &Ware| Ok(()));
//!
//! loop {
//!     let frame = manager.step("render", &Value::Null, WareSelection::All);
//!     for (name, err) in &frame.errors {
//!         eprintln!("{name}: {err}");
//!     }
//! }
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::callback::{
    AsyncPlainCallback, AsyncStepCallback, CallbackShape, PlainCallback, StepCallback,
    WareCallback,
};
use crate::config::ManagerConfig;
use crate::error::{Result, WareError};
use crate::signals::{SignalKind, SignalRegistry};
use crate::ware::Ware;

// ============================================================================
// Selection & outcome
// ============================================================================

/// Which registered wares an operation targets.
///
/// Names that are not registered are dropped silently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WareSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl WareSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

impl From<Vec<String>> for WareSelection {
    fn from(names: Vec<String>) -> Self {
        Self::Only(names)
    }
}

impl From<Vec<&str>> for WareSelection {
    fn from(names: Vec<&str>) -> Self {
        Self::only(names)
    }
}

impl From<&[&str]> for WareSelection {
    fn from(names: &[&str]) -> Self {
        Self::only(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for WareSelection {
    fn from(names: [&str; N]) -> Self {
        Self::only(names)
    }
}

/// Per-ware results of a batch operation.
///
/// The two maps have disjoint keys and keep ware registration order.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub successes: IndexMap<String, T>,
    pub errors: IndexMap<String, WareError>,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            successes: IndexMap::new(),
            errors: IndexMap::new(),
        }
    }

    pub fn record(&mut self, name: &str, result: Result<T>) {
        match result {
            Ok(value) => {
                self.successes.insert(name.to_string(), value);
            }
            Err(e) => {
                if e.signal().is_some() {
                    debug!(ware = %name, error = %e, "Ware reported lifecycle signal");
                } else {
                    warn!(ware = %name, error = %e, "Ware operation failed");
                }
                self.errors.insert(name.to_string(), e);
            }
        }
    }

    pub fn success(&self, name: &str) -> Option<&T> {
        self.successes.get(name)
    }

    pub fn error(&self, name: &str) -> Option<&WareError> {
        self.errors.get(name)
    }

    pub fn is_success(&self, name: &str) -> bool {
        self.successes.contains_key(name)
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of wares the batch was attempted on.
    pub fn len(&self) -> usize {
        self.successes.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (IndexMap<String, T>, IndexMap<String, WareError>) {
        (self.successes, self.errors)
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Resetter
// ============================================================================

/// Host hook run on each ware before its callbacks are reset.
pub trait WareResetter: Send + Sync {
    fn before_reset(&self, ware: &Ware) -> Result<()>;
}

impl<F> WareResetter for F
where
    F: Fn(&Ware) -> Result<()> + Send + Sync,
{
    fn before_reset(&self, ware: &Ware) -> Result<()> {
        self(ware)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Drives callbacks across a named collection of wares.
pub struct WareManager {
    wares: IndexMap<String, Ware>,
    resetter: Box<dyn WareResetter>,
    config: ManagerConfig,
    signals: Arc<SignalRegistry>,
}

impl WareManager {
    /// Manage `wares` with the default configuration.
    ///
    /// Later wares replace earlier ones with the same name.
    pub fn new<I, R>(wares: I, resetter: R) -> Self
    where
        I: IntoIterator<Item = Ware>,
        R: WareResetter + 'static,
    {
        Self::with_config(wares, resetter, ManagerConfig::default())
    }

    pub fn with_config<I, R>(wares: I, resetter: R, config: ManagerConfig) -> Self
    where
        I: IntoIterator<Item = Ware>,
        R: WareResetter + 'static,
    {
        let signals = config
            .signals
            .clone()
            .map(Arc::new)
            .unwrap_or_else(SignalRegistry::global);

        let mut registered = IndexMap::new();
        for mut ware in wares {
            ware.attach_signals(&signals);
            let name = ware.name().to_string();
            if registered.insert(name.clone(), ware).is_some() {
                debug!(ware = %name, "Replaced ware registered under the same name");
            }
        }
        debug!(count = registered.len(), "Ware manager created");

        Self {
            wares: registered,
            resetter: Box::new(resetter),
            config,
            signals,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn signals(&self) -> &Arc<SignalRegistry> {
        &self.signals
    }

    pub fn ware(&self, name: &str) -> Option<&Ware> {
        self.wares.get(name)
    }

    pub fn ware_mut(&mut self, name: &str) -> Option<&mut Ware> {
        self.wares.get_mut(name)
    }

    pub fn wares(&self) -> impl Iterator<Item = &Ware> {
        self.wares.values()
    }

    /// Registered ware names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.wares.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.wares.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.wares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wares.is_empty()
    }

    /// Begin a step callback on each targeted ware, returning first yields.
    pub fn begin(
        &mut self,
        callback: &str,
        args: &Value,
        selection: impl Into<WareSelection>,
    ) -> BatchOutcome<Value> {
        let selection = selection.into();
        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate(|| step_callback(ware, name, callback)?.begin(args));
            outcome.record(name, result);
        }
        finish("begin", callback, &outcome);
        outcome
    }

    /// Begin an async step callback on each targeted ware.
    pub async fn begin_async(
        &mut self,
        callback: &str,
        args: &Value,
        selection: impl Into<WareSelection>,
    ) -> BatchOutcome<()> {
        let selection = selection.into();
        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate_async(async move {
                async_step_callback(ware, name, callback)?.begin(args).await
            })
            .await;
            outcome.record(name, result);
        }
        finish("begin_async", callback, &outcome);
        outcome
    }

    /// Run a plain callback once on each targeted ware.
    pub fn invoke(
        &mut self,
        callback: &str,
        args: &Value,
        selection: impl Into<WareSelection>,
    ) -> BatchOutcome<Value> {
        let selection = selection.into();
        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate(|| plain_callback(ware, name, callback)?.invoke(args));
            outcome.record(name, result);
        }
        finish("invoke", callback, &outcome);
        outcome
    }

    /// Run an async plain callback once on each targeted ware.
    pub async fn invoke_async(
        &mut self,
        callback: &str,
        args: &Value,
        selection: impl Into<WareSelection>,
    ) -> BatchOutcome<Value> {
        let selection = selection.into();
        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate_async(async move {
                async_plain_callback(ware, name, callback)?.invoke(args).await
            })
            .await;
            outcome.record(name, result);
        }
        finish("invoke_async", callback, &outcome);
        outcome
    }

    /// Advance a step callback on each targeted ware.
    ///
    /// A sequence that is not active is begun with `value` as its argument;
    /// otherwise `value` is sent in. Completion is reported as the callback's
    /// `WareCallbackEnded` error, and an ended sequence then reports
    /// `WareCallbackBegun` until the ware is reloaded.
    pub fn step(
        &mut self,
        callback: &str,
        value: &Value,
        selection: impl Into<WareSelection>,
    ) -> BatchOutcome<Value> {
        let selection = selection.into();
        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate(|| {
                let cb = step_callback(ware, name, callback)?;
                if cb.is_active() {
                    cb.step(value.clone())
                } else {
                    cb.begin(value)
                }
            });
            outcome.record(name, result);
        }
        finish("step", callback, &outcome);
        outcome
    }

    /// Advance an async step callback on each targeted ware.
    ///
    /// Wares whose sequence had to be begun report `None`. An ended sequence
    /// reports `WareCallbackBegun`.
    pub async fn step_async(
        &mut self,
        callback: &str,
        value: &Value,
        selection: impl Into<WareSelection>,
    ) -> BatchOutcome<Option<Value>> {
        let selection = selection.into();
        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate_async(async move {
                let cb = async_step_callback(ware, name, callback)?;
                if cb.is_active() {
                    cb.step(value.clone()).await.map(Some)
                } else {
                    cb.begin(value).await.map(|_| None)
                }
            })
            .await;
            outcome.record(name, result);
        }
        finish("step_async", callback, &outcome);
        outcome
    }

    /// Run the reset protocol on each targeted ware.
    ///
    /// Active async sequences cannot be closed here; they are dropped
    /// without cooperative closure. Use [`WareManager::reset_async`] to
    /// close them.
    pub fn reset(&mut self, selection: impl Into<WareSelection>) -> BatchOutcome<()> {
        let selection = selection.into();
        let resetter = self.resetter.as_ref();
        let reset_name = self.config.reset_callback.as_str();
        let signals = self.signals.as_ref();

        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate(|| {
                resetter.before_reset(ware)?;

                let must_end = signals.signal(
                    SignalKind::WareCallbackMustEnd,
                    format!("ware '{}' is resetting", name),
                );
                for (callback_name, callback) in ware.callbacks_mut() {
                    if callback_name == reset_name {
                        continue;
                    }
                    match callback {
                        WareCallback::Step(cb) if cb.is_active() => {
                            let unwound = cb.terminate(&must_end)?;
                            trace!(ware = %name, callback = %callback_name, ?unwound, "Step sequence reset");
                        }
                        WareCallback::AsyncStep(cb) => {
                            if cb.abandon() {
                                warn!(
                                    ware = %name,
                                    callback = %callback_name,
                                    "Dropped active async step sequence without closing it"
                                );
                            }
                        }
                        WareCallback::Step(_) | WareCallback::Plain(_) | WareCallback::AsyncPlain(_) => {}
                    }
                }

                run_reset_callback(ware, name, reset_name)
            });
            outcome.record(name, result);
        }
        finish("reset", reset_name, &outcome);
        outcome
    }

    /// Run the reset protocol, closing async sequences cooperatively.
    ///
    /// A sequence that never finishes closing blocks the batch.
    pub async fn reset_async(&mut self, selection: impl Into<WareSelection>) -> BatchOutcome<()> {
        let selection = selection.into();
        let resetter = self.resetter.as_ref();
        let reset_name = self.config.reset_callback.as_str();
        let signals = self.signals.as_ref();

        let mut outcome = BatchOutcome::new();
        for (name, ware) in selected(&mut self.wares, &selection) {
            let result = isolate_async(async move {
                resetter.before_reset(ware)?;

                let must_end = signals.signal(
                    SignalKind::WareCallbackMustEnd,
                    format!("ware '{}' is resetting", name),
                );
                for (callback_name, callback) in ware.callbacks_mut() {
                    if callback_name == reset_name {
                        continue;
                    }
                    match callback {
                        WareCallback::Step(cb) if cb.is_active() => {
                            let unwound = cb.terminate(&must_end)?;
                            trace!(ware = %name, callback = %callback_name, ?unwound, "Step sequence reset");
                        }
                        WareCallback::AsyncStep(cb) => cb.reset().await,
                        WareCallback::Step(_) | WareCallback::Plain(_) | WareCallback::AsyncPlain(_) => {}
                    }
                }

                run_reset_callback(ware, name, reset_name)
            })
            .await;
            outcome.record(name, result);
        }
        finish("reset_async", reset_name, &outcome);
        outcome
    }
}

impl std::fmt::Debug for WareManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WareManager")
            .field("wares", &self.wares.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn selected<'a>(
    wares: &'a mut IndexMap<String, Ware>,
    selection: &'a WareSelection,
) -> impl Iterator<Item = (&'a str, &'a mut Ware)> + 'a {
    wares
        .iter_mut()
        .filter(move |(name, _)| selection.includes(name))
        .map(|(name, ware)| (name.as_str(), ware))
}

fn isolate<T>(op: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|payload| Err(WareError::from_panic(payload)))
}

async fn isolate_async<T>(op: impl Future<Output = Result<T>>) -> Result<T> {
    AssertUnwindSafe(op)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(WareError::from_panic(payload)))
}

fn finish<T>(operation: &str, callback: &str, outcome: &BatchOutcome<T>) {
    debug!(
        operation,
        callback,
        succeeded = outcome.successes.len(),
        failed = outcome.errors.len(),
        "Batch finished"
    );
}

fn shape_mismatch(ware: &str, callback: &str, expected: CallbackShape, found: CallbackShape) -> WareError {
    WareError::ShapeMismatch {
        ware: ware.to_string(),
        callback: callback.to_string(),
        expected,
        found,
    }
}

fn not_found(ware: &str, callback: &str) -> WareError {
    WareError::CallbackNotFound {
        ware: ware.to_string(),
        callback: callback.to_string(),
    }
}

fn plain_callback<'a>(ware: &'a mut Ware, name: &str, callback: &str) -> Result<&'a mut PlainCallback> {
    match ware.callback_mut(callback) {
        Some(WareCallback::Plain(cb)) => Ok(cb),
        Some(other) => Err(shape_mismatch(name, callback, CallbackShape::Plain, other.shape())),
        None => Err(not_found(name, callback)),
    }
}

fn async_plain_callback<'a>(
    ware: &'a mut Ware,
    name: &str,
    callback: &str,
) -> Result<&'a mut AsyncPlainCallback> {
    match ware.callback_mut(callback) {
        Some(WareCallback::AsyncPlain(cb)) => Ok(cb),
        Some(other) => Err(shape_mismatch(name, callback, CallbackShape::AsyncPlain, other.shape())),
        None => Err(not_found(name, callback)),
    }
}

fn step_callback<'a>(ware: &'a mut Ware, name: &str, callback: &str) -> Result<&'a mut StepCallback> {
    match ware.callback_mut(callback) {
        Some(WareCallback::Step(cb)) => Ok(cb),
        Some(other) => Err(shape_mismatch(name, callback, CallbackShape::Step, other.shape())),
        None => Err(not_found(name, callback)),
    }
}

fn async_step_callback<'a>(
    ware: &'a mut Ware,
    name: &str,
    callback: &str,
) -> Result<&'a mut AsyncStepCallback> {
    match ware.callback_mut(callback) {
        Some(WareCallback::AsyncStep(cb)) => Ok(cb),
        Some(other) => Err(shape_mismatch(name, callback, CallbackShape::AsyncStep, other.shape())),
        None => Err(not_found(name, callback)),
    }
}

/// Final reset phase: run the plain reset callback, swallowing its failure.
fn run_reset_callback(ware: &Ware, name: &str, reset_name: &str) -> Result<()> {
    match ware.callback(reset_name) {
        None => Ok(()),
        Some(WareCallback::Plain(cb)) => {
            match panic::catch_unwind(AssertUnwindSafe(|| cb.invoke(&Value::Null))) {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(ware = %name, error = %e, "Ignoring failure from reset callback")
                }
                Err(_) => warn!(ware = %name, "Ignoring panic from reset callback"),
            }
            Ok(())
        }
        Some(other) => Err(shape_mismatch(name, reset_name, CallbackShape::Plain, other.shape())),
    }
}
