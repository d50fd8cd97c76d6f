//! Resetters and hooks that record what happened.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use warelib_core::{PlainCallback, Result, Ware, WareError, WareResetter};

/// Ordered, shared log of test events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Plain callback that logs `reset:<ware>` when run.
    pub fn reset_hook(&self, ware: &str) -> PlainCallback {
        let log = self.clone();
        let event = format!("reset:{}", ware);
        PlainCallback::reset_hook(move || {
            log.record(event.clone());
            Ok(())
        })
    }
}

/// Logs `resetter:<ware>` and fails for selected wares.
#[derive(Debug, Clone, Default)]
pub struct RecordingResetter {
    log: EventLog,
    failing: HashSet<String>,
}

impl RecordingResetter {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            failing: HashSet::new(),
        }
    }

    pub fn failing_for(mut self, ware: impl Into<String>) -> Self {
        self.failing.insert(ware.into());
        self
    }
}

impl WareResetter for RecordingResetter {
    fn before_reset(&self, ware: &Ware) -> Result<()> {
        self.log.record(format!("resetter:{}", ware.name()));
        if self.failing.contains(ware.name()) {
            return Err(WareError::ResetterFailed {
                ware: ware.name().to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}
