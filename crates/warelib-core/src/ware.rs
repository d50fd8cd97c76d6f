//! The loaded ware entity.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::callback::WareCallback;
use crate::loader::ModuleHandle;
use crate::signals::SignalRegistry;

/// A named bundle of globals and callbacks.
///
/// The two maps are fixed once the ware is built; callbacks can be driven
/// through [`Ware::callback_mut`] but never added or replaced. Dropping a
/// ware produced by the loader releases its module registration.
#[derive(Debug)]
pub struct Ware {
    name: String,
    globals: IndexMap<String, Value>,
    callbacks: IndexMap<String, WareCallback>,
    module: Option<ModuleHandle>,
}

impl Ware {
    pub fn builder(name: impl Into<String>) -> WareBuilder {
        WareBuilder {
            name: name.into(),
            globals: IndexMap::new(),
            callbacks: IndexMap::new(),
        }
    }

    pub(crate) fn from_parts(
        name: String,
        globals: IndexMap<String, Value>,
        callbacks: IndexMap<String, WareCallback>,
        module: ModuleHandle,
    ) -> Self {
        Self {
            name,
            globals,
            callbacks,
            module: Some(module),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn globals(&self) -> &IndexMap<String, Value> {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn callbacks(&self) -> &IndexMap<String, WareCallback> {
        &self.callbacks
    }

    pub fn callback(&self, name: &str) -> Option<&WareCallback> {
        self.callbacks.get(name)
    }

    pub fn callback_mut(&mut self, name: &str) -> Option<&mut WareCallback> {
        self.callbacks.get_mut(name)
    }

    /// Callbacks in declaration order, mutably.
    pub fn callbacks_mut(&mut self) -> impl Iterator<Item = (&str, &mut WareCallback)> {
        self.callbacks
            .iter_mut()
            .map(|(name, callback)| (name.as_str(), callback))
    }

    /// Name of the module this ware was loaded from, if any.
    pub fn module_name(&self) -> Option<&str> {
        self.module.as_ref().map(ModuleHandle::name)
    }

    /// Point every sequence callback at `signals`.
    pub fn attach_signals(&mut self, signals: &Arc<SignalRegistry>) {
        for callback in self.callbacks.values_mut() {
            callback.set_signals(signals.clone());
        }
    }
}

/// Builder for wares assembled in code rather than by the loader.
pub struct WareBuilder {
    name: String,
    globals: IndexMap<String, Value>,
    callbacks: IndexMap<String, WareCallback>,
}

impl WareBuilder {
    pub fn global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    pub fn callback(mut self, name: impl Into<String>, callback: impl Into<WareCallback>) -> Self {
        self.callbacks.insert(name.into(), callback.into());
        self
    }

    pub fn build(self) -> Ware {
        Ware {
            name: self.name,
            globals: self.globals,
            callbacks: self.callbacks,
            module: None,
        }
    }
}
