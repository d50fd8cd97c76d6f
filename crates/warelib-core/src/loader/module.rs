//! Resolved code units and loader bookkeeping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::callback::{CallbackShape, WareCallback};
use crate::error::{Result, WareError};

/// A named item exposed by a module.
#[derive(Debug)]
pub enum Symbol {
    Value(Value),
    Callback(WareCallback),
}

/// What kind of item a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Callback(CallbackShape),
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Value(Value::Null) => SymbolKind::Null,
            Symbol::Value(Value::Bool(_)) => SymbolKind::Bool,
            Symbol::Value(Value::Number(_)) => SymbolKind::Number,
            Symbol::Value(Value::String(_)) => SymbolKind::String,
            Symbol::Value(Value::Array(_)) => SymbolKind::Array,
            Symbol::Value(Value::Object(_)) => SymbolKind::Object,
            Symbol::Callback(cb) => SymbolKind::Callback(cb.shape()),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Symbol::Value(v) => Some(v),
            Symbol::Callback(_) => None,
        }
    }

    pub fn as_callback(&self) -> Option<&WareCallback> {
        match self {
            Symbol::Callback(cb) => Some(cb),
            Symbol::Value(_) => None,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
            Self::Callback(shape) => write!(f, "{} callback", shape),
        }
    }
}

/// A code unit whose symbols have been resolved but not yet validated.
#[derive(Debug)]
pub struct WareModule {
    name: String,
    symbols: IndexMap<String, Symbol>,
}

impl WareModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: IndexMap::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.symbols.insert(name.into(), Symbol::Value(value));
        self
    }

    pub fn callback(mut self, name: impl Into<String>, callback: impl Into<WareCallback>) -> Self {
        self.symbols
            .insert(name.into(), Symbol::Callback(callback.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> &IndexMap<String, Symbol> {
        &self.symbols
    }

    pub(crate) fn take_symbol(&mut self, name: &str) -> Option<Symbol> {
        self.symbols.shift_remove(name)
    }
}

type ModuleFactory = dyn Fn() -> Result<WareModule> + Send + Sync;

/// Importable modules, resolved by name.
///
/// Each resolution runs the factory again, so every loaded ware gets its own
/// callback state.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: IndexMap<String, Arc<ModuleFactory>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<WareModule> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn with_module<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<WareModule> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Produce a fresh module for `name`.
    pub fn resolve(&self, name: &str) -> Result<WareModule> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| WareError::ModuleNotFound(name.to_string()))?;
        factory()
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Which modules are currently loaded, and by how many wares.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    loaded: Arc<Mutex<HashMap<String, usize>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a load; the entry lives as long as the returned handle.
    pub fn register(&self, name: &str) -> ModuleHandle {
        *self.loaded.lock().entry(name.to_string()).or_insert(0) += 1;
        ModuleHandle {
            name: name.to_string(),
            loaded: self.loaded.clone(),
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().contains_key(name)
    }

    /// Number of live wares loaded from `name`.
    pub fn load_count(&self, name: &str) -> usize {
        self.loaded.lock().get(name).copied().unwrap_or(0)
    }

    /// Loaded module names, sorted.
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Registration of one loaded ware; unregisters on drop.
pub struct ModuleHandle {
    name: String,
    loaded: Arc<Mutex<HashMap<String, usize>>>,
}

impl ModuleHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle").field("name", &self.name).finish()
    }
}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        let mut loaded = self.loaded.lock();
        if let Some(count) = loaded.get_mut(&self.name) {
            *count -= 1;
            if *count == 0 {
                loaded.remove(&self.name);
            }
        }
    }
}
