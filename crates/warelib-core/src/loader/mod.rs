//! Ware loader.
//!
//! Turns a resolved [`WareModule`] into a [`Ware`] after checking it against
//! a [`WareSchema`]. Only symbols named by the schema are extracted:
//! callbacks land in the ware's callbacks, everything else in its globals.
//!
//! Where modules come from is up to the host; [`ModuleCatalog`] resolves
//! importable names to module factories. Every loaded ware is recorded in the
//! loader's [`ModuleRegistry`] until it is dropped.

pub mod module;
pub mod schema;

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

pub use module::{ModuleCatalog, ModuleHandle, ModuleRegistry, Symbol, SymbolKind, WareModule};
pub use schema::{SchemaRule, WareSchema};

use crate::error::Result;
use crate::signals::{SignalKind, SignalRegistry};
use crate::ware::Ware;

/// Validates modules and produces wares.
#[derive(Debug)]
pub struct WareLoader {
    catalog: ModuleCatalog,
    registry: ModuleRegistry,
    signals: Arc<SignalRegistry>,
}

impl WareLoader {
    pub fn new(catalog: ModuleCatalog) -> Self {
        Self {
            catalog,
            registry: ModuleRegistry::new(),
            signals: SignalRegistry::global(),
        }
    }

    pub fn with_signals(mut self, signals: Arc<SignalRegistry>) -> Self {
        self.signals = signals;
        self
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ModuleCatalog {
        &mut self.catalog
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Resolve `module_name` from the catalog and load it under that name.
    pub fn load_by_name(&self, module_name: &str, schema: &WareSchema) -> Result<Ware> {
        let module = self.catalog.resolve(module_name)?;
        self.load(module, schema, None)
    }

    /// Validate `module` against `schema` and build a ware.
    ///
    /// The ware is named `name`, or after the module when `None`. Fails with
    /// `InvalidWareStructure` naming the first missing or mismatched symbol.
    pub fn load(&self, mut module: WareModule, schema: &WareSchema, name: Option<&str>) -> Result<Ware> {
        self.validate(&module, schema)?;

        let mut globals = IndexMap::new();
        let mut callbacks = IndexMap::new();
        for (symbol_name, _) in schema.rules() {
            match module.take_symbol(symbol_name) {
                Some(Symbol::Callback(mut callback)) => {
                    callback.set_signals(self.signals.clone());
                    callbacks.insert(symbol_name.to_string(), callback);
                }
                Some(Symbol::Value(value)) => {
                    globals.insert(symbol_name.to_string(), value);
                }
                None => {}
            }
        }

        let ware_name = name.unwrap_or(module.name()).to_string();
        let handle = self.registry.register(module.name());
        debug!(
            ware = %ware_name,
            module = %module.name(),
            globals = globals.len(),
            callbacks = callbacks.len(),
            "Loaded ware"
        );

        Ok(Ware::from_parts(ware_name, globals, callbacks, handle))
    }

    /// Check `module` against `schema` without consuming it.
    pub fn validate(&self, module: &WareModule, schema: &WareSchema) -> Result<()> {
        for (symbol_name, rule) in schema.rules() {
            let symbol = module.symbol(symbol_name).ok_or_else(|| {
                self.signals.error(
                    SignalKind::InvalidWareStructure,
                    format!(
                        "ware module '{}' doesn't contain a symbol named '{}'",
                        module.name(),
                        symbol_name
                    ),
                )
            })?;

            if !rule.check(symbol) {
                return Err(self.signals.error(
                    SignalKind::InvalidWareStructure,
                    format!(
                        "ware module '{}' symbol '{}' is a {}, expected {}",
                        module.name(),
                        symbol_name,
                        symbol.kind(),
                        rule
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl Default for WareLoader {
    fn default() -> Self {
        Self::new(ModuleCatalog::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CallbackShape, PlainCallback};
    use serde_json::Value;

    #[test]
    fn test_unlisted_symbols_are_left_behind() {
        let loader = WareLoader::default();
        let module = WareModule::new("pong")
            .value("title", Value::from("Pong"))
            .value("scratch", Value::from(1))
            .callback("render", PlainCallback::new(|_| Ok(Value::Null)));
        let schema = WareSchema::new()
            .expect("title", SymbolKind::String)
            .callback("render", CallbackShape::Plain);

        let ware = loader.load(module, &schema, Some("pong-1")).unwrap();
        assert_eq!(ware.name(), "pong-1");
        assert_eq!(ware.module_name(), Some("pong"));
        assert!(ware.global("scratch").is_none());
        assert_eq!(ware.callbacks().len(), 1);
    }
}
