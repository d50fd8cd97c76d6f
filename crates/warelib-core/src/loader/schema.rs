//! Expected module structure.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::module::{Symbol, SymbolKind};
use crate::callback::CallbackShape;

type ValidatorFn = dyn Fn(&Symbol) -> bool + Send + Sync;

/// How one expected symbol is checked.
#[derive(Clone)]
pub enum SchemaRule {
    /// Exactly this kind.
    Kind(SymbolKind),
    /// Any non-callback value.
    AnyValue,
    /// A callback of any shape.
    AnyCallback,
    /// A named predicate.
    Validator {
        description: String,
        check: Arc<ValidatorFn>,
    },
}

impl SchemaRule {
    pub fn check(&self, symbol: &Symbol) -> bool {
        match self {
            SchemaRule::Kind(kind) => symbol.kind() == *kind,
            SchemaRule::AnyValue => matches!(symbol, Symbol::Value(_)),
            SchemaRule::AnyCallback => matches!(symbol, Symbol::Callback(_)),
            SchemaRule::Validator { check, .. } => check(symbol),
        }
    }
}

impl fmt::Display for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRule::Kind(kind) => write!(f, "{}", kind),
            SchemaRule::AnyValue => write!(f, "value"),
            SchemaRule::AnyCallback => write!(f, "callback"),
            SchemaRule::Validator { description, .. } => write!(f, "{}", description),
        }
    }
}

impl fmt::Debug for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaRule({})", self)
    }
}

/// Ordered set of symbols a module must expose.
#[derive(Debug, Clone, Default)]
pub struct WareSchema {
    rules: IndexMap<String, SchemaRule>,
}

impl WareSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, name: impl Into<String>, rule: SchemaRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    pub fn expect(self, name: impl Into<String>, kind: SymbolKind) -> Self {
        self.rule(name, SchemaRule::Kind(kind))
    }

    pub fn value(self, name: impl Into<String>) -> Self {
        self.rule(name, SchemaRule::AnyValue)
    }

    pub fn callback(self, name: impl Into<String>, shape: CallbackShape) -> Self {
        self.rule(name, SchemaRule::Kind(SymbolKind::Callback(shape)))
    }

    pub fn any_callback(self, name: impl Into<String>) -> Self {
        self.rule(name, SchemaRule::AnyCallback)
    }

    pub fn validate<F>(self, name: impl Into<String>, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Symbol) -> bool + Send + Sync + 'static,
    {
        self.rule(
            name,
            SchemaRule::Validator {
                description: description.into(),
                check: Arc::new(check),
            },
        )
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &SchemaRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
