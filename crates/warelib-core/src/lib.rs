//! Core types for warelib.
//!
//! A ware is a unit of plugin code (a microgame, say) exposing globals and
//! callbacks. This crate provides:
//! - callback state machines for plain and step-sequence callbacks
//! - lifecycle signals with host-brandable names
//! - a schema-checked loader turning modules into wares
//! - [`WareManager`], which drives callbacks across many wares and keeps
//!   one ware's failure from reaching the others

pub mod callback;
pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod signals;
pub mod ware;

pub use callback::{
    AsyncPlainCallback, AsyncStepCallback, AsyncStepProcess, CallbackMetadata, CallbackShape,
    PlainCallback, SequenceState, Step, StepCallback, StepProcess, WareCallback,
};
pub use config::ManagerConfig;
pub use error::{Result, WareError};
pub use loader::{
    ModuleCatalog, ModuleHandle, ModuleRegistry, SchemaRule, Symbol, SymbolKind, WareLoader,
    WareModule, WareSchema,
};
pub use manager::{BatchOutcome, WareManager, WareResetter, WareSelection};
pub use signals::{Signal, SignalCategory, SignalKind, SignalRegistry};
pub use ware::{Ware, WareBuilder};

/// Re-exports commonly used types.
pub mod prelude {
    // Callbacks
    pub use crate::callback::{
        AsyncPlainCallback, AsyncStepCallback, AsyncStepProcess, CallbackShape, PlainCallback,
        SequenceState, Step, StepCallback, StepProcess, WareCallback,
    };

    // Error handling
    pub use crate::error::{Result, WareError};

    // Signals
    pub use crate::signals::{Signal, SignalKind, SignalRegistry};

    // Loading
    pub use crate::loader::{ModuleCatalog, SymbolKind, WareLoader, WareModule, WareSchema};

    // Orchestration
    pub use crate::config::ManagerConfig;
    pub use crate::manager::{BatchOutcome, WareManager, WareResetter, WareSelection};
    pub use crate::ware::Ware;

    pub use serde_json::{json, Value};
}
