//! Loading wares from modules and driving them through a manager.

use serde_json::{json, Value};
use warelib_core::prelude::*;
use warelib_core::CallbackShape;
use warelib_testing::{Counter, EventLog, RecordingResetter};

fn no_resetter(_: &Ware) -> Result<()> {
    Ok(())
}

fn microgame(name: &'static str, log: EventLog) -> impl Fn() -> Result<WareModule> + Send + Sync {
    move || {
        Ok(WareModule::new(name)
            .value("title", json!(name.to_uppercase()))
            .value("lives", json!(3))
            .value("unused", json!("left behind"))
            .callback("tick", StepCallback::new(|_| Counter::new()))
            .callback("reset", log.reset_hook(name)))
    }
}

fn schema() -> WareSchema {
    WareSchema::new()
        .expect("title", SymbolKind::String)
        .validate("lives", "positive number", |symbol| {
            symbol.as_value().and_then(Value::as_i64).is_some_and(|n| n > 0)
        })
        .callback("tick", CallbackShape::Step)
        .callback("reset", CallbackShape::Plain)
}

#[test]
fn test_load_and_run() {
    let log = EventLog::new();
    let catalog = ModuleCatalog::new()
        .with_module("pong", microgame("pong", log.clone()))
        .with_module("snake", microgame("snake", log.clone()));
    let loader = WareLoader::new(catalog);
    let schema = schema();

    let wares = vec![
        loader.load_by_name("pong", &schema).unwrap(),
        loader.load_by_name("snake", &schema).unwrap(),
    ];
    assert_eq!(loader.registry().loaded(), vec!["pong", "snake"]);
    assert_eq!(wares[0].global("title"), Some(&json!("PONG")));
    assert!(wares[0].global("unused").is_none());

    let mut manager = WareManager::new(wares, RecordingResetter::new(log.clone()));
    let outcome = manager.step("tick", &Value::Null, WareSelection::All);
    assert_eq!(outcome.success("pong"), Some(&json!(1)));
    assert_eq!(outcome.success("snake"), Some(&json!(1)));

    manager.reset(["snake"]);
    assert_eq!(log.events(), vec!["resetter:snake", "reset:snake"]);

    drop(manager);
    assert!(loader.registry().loaded().is_empty());
}

#[test]
fn test_each_load_gets_fresh_state() {
    let catalog = ModuleCatalog::new().with_module("pong", microgame("pong", EventLog::new()));
    let loader = WareLoader::new(catalog);
    let schema = schema();

    let first = loader.load(loader.catalog().resolve("pong").unwrap(), &schema, Some("pong-1")).unwrap();
    let second = loader.load(loader.catalog().resolve("pong").unwrap(), &schema, Some("pong-2")).unwrap();
    assert_eq!(loader.registry().load_count("pong"), 2);

    let mut manager = WareManager::new(vec![first, second], no_resetter);
    manager.step("tick", &Value::Null, ["pong-1"]);
    let outcome = manager.step("tick", &Value::Null, WareSelection::All);
    assert_eq!(outcome.success("pong-1"), Some(&json!(2)));
    assert_eq!(outcome.success("pong-2"), Some(&json!(1)));
}

#[test]
fn test_missing_symbol_is_invalid_structure() {
    let loader = WareLoader::default();
    let module = WareModule::new("broken").value("title", json!("Broken"));

    let err = loader.load(module, &schema(), None).unwrap_err();
    assert!(err.is_signal(SignalKind::InvalidWareStructure));
    assert!(err.to_string().contains("doesn't contain a symbol named 'lives'"));
    assert!(loader.registry().loaded().is_empty());
}

#[test]
fn test_wrong_kind_is_invalid_structure() {
    let loader = WareLoader::default();
    let module = WareModule::new("swapped")
        .value("title", json!("Swapped"))
        .value("lives", json!(3))
        .callback("tick", PlainCallback::new(|_| Ok(Value::Null)))
        .callback("reset", PlainCallback::reset_hook(|| Ok(())));

    let err = loader.load(module, &schema(), None).unwrap_err();
    assert!(err.is_signal(SignalKind::InvalidWareStructure));
    assert!(err.to_string().contains("'tick' is a plain callback, expected step-sequence callback"));
}

#[test]
fn test_failed_validator_is_invalid_structure() {
    let loader = WareLoader::default();
    let module = WareModule::new("doomed")
        .value("title", json!("Doomed"))
        .value("lives", json!(0))
        .callback("tick", StepCallback::new(|_| Counter::new()))
        .callback("reset", PlainCallback::reset_hook(|| Ok(())));

    let err = loader.validate(&module, &schema()).unwrap_err();
    assert!(err.to_string().contains("expected positive number"));
}

#[test]
fn test_unknown_module() {
    let loader = WareLoader::default();
    assert!(matches!(
        loader.load_by_name("ghost", &WareSchema::new()),
        Err(WareError::ModuleNotFound(name)) if name == "ghost"
    ));
}

#[test]
fn test_loader_uses_its_signal_names() {
    let branded = std::sync::Arc::new(
        SignalRegistry::new().with_name(SignalKind::InvalidWareStructure, "BadMicrogame"),
    );
    let loader = WareLoader::default().with_signals(branded);

    let err = loader
        .load(WareModule::new("empty"), &WareSchema::new().value("title"), None)
        .unwrap_err();
    assert_eq!(err.signal().map(Signal::name), Some("BadMicrogame"));
}
