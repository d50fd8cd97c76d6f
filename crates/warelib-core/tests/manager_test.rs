//! Batch operations across several wares.

use serde_json::{json, Value};
use warelib_core::prelude::*;
use warelib_core::CallbackShape;
use warelib_testing::{init_tracing, EventLog, RecordingResetter, ScenarioBuilder, TerminateBehavior};

fn no_resetter(_: &Ware) -> Result<()> {
    Ok(())
}

fn assert_disjoint<T>(outcome: &BatchOutcome<T>) {
    for name in outcome.successes.keys() {
        assert!(!outcome.errors.contains_key(name), "{} in both maps", name);
    }
}

#[test]
fn test_step_reports_completion_per_ware() {
    init_tracing();
    let (wares, _) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, no_resetter);

    let first = manager.step("tick", &Value::Null, WareSelection::All);
    assert_eq!(first.success("A"), Some(&json!(1)));
    assert_eq!(first.success("B"), Some(&json!(1)));
    assert!(first.errors.is_empty());

    let second = manager.step("tick", &Value::Null, WareSelection::All);
    assert_eq!(second.success("A"), Some(&json!(2)));
    assert_eq!(second.success("B"), Some(&json!(2)));

    let third = manager.step("tick", &Value::Null, WareSelection::All);
    let err = third.error("A").unwrap();
    assert!(err.is_signal(SignalKind::WareCallbackEnded));
    assert_eq!(err.completion_payload(), Some(&json!("done-A")));
    assert_eq!(third.success("B"), Some(&json!(3)));
    assert_disjoint(&third);
}

#[test]
fn test_step_after_completion_reports_begun() {
    let (wares, _) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, no_resetter);

    for _ in 0..3 {
        manager.step("tick", &Value::Null, ["A"]);
    }
    let fourth = manager.step("tick", &Value::Null, ["A"]);
    let err = fourth.error("A").unwrap();
    assert!(err.is_signal(SignalKind::WareCallbackBegun));

    let tick = manager.ware("A").unwrap().callback("tick").unwrap();
    assert_eq!(tick.sequence_state(), Some(SequenceState::Ended));
}

#[test]
fn test_invoke_shape_mismatch_is_isolated() {
    let (wares, _) = ScenarioBuilder::new()
        .ware("A", |w| w.endless("tick"))
        .ware("B", |w| w.echo("tick"))
        .build();
    let mut manager = WareManager::new(wares, no_resetter);

    let outcome = manager.invoke("tick", &Value::Null, WareSelection::All);
    match outcome.error("A") {
        Some(WareError::ShapeMismatch {
            expected, found, ..
        }) => {
            assert_eq!(*expected, CallbackShape::Plain);
            assert_eq!(*found, CallbackShape::Step);
        }
        other => panic!("expected shape mismatch, got {:?}", other),
    }
    assert_eq!(outcome.success("B"), Some(&json!("B")));
}

#[test]
fn test_missing_callback_lands_in_errors() {
    let (wares, _) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, no_resetter);

    let outcome = manager.invoke("draw", &Value::Null, WareSelection::All);
    assert_eq!(outcome.len(), 2);
    assert!(outcome.successes.is_empty());
    assert!(matches!(
        outcome.error("B"),
        Some(WareError::CallbackNotFound { callback, .. }) if callback == "draw"
    ));
}

#[test]
fn test_selection_filters_and_ignores_unknown_names() {
    let (wares, _) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, no_resetter);

    let outcome = manager.step("tick", &Value::Null, ["B", "ghost"]);
    assert_eq!(outcome.len(), 1);
    assert!(outcome.is_success("B"));

    let untouched = manager.ware("A").unwrap().callback("tick").unwrap();
    assert_eq!(untouched.sequence_state(), Some(SequenceState::NotStarted));

    let empty = manager.step("tick", &Value::Null, WareSelection::Only(vec![]));
    assert!(empty.is_empty());
}

#[test]
fn test_outcome_follows_registration_order() {
    let (wares, _) = ScenarioBuilder::new()
        .ware("zeta", |w| w.echo("hello"))
        .ware("alpha", |w| w.broken("hello"))
        .ware("mid", |w| w.echo("hello"))
        .build();
    let mut manager = WareManager::new(wares, no_resetter);

    let outcome = manager.invoke("hello", &Value::Null, ["mid", "zeta", "alpha"]);
    let order: Vec<_> = outcome.successes.keys().cloned().collect();
    assert_eq!(order, vec!["zeta", "mid"]);
    assert!(outcome.error("alpha").is_some());
}

#[test]
fn test_panicking_ware_does_not_reach_others() {
    init_tracing();
    let (wares, _) = ScenarioBuilder::new()
        .ware("calm", |w| w.echo("draw"))
        .ware("wild", |w| w.panicking("draw"))
        .ware("late", |w| w.echo("draw"))
        .build();
    let mut manager = WareManager::new(wares, no_resetter);

    let outcome = manager.invoke("draw", &Value::Null, WareSelection::All);
    assert!(outcome.is_success("calm"));
    assert!(outcome.is_success("late"));
    assert!(matches!(
        outcome.error("wild"),
        Some(WareError::Panicked(msg)) if msg.contains("wild panicked")
    ));
}

#[test]
fn test_begin_twice_reports_begun() {
    let (wares, _) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, no_resetter);

    let first = manager.begin("tick", &Value::Null, WareSelection::All);
    assert!(first.all_succeeded());

    let second = manager.begin("tick", &Value::Null, WareSelection::All);
    assert!(second.successes.is_empty());
    assert!(second
        .errors
        .values()
        .all(|e| e.is_signal(SignalKind::WareCallbackBegun)));
}

#[test]
fn test_reset_runs_phases_in_order() {
    let (wares, log) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, RecordingResetter::new(log.clone()));

    manager.step("tick", &Value::Null, WareSelection::All);
    log.clear();

    let outcome = manager.reset(WareSelection::All);
    assert!(outcome.all_succeeded());
    assert_eq!(
        log.events(),
        vec![
            "resetter:A",
            "terminate:A.tick:WareCallbackMustEnd",
            "reset:A",
            "resetter:B",
            "reset:B",
        ]
    );

    for ware in manager.wares() {
        let state = ware.callback("tick").and_then(WareCallback::sequence_state);
        assert_eq!(state, Some(SequenceState::NotStarted));
    }

    // Sequences start over after a reset.
    let again = manager.step("tick", &Value::Null, WareSelection::All);
    assert_eq!(again.success("A"), Some(&json!(1)));
    assert_eq!(again.success("B"), Some(&json!(1)));
}

#[test]
fn test_reset_leaves_ended_sequences_alone() {
    let (wares, log) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, RecordingResetter::new(log.clone()));

    for _ in 0..3 {
        manager.step("tick", &Value::Null, ["A"]);
    }
    log.clear();

    let outcome = manager.reset(["A"]);
    assert!(outcome.is_success("A"));
    // Nothing is injected into a finished sequence.
    assert_eq!(log.events(), vec!["resetter:A", "reset:A"]);

    let tick = manager.ware("A").unwrap().callback("tick").unwrap();
    assert_eq!(tick.sequence_state(), Some(SequenceState::Ended));

    let next = manager.step("tick", &Value::Null, ["A"]);
    assert!(next.success("A").is_none());
    assert!(next
        .error("A")
        .is_some_and(|e| e.is_signal(SignalKind::WareCallbackBegun)));
}

#[test]
fn test_resetter_failure_skips_remaining_phases() {
    let (wares, log) = ScenarioBuilder::tick_pair().build();
    let resetter = RecordingResetter::new(log.clone()).failing_for("A");
    let mut manager = WareManager::new(wares, resetter);

    manager.step("tick", &Value::Null, WareSelection::All);
    log.clear();

    let outcome = manager.reset(WareSelection::All);
    assert!(matches!(
        outcome.error("A"),
        Some(WareError::ResetterFailed { ware, .. }) if ware == "A"
    ));
    assert!(outcome.is_success("B"));
    assert_eq!(log.events(), vec!["resetter:A", "resetter:B", "reset:B"]);

    let a_tick = manager.ware("A").unwrap().callback("tick").unwrap();
    assert_eq!(a_tick.sequence_state(), Some(SequenceState::Active));
}

#[test]
fn test_failing_reset_callback_still_succeeds() {
    let log = EventLog::new();
    let ware = Ware::builder("fragile")
        .callback(
            "reset",
            PlainCallback::reset_hook(|| Err(WareError::failed("cleanup failed"))),
        )
        .build();
    let mut manager = WareManager::new(vec![ware], RecordingResetter::new(log.clone()));

    let outcome = manager.reset(WareSelection::All);
    assert!(outcome.is_success("fragile"));
    assert_eq!(log.events(), vec!["resetter:fragile"]);
}

#[test]
fn test_reset_callback_must_be_plain() {
    let ware = Ware::builder("odd")
        .callback("reset", StepCallback::new(|_| warelib_testing::Counter::new()))
        .build();
    let mut manager = WareManager::new(vec![ware], no_resetter);

    let outcome = manager.reset(WareSelection::All);
    assert!(matches!(
        outcome.error("odd"),
        Some(WareError::ShapeMismatch { expected: CallbackShape::Plain, .. })
    ));
}

#[test]
fn test_terminate_outcomes_during_reset() {
    let (wares, _) = ScenarioBuilder::new()
        .ware("catches", |w| {
            w.finite_with(
                "tick",
                vec![json!(1), json!(2)],
                json!("never"),
                TerminateBehavior::Return(json!("cleanup")),
            )
        })
        .ware("fails", |w| {
            w.finite_with(
                "tick",
                vec![json!(1), json!(2)],
                json!("never"),
                TerminateBehavior::Fail("stuck".to_string()),
            )
        })
        .build();
    let mut manager = WareManager::new(wares, no_resetter);

    manager.step("tick", &Value::Null, WareSelection::All);
    let outcome = manager.reset(WareSelection::All);

    assert!(outcome.is_success("catches"));
    assert!(matches!(
        outcome.error("fails"),
        Some(WareError::ExecutionFailed(reason)) if reason == "stuck"
    ));
    // The handle is released even when unwinding fails.
    let tick = manager.ware("fails").unwrap().callback("tick").unwrap();
    assert_eq!(tick.sequence_state(), Some(SequenceState::NotStarted));
}

#[test]
fn test_custom_reset_callback_name() {
    let log = EventLog::new();
    let ware = Ware::builder("custom")
        .callback("cleanup", log.reset_hook("custom"))
        .callback("reset", log.reset_hook("ignored"))
        .build();
    let config = ManagerConfig::new().with_reset_callback("cleanup");
    let mut manager = WareManager::with_config(vec![ware], no_resetter, config);

    let outcome = manager.reset(WareSelection::All);
    assert!(outcome.all_succeeded());
    assert_eq!(log.events(), vec!["reset:custom"]);
}

#[test]
fn test_duplicate_names_overwrite() {
    let first = Ware::builder("dup").global("version", json!(1)).build();
    let second = Ware::builder("dup").global("version", json!(2)).build();
    let manager = WareManager::new(vec![first, second], no_resetter);

    assert_eq!(manager.len(), 1);
    assert_eq!(manager.ware("dup").unwrap().global("version"), Some(&json!(2)));
}

#[test]
fn test_branded_signal_names() {
    let config = ManagerConfig::new().with_signals(
        SignalRegistry::new().with_name(SignalKind::WareCallbackEnded, "MicrogameOver"),
    );
    let (wares, _) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::with_config(wares, no_resetter, config);

    for _ in 0..2 {
        manager.step("tick", &Value::Null, ["A"]);
    }
    let outcome = manager.step("tick", &Value::Null, ["A"]);
    let signal = outcome.error("A").and_then(WareError::signal).unwrap();
    assert_eq!(signal.name(), "MicrogameOver");
    assert_eq!(signal.kind(), SignalKind::WareCallbackEnded);
}

#[test]
fn test_reset_untouched_ware_runs_hooks_only() {
    let (wares, log) = ScenarioBuilder::tick_pair().build();
    let mut manager = WareManager::new(wares, RecordingResetter::new(log.clone()));

    let outcome = manager.reset(["A"]);
    assert!(outcome.is_success("A"));
    assert_eq!(log.events(), vec!["resetter:A", "reset:A"]);
}

#[test]
fn test_sync_begin_rejects_async_sequences() {
    let (wares, _) = ScenarioBuilder::new()
        .ware("A", |w| w.endless_async("tick"))
        .ware("B", |w| w.endless("tick"))
        .build();
    let mut manager = WareManager::new(wares, no_resetter);

    for outcome in [
        manager.begin("tick", &Value::Null, WareSelection::All),
        manager.step("tick", &Value::Null, WareSelection::All),
    ] {
        assert!(matches!(
            outcome.error("A"),
            Some(WareError::ShapeMismatch {
                expected: CallbackShape::Step,
                found: CallbackShape::AsyncStep,
                ..
            })
        ));
        assert!(outcome.is_success("B"));
    }

    let tick = manager.ware("A").unwrap().callback("tick").unwrap();
    assert_eq!(tick.sequence_state(), Some(SequenceState::NotStarted));
}
