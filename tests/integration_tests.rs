//! Integration tests for breakpoint gating
//!
//! These tests drive `DebugGate` end to end with an in-memory environment
//! and a recording debugger in place of a real one.

use cipdb::context::{self, CallSite, Failure};
use cipdb::env::{CIPDB, CIPDB_ID, CIPDB_IDS};
use cipdb::{
    CipdbError, Condition, DebugGate, Debugger, DebuggerError, DebuggerResolver, MapEnv,
};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Components
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stop {
    Interactive { line: u32, id: Option<String> },
    PostMortem { message: String },
}

/// Debugger that records every session instead of stopping
struct RecordingDebugger {
    name: &'static str,
    stops: Arc<Mutex<Vec<Stop>>>,
}

impl Debugger for RecordingDebugger {
    fn name(&self) -> &str {
        self.name
    }

    fn enter_interactive(&mut self, site: &CallSite) -> Result<(), DebuggerError> {
        self.stops.lock().unwrap().push(Stop::Interactive {
            line: site.location.line,
            id: site.id.clone(),
        });
        Ok(())
    }

    fn enter_post_mortem(&mut self, failure: &Failure) -> Result<(), DebuggerError> {
        self.stops.lock().unwrap().push(Stop::PostMortem {
            message: failure.message.clone(),
        });
        Ok(())
    }
}

struct Harness {
    stops: Arc<Mutex<Vec<Stop>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            stops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn resolver(&self) -> DebuggerResolver {
        let stops = self.stops.clone();
        DebuggerResolver::new(
            move || {
                Ok(Box::new(RecordingDebugger {
                    name: "recording",
                    stops: stops.clone(),
                }) as Box<dyn Debugger>)
            },
            || Err(DebuggerError::NoTerminal),
        )
    }

    fn gate(&self, env: MapEnv) -> DebugGate<MapEnv> {
        DebugGate::with_environment(env).with_resolver(self.resolver())
    }

    fn count(&self) -> usize {
        self.stops.lock().unwrap().len()
    }

    fn take(&self) -> Vec<Stop> {
        std::mem::take(&mut *self.stops.lock().unwrap())
    }
}

/// Debugger whose sessions always fail, as when the user quits
struct Aborting;

impl Debugger for Aborting {
    fn name(&self) -> &str {
        "aborting"
    }

    fn enter_interactive(&mut self, _site: &CallSite) -> Result<(), DebuggerError> {
        Err(DebuggerError::Aborted)
    }

    fn enter_post_mortem(&mut self, _failure: &Failure) -> Result<(), DebuggerError> {
        Err(DebuggerError::Aborted)
    }
}

fn aborting_resolver() -> DebuggerResolver {
    DebuggerResolver::new(
        || Ok(Box::new(Aborting) as Box<dyn Debugger>),
        || Err(DebuggerError::NoTerminal),
    )
}

/// Resolver for breakpoints that must be skipped before any debugger is looked up
fn unreachable_resolver() -> DebuggerResolver {
    DebuggerResolver::new(
        || panic!("preferred debugger must not be resolved"),
        || panic!("fallback debugger must not be resolved"),
    )
}

#[derive(Debug)]
struct TestError(&'static str);

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TestError {}

// ============================================================================
// break_at
// ============================================================================

#[test]
fn test_simple_true_false() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    assert!(gate.break_at(true, None).unwrap());
    assert_eq!(harness.count(), 1);

    assert!(!gate.break_at(false, None).unwrap());
    assert_eq!(harness.count(), 1);
}

#[test]
fn test_debugger_lands_at_call_site() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    let line = line!() + 1;
    gate.break_at(true, Some("here")).unwrap();

    assert_eq!(
        harness.take(),
        vec![Stop::Interactive {
            line,
            id: Some("here".to_string()),
        }]
    );
}

#[test]
fn test_global_disable() {
    let harness = Harness::new();
    let mut gate = harness.gate(MapEnv::new());

    gate.disable();
    assert!(!gate.break_at(true, None).unwrap());
    assert!(!gate.break_at(true, Some("any")).unwrap());
    assert_eq!(harness.count(), 0);

    gate.enable();
    assert!(gate.break_at(true, None).unwrap());
    assert_eq!(harness.count(), 1);
}

#[test]
fn test_cipdb_env_override() {
    let harness = Harness::new();
    let mut env = MapEnv::new();

    for value in ["false", "0", "off", "FALSE", "Off"] {
        env.set(CIPDB, value);
        assert!(!harness.gate(env.clone()).break_at(true, None).unwrap());
    }
    assert_eq!(harness.count(), 0);

    env.remove(CIPDB);
    assert!(harness.gate(env).break_at(true, None).unwrap());
    assert_eq!(harness.count(), 1);
}

#[test]
fn test_cipdb_id_matching() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with(CIPDB_ID, "test-point"));

    assert!(gate.break_at(true, Some("test-point")).unwrap());
    assert!(!gate.break_at(true, Some("other-point")).unwrap());
    assert_eq!(harness.count(), 1);
}

#[test]
fn test_cipdb_ids_matching() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with(CIPDB_IDS, "validate,save,notify"));

    assert!(gate.break_at(true, Some("validate")).unwrap());
    assert!(gate.break_at(true, Some("save")).unwrap());
    assert!(!gate.break_at(true, Some("other-point")).unwrap());
    assert_eq!(harness.count(), 2);
}

#[test]
fn test_cipdb_ids_with_spaces() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with(CIPDB_IDS, "validate, save , notify"));

    assert!(gate.break_at(true, Some("save")).unwrap());
    assert!(!gate.break_at(true, Some("z")).unwrap());
}

#[test]
fn test_no_id_always_triggers() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with(CIPDB_ID, "some-id"));

    assert!(gate.break_at(true, None).unwrap());
}

#[test]
fn test_development_mode_id_breakpoints() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    assert!(gate.break_at(true, Some("any-id")).unwrap());
    assert!(gate.break_at(true, Some("another-id")).unwrap());
    assert_eq!(harness.count(), 2);
}

#[test]
fn test_env_var_condition() {
    let harness = Harness::new();

    assert!(!harness.gate(MapEnv::new()).break_at("DEBUG", None).unwrap());
    for (value, fires) in [("true", true), ("yes", true), ("nope", false)] {
        let gate = harness.gate(MapEnv::new().with("DEBUG", value));
        assert_eq!(gate.break_at("DEBUG", None).unwrap(), fires, "DEBUG={value}");
    }
}

#[test]
fn test_env_var_equality() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with("ENV", "production"));

    assert!(!gate.break_at("ENV=development", None).unwrap());
    assert!(!gate.break_at("ENV=staging", None).unwrap());
    assert!(gate.break_at("ENV=production", None).unwrap());
}

#[test]
fn test_callable_condition() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    let x = 5;
    assert!(!gate.break_at(Condition::predicate(|| x > 10), None).unwrap());

    let x = 15;
    assert!(gate.break_at(Condition::predicate(|| x > 10), None).unwrap());
}

#[test]
fn test_failing_predicates_never_propagate() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    let panicking = Condition::predicate(|| panic!("predicate bug"));
    assert!(!gate.break_at(panicking, None).unwrap());

    let erroring = Condition::fallible(|| Err::<bool, _>(TestError("lookup failed")));
    assert!(!gate.break_at(erroring, None).unwrap());
    assert_eq!(harness.count(), 0);
}

#[test]
fn test_condition_and_id_must_both_pass() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with(CIPDB_ID, "validate"));

    let errors = 3;
    assert!(!gate.break_at(errors > 5, Some("validate")).unwrap());
    assert!(gate.break_at(errors > 2, Some("validate")).unwrap());
    assert!(!gate.break_at(errors > 2, Some("save")).unwrap());
}

// ============================================================================
// Debugger resolution
// ============================================================================

#[test]
fn test_fallback_debugger_is_used() {
    let harness = Harness::new();
    let stops = harness.stops.clone();
    let resolver = DebuggerResolver::new(
        || Err(DebuggerError::NotAttached { pid: 1 }),
        move || {
            Ok(Box::new(RecordingDebugger {
                name: "fallback",
                stops: stops.clone(),
            }) as Box<dyn Debugger>)
        },
    );
    let gate = DebugGate::with_environment(MapEnv::new()).with_resolver(resolver);

    assert!(gate.break_at(true, None).unwrap());
    assert_eq!(harness.count(), 1);
}

#[test]
fn test_no_debugger_available_is_an_error() {
    let gate = DebugGate::with_environment(MapEnv::new()).with_resolver(DebuggerResolver::new(
        || Err(DebuggerError::NotAttached { pid: 1 }),
        || Err(DebuggerError::NoTerminal),
    ));

    assert!(matches!(
        gate.break_at(true, None),
        Err(CipdbError::NoDebugger { .. })
    ));
    // skipped breakpoints never touch the resolver
    assert!(!gate.break_at(false, None).unwrap());
}

#[test]
fn test_session_errors_propagate() {
    let gate = DebugGate::with_environment(MapEnv::new()).with_resolver(aborting_resolver());

    match gate.break_at(true, None) {
        Err(CipdbError::Session { name, source }) => {
            assert_eq!(name, "aborting");
            assert!(matches!(source, DebuggerError::Aborted));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

// ============================================================================
// break_on_exception
// ============================================================================

#[test]
fn test_post_mortem_with_explicit_failure() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());
    let failure = Failure::from_error(&TestError("test"));

    assert!(gate.break_on_exception(Some(&failure), true, None).unwrap());
    assert!(!gate.break_on_exception(Some(&failure), false, None).unwrap());
    assert_eq!(
        harness.take(),
        vec![Stop::PostMortem {
            message: "test".to_string()
        }]
    );
}

#[test]
fn test_post_mortem_with_id() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new().with(CIPDB_ID, "error-handler"));
    let failure = Failure::new("test");

    assert!(gate
        .break_on_exception(Some(&failure), true, Some("error-handler"))
        .unwrap());
    assert!(!gate
        .break_on_exception(Some(&failure), true, Some("other-handler"))
        .unwrap());
    assert_eq!(harness.count(), 1);
}

#[test]
fn test_post_mortem_without_failure_is_a_no_op() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    assert!(!gate.break_on_exception(None, true, None).unwrap());
    assert_eq!(harness.count(), 0);
}

#[test]
fn test_post_mortem_uses_handled_panic() {
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    let values: Vec<u32> = Vec::new();
    let failure = context::catch(|| values[3]).unwrap_err();
    assert!(failure.location.is_some());

    let fired = context::handling(&failure, || gate.break_on_exception(None, true, None));
    assert!(fired.unwrap());
    match harness.take().as_slice() {
        [Stop::PostMortem { message }] => assert!(message.contains("index out of bounds")),
        other => panic!("unexpected stops: {other:?}"),
    }

    // the failure is current only while its handler runs
    assert!(!gate.break_on_exception(None, true, None).unwrap());
    assert_eq!(harness.count(), 0);
}

#[test]
fn test_panic_recovered_earlier_does_not_fire() {
    cipdb::install_panic_hook();
    let harness = Harness::new();
    let gate = harness.gate(MapEnv::new());

    assert!(std::panic::catch_unwind(|| panic!("old handled panic")).is_err());
    assert!(context::catch(|| panic!("also handled")).is_err());

    assert!(!gate.break_on_exception(None, true, None).unwrap());
    assert!(harness.take().is_empty());
}

#[test]
fn test_skipped_post_mortem_keeps_handled_failure() {
    let gate = DebugGate::with_environment(MapEnv::new().with(CIPDB_ID, "error-handler"))
        .with_resolver(unreachable_resolver());
    let failure = Failure::new("pending");

    context::handling(&failure, || {
        assert!(!gate.break_on_exception(None, false, None).unwrap());
        assert!(!gate
            .break_on_exception(None, true, Some("other-handler"))
            .unwrap());
        assert_eq!(context::current_failure(), Some(failure.clone()));
    });
}

#[test]
fn test_handled_failure_ends_with_handler_after_session_error() {
    let gate = DebugGate::with_environment(MapEnv::new()).with_resolver(aborting_resolver());
    let failure = Failure::new("pending");

    context::handling(&failure, || {
        match gate.break_on_exception(None, true, None) {
            Err(CipdbError::Session { name, source }) => {
                assert_eq!(name, "aborting");
                assert!(matches!(source, DebuggerError::Aborted));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(context::current_failure(), Some(failure.clone()));
    });

    assert!(context::current_failure().is_none());
    assert!(!gate.break_on_exception(None, true, None).unwrap());
}
