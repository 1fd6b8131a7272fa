// SPDX-License-Identifier: MIT

//! Breakpoint entry points
//!
//! [`DebugGate`] ties the decision policy to a debugger. The free functions
//! at the bottom of this module drive a gate built from the process
//! environment and one process-wide enable switch.

use crate::condition::Condition;
use crate::context::{self, CallSite, Failure};
use crate::debugger::DebuggerResolver;
use crate::env::{Environment, ProcessEnv};
use crate::error::CipdbError;
use crate::evaluator::{ConditionEvaluator, GateConfig, Verdict};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct DebugGate<E = ProcessEnv> {
    config: GateConfig,
    evaluator: ConditionEvaluator<E>,
    resolver: DebuggerResolver,
}

impl DebugGate<ProcessEnv> {
    pub fn new() -> Self {
        Self::with_environment(ProcessEnv)
    }
}

impl Default for DebugGate<ProcessEnv> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> DebugGate<E> {
    pub fn with_environment(env: E) -> Self {
        Self {
            config: GateConfig::default(),
            evaluator: ConditionEvaluator::new(env),
            resolver: DebuggerResolver::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: DebuggerResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> GateConfig {
        self.config
    }

    pub fn environment(&self) -> &E {
        self.evaluator.environment()
    }

    pub fn enable(&mut self) {
        self.config.enabled = true;
    }

    pub fn disable(&mut self) {
        self.config.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Decide without entering a debugger
    pub fn should_break(&self, condition: &Condition<'_>, id: Option<&str>) -> bool {
        self.evaluator.decide(&self.config, condition, id)
    }

    fn verdict(&self, condition: &Condition<'_>, id: Option<&str>) -> Verdict {
        self.evaluator.explain(&self.config, condition, id)
    }

    /// Stop at the caller's location when the breakpoint fires
    ///
    /// Returns `Ok(true)` when a debugger session was entered.
    #[track_caller]
    pub fn break_at<'a>(
        &self,
        condition: impl Into<Condition<'a>>,
        id: Option<&str>,
    ) -> Result<bool, CipdbError> {
        let site = CallSite::caller(id);
        let verdict = self.verdict(&condition.into(), id);
        if !verdict.fires() {
            log::debug!("Breakpoint at {} skipped: {}", site, verdict);
            return Ok(false);
        }

        let mut debugger = self.resolver.resolve()?;
        log::info!("Entering {} debugger at {}", debugger.name(), site);
        debugger
            .enter_interactive(&site)
            .map_err(|err| CipdbError::session(debugger.name(), err))?;
        Ok(true)
    }

    /// Inspect `failure` post-mortem when the breakpoint fires
    ///
    /// Without an explicit failure, the one being handled on this thread
    /// (see [`context::handling`]) is used. With neither this is a no-op.
    pub fn break_on_exception<'a>(
        &self,
        failure: Option<&Failure>,
        condition: impl Into<Condition<'a>>,
        id: Option<&str>,
    ) -> Result<bool, CipdbError> {
        let verdict = self.verdict(&condition.into(), id);
        if !verdict.fires() {
            log::debug!("Post-mortem breakpoint skipped: {}", verdict);
            return Ok(false);
        }

        let handled = match failure {
            Some(_) => None,
            None => context::current_failure(),
        };
        let Some(failure) = failure.or(handled.as_ref()) else {
            log::debug!("Post-mortem breakpoint has no failure to inspect");
            return Ok(false);
        };

        let mut debugger = self.resolver.resolve()?;
        log::info!("Entering {} debugger post-mortem", debugger.name());
        debugger
            .enter_post_mortem(failure)
            .map_err(|err| CipdbError::session(debugger.name(), err))?;
        Ok(true)
    }
}

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn every breakpoint driven by the free functions back on
pub fn enable() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Turn off every breakpoint driven by the free functions
pub fn disable() {
    ENABLED.store(false, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

fn process_gate() -> DebugGate {
    DebugGate::new().with_config(GateConfig {
        enabled: is_enabled(),
    })
}

/// Conditional breakpoint against the process environment
///
/// ```no_run
/// let retries = 7;
/// cipdb::break_at(retries > 5, Some("retry-loop"))?;
/// cipdb::break_at("DEBUG", None)?;
/// cipdb::break_at(cipdb::Condition::predicate(|| retries % 2 == 1), None)?;
/// # Ok::<(), cipdb::CipdbError>(())
/// ```
#[track_caller]
pub fn break_at<'a>(
    condition: impl Into<Condition<'a>>,
    id: Option<&str>,
) -> Result<bool, CipdbError> {
    process_gate().break_at(condition, id)
}

/// Conditional post-mortem against the process environment
pub fn break_on_exception<'a>(
    failure: Option<&Failure>,
    condition: impl Into<Condition<'a>>,
    id: Option<&str>,
) -> Result<bool, CipdbError> {
    process_gate().break_on_exception(failure, condition, id)
}
