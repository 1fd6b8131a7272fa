// SPDX-License-Identifier: MIT

//! Breakpoint decision policy
//!
//! A breakpoint fires only when every stage passes. Stages run in this
//! order and the first failing one ends the evaluation:
//! 1. the gate's `enabled` switch
//! 2. the `CIPDB` override variable
//! 3. identifier selection via `CIPDB_ID` / `CIPDB_IDS` (identified breakpoints only)
//! 4. the breakpoint's own [`Condition`]

use crate::condition::Condition;
use crate::env::{self, Environment, IdSelection, Mode};
use std::fmt;

/// Gate configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub enabled: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Which stage settled a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fire,
    /// Gate switched off with `disable()`
    Disabled,
    /// `CIPDB` holds a disabling value
    Overridden,
    /// Production mode and the identifier is not selected
    NotSelected,
    ConditionFalse,
}

impl Verdict {
    pub fn fires(self) -> bool {
        self == Verdict::Fire
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Fire => write!(f, "fire"),
            Verdict::Disabled => write!(f, "globally disabled"),
            Verdict::Overridden => write!(f, "disabled by {}", env::CIPDB),
            Verdict::NotSelected => write!(f, "identifier not selected"),
            Verdict::ConditionFalse => write!(f, "condition false"),
        }
    }
}

/// Evaluates breakpoint decisions against an environment
#[derive(Debug, Clone, Default)]
pub struct ConditionEvaluator<E> {
    env: E,
}

impl<E: Environment> ConditionEvaluator<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Should a breakpoint with `condition` and `id` stop here?
    pub fn decide(&self, config: &GateConfig, condition: &Condition<'_>, id: Option<&str>) -> bool {
        self.explain(config, condition, id).fires()
    }

    /// Like [`decide`](Self::decide), but reports the deciding stage
    pub fn explain(
        &self,
        config: &GateConfig,
        condition: &Condition<'_>,
        id: Option<&str>,
    ) -> Verdict {
        if !config.enabled {
            return Verdict::Disabled;
        }

        if self
            .env
            .var(env::CIPDB)
            .is_some_and(|value| env::is_disabling(&value))
        {
            return Verdict::Overridden;
        }

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            let selection = IdSelection::from_env(&self.env);
            if selection.mode() == Mode::Production && !selection.matches(id) {
                return Verdict::NotSelected;
            }
        }

        if condition.evaluate(&self.env) {
            Verdict::Fire
        } else {
            Verdict::ConditionFalse
        }
    }
}
