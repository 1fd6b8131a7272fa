// SPDX-License-Identifier: MIT

//! Breakpoint conditions
//!
//! A condition is the last stage of a breakpoint decision. It can be:
//! - a plain `bool`
//! - a string over environment variables (`DEBUG`, `ENV=production`)
//! - a closure returning `bool`
//! - a closure returning `Result<bool, _>`
//!
//! Evaluation never fails: a closure that panics or returns `Err`
//! counts as `false`.

mod expr;

pub use expr::EnvCondition;

use crate::context::catch_quietly;
use crate::env::Environment;
use std::error::Error;
use std::fmt;

/// Error type accepted from fallible predicates
pub type PredicateError = Box<dyn Error + Send + Sync>;

/// Condition attached to a breakpoint
pub enum Condition<'a> {
    Bool(bool),
    Env(EnvCondition),
    Predicate(Box<dyn Fn() -> bool + 'a>),
    Fallible(Box<dyn Fn() -> Result<bool, PredicateError> + 'a>),
}

impl<'a> Condition<'a> {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn() -> bool + 'a,
    {
        Condition::Predicate(Box::new(f))
    }

    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn() -> Result<bool, E> + 'a,
        E: Into<PredicateError> + 'a,
    {
        Condition::Fallible(Box::new(move || f().map_err(Into::into)))
    }

    pub fn env(expr: &str) -> Self {
        Condition::Env(EnvCondition::parse(expr))
    }

    /// Evaluate against `env`; panics and errors from closures yield `false`
    pub fn evaluate<E: Environment + ?Sized>(&self, env: &E) -> bool {
        match self {
            Condition::Bool(value) => *value,
            Condition::Env(cond) => cond.evaluate(env),
            Condition::Predicate(f) => match catch_quietly(|| f()) {
                Ok(value) => value,
                Err(message) => {
                    log::debug!("Breakpoint predicate panicked: {}", message);
                    false
                }
            },
            Condition::Fallible(f) => match catch_quietly(|| f()) {
                Ok(Ok(value)) => value,
                Ok(Err(err)) => {
                    log::debug!("Breakpoint predicate failed: {}", err);
                    false
                }
                Err(message) => {
                    log::debug!("Breakpoint predicate panicked: {}", message);
                    false
                }
            },
        }
    }
}

impl Default for Condition<'_> {
    fn default() -> Self {
        Condition::Bool(true)
    }
}

impl fmt::Debug for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Condition::Env(cond) => f.debug_tuple("Env").field(cond).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
            Condition::Fallible(_) => f.write_str("Fallible(..)"),
        }
    }
}

impl From<bool> for Condition<'_> {
    fn from(value: bool) -> Self {
        Condition::Bool(value)
    }
}

impl From<&str> for Condition<'_> {
    fn from(expr: &str) -> Self {
        Condition::env(expr)
    }
}

impl From<String> for Condition<'_> {
    fn from(expr: String) -> Self {
        Condition::env(&expr)
    }
}

impl From<EnvCondition> for Condition<'_> {
    fn from(cond: EnvCondition) -> Self {
        Condition::Env(cond)
    }
}
