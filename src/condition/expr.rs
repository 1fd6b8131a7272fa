// SPDX-License-Identifier: MIT

//! String conditions over environment variables
//!
//! Two forms, told apart by the first `=`:
//! - `NAME=value` holds when `NAME` is set to exactly `value`
//! - `NAME` holds when `NAME` is truthy (`true`, `1`, `yes`, `on`)
//!
//! There is no escaping: everything after the first `=` is the value.

use crate::env::{self, Environment};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A parsed string condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvCondition {
    /// `name=expected`, case-sensitive, no trimming
    Equals { name: String, expected: String },
    /// bare variable name checked for truthiness
    Truthy(String),
}

impl EnvCondition {
    /// Parsing never fails; odd input (`=x`, `A=`) just rarely holds
    pub fn parse(expr: &str) -> Self {
        match expr.split_once('=') {
            Some((name, expected)) => EnvCondition::Equals {
                name: name.to_string(),
                expected: expected.to_string(),
            },
            None => EnvCondition::Truthy(expr.to_string()),
        }
    }

    /// The variable this condition reads
    pub fn name(&self) -> &str {
        match self {
            EnvCondition::Equals { name, .. } => name,
            EnvCondition::Truthy(name) => name,
        }
    }

    pub fn evaluate<E: Environment + ?Sized>(&self, env: &E) -> bool {
        match self {
            EnvCondition::Equals { name, expected } => {
                env.var(name).is_some_and(|value| value == *expected)
            }
            EnvCondition::Truthy(name) => env.var(name).is_some_and(|value| env::is_truthy(&value)),
        }
    }
}

impl FromStr for EnvCondition {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for EnvCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvCondition::Equals { name, expected } => write!(f, "{name}={expected}"),
            EnvCondition::Truthy(name) => write!(f, "{name}"),
        }
    }
}
