// SPDX-License-Identifier: MIT

//! Environment access for breakpoint decisions
//!
//! Decisions read a handful of string variables. The [`Environment`] trait
//! lets callers hand in a fixed snapshot ([`MapEnv`]) instead of the
//! process environment ([`ProcessEnv`]).

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Master override; `false`, `0` or `off` (any case) disables every breakpoint
pub const CIPDB: &str = "CIPDB";

/// Single active breakpoint identifier
pub const CIPDB_ID: &str = "CIPDB_ID";

/// Comma-separated active breakpoint identifiers
pub const CIPDB_IDS: &str = "CIPDB_IDS";

const DISABLING_VALUES: [&str; 3] = ["false", "0", "off"];
const TRUTHY_VALUES: [&str; 4] = ["true", "1", "yes", "on"];

/// Read-only key-value view used at decision time
pub trait Environment {
    /// Returns the value of `name`, or `None` when unset
    fn var(&self, name: &str) -> Option<String>;
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// The real process environment
///
/// Variables holding non-UTF-8 data read as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// In-memory environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MapEnv::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Environment for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Whether a `CIPDB` value switches breakpoints off
pub fn is_disabling(value: &str) -> bool {
    DISABLING_VALUES.contains(&value.to_lowercase().as_str())
}

/// Whether a variable value counts as "on" for a bare-name condition
pub fn is_truthy(value: &str) -> bool {
    TRUTHY_VALUES.contains(&value.to_lowercase().as_str())
}

/// Identifier filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No identifier is selected; every identified breakpoint is eligible
    Development,
    /// `CIPDB_ID` or `CIPDB_IDS` is set; identifiers must match
    Production,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// Active identifiers read from `CIPDB_ID` and `CIPDB_IDS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSelection {
    single: Option<String>,
    list: Vec<String>,
}

impl IdSelection {
    /// Empty variables count as unset. List entries are trimmed.
    pub fn from_env<E: Environment + ?Sized>(env: &E) -> Self {
        let single = env.var(CIPDB_ID).filter(|v| !v.is_empty());
        let list = env
            .var(CIPDB_IDS)
            .filter(|v| !v.is_empty())
            .map(|v| v.split(',').map(|id| id.trim().to_string()).collect())
            .unwrap_or_default();
        Self { single, list }
    }

    pub fn mode(&self) -> Mode {
        if self.single.is_some() || !self.list.is_empty() {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    /// Exact match against `CIPDB_ID` or any `CIPDB_IDS` entry
    pub fn matches(&self, id: &str) -> bool {
        self.single.as_deref() == Some(id) || self.list.iter().any(|entry| entry == id)
    }

    /// All selected identifiers, single one first
    pub fn ids(&self) -> Vec<String> {
        self.single
            .iter()
            .chain(self.list.iter())
            .filter(|id| !id.is_empty())
            .cloned()
            .collect()
    }
}
