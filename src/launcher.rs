// SPDX-License-Identifier: MIT

//! Support for the `cipdb` launcher binary
//!
//! The launcher does not debug anything itself. It turns command-line
//! flags into environment variables for the target program, which then
//! makes its own breakpoint decisions.

use crate::env::{self, Environment, IdSelection, Mode, CIPDB, CIPDB_ID, CIPDB_IDS};
use crate::error::CipdbError;
use crate::evaluator::GateConfig;
use serde::Serialize;
use std::io::{self, Write};
use std::process::Command;

/// Variables shown by `cipdb --status`
const STATUS_VARS: [&str; 4] = [CIPDB, CIPDB_ID, CIPDB_IDS, "DEBUG"];

const USAGE_EXAMPLES: [&str; 5] = [
    "cipdb ./target/debug/app",
    "cipdb --id validate ./target/debug/app",
    "cipdb --ids validate,save ./target/debug/app",
    "cipdb --env DEBUG=true ./target/debug/app",
    "CIPDB_ID=batch-2 cipdb ./target/debug/app",
];

/// Parse `KEY=VALUE`; a bare `KEY` means `KEY=true`
pub fn parse_assignment(assignment: &str) -> (String, String) {
    match assignment.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => (assignment.to_string(), "true".to_string()),
    }
}

/// Launcher flags that affect the target's environment
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub id: Option<String>,
    pub ids: Option<String>,
    pub env: Vec<String>,
    pub disable: bool,
    pub enable: bool,
}

/// Environment changes for the target program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPlan {
    set: Vec<(String, String)>,
    unset: Vec<String>,
}

impl EnvPlan {
    /// `--env` first, then `--id`/`--ids`, then `--disable` or `--enable`
    pub fn from_options(options: &LaunchOptions) -> Self {
        let mut plan = Self::default();
        for assignment in &options.env {
            let (key, value) = parse_assignment(assignment);
            plan.set(key, value);
        }
        if let Some(id) = options.id.as_deref().filter(|id| !id.is_empty()) {
            plan.set(CIPDB_ID, id);
        }
        if let Some(ids) = options.ids.as_deref().filter(|ids| !ids.is_empty()) {
            plan.set(CIPDB_IDS, ids);
        }
        if options.disable {
            plan.set(CIPDB, "off");
        } else if options.enable {
            plan.unset(CIPDB);
        }
        plan
    }

    /// Later assignments to the same name win
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.unset.retain(|n| *n != name);
        self.set.retain(|(n, _)| *n != name);
        self.set.push((name, value.into()));
    }

    pub fn unset(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.set.retain(|(n, _)| *n != name);
        if !self.unset.contains(&name) {
            self.unset.push(name);
        }
    }

    pub fn assignments(&self) -> &[(String, String)] {
        &self.set
    }

    pub fn removals(&self) -> &[String] {
        &self.unset
    }

    pub fn apply(&self, command: &mut Command) {
        for name in &self.unset {
            command.env_remove(name);
        }
        command.envs(self.set.iter().map(|(k, v)| (k, v)));
    }

    /// View `base` as the target program will see it
    pub fn overlay<E: Environment>(&self, base: E) -> Overlay<'_, E> {
        Overlay { plan: self, base }
    }
}

/// An environment with an [`EnvPlan`] applied on top
pub struct Overlay<'a, E> {
    plan: &'a EnvPlan,
    base: E,
}

impl<E: Environment> Environment for Overlay<'_, E> {
    fn var(&self, name: &str) -> Option<String> {
        if self.plan.unset.iter().any(|n| n == name) {
            return None;
        }
        match self.plan.set.iter().rev().find(|(n, _)| n == name) {
            Some((_, value)) => Some(value.clone()),
            None => self.base.var(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarStatus {
    pub name: String,
    pub value: Option<String>,
}

/// What `cipdb --status` reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Gate switch and `CIPDB` override combined
    pub enabled: bool,
    pub mode: Mode,
    pub selected_ids: Vec<String>,
    pub variables: Vec<VarStatus>,
}

impl StatusReport {
    pub fn collect<E: Environment + ?Sized>(env: &E, config: GateConfig) -> Self {
        let overridden = env.var(CIPDB).is_some_and(|value| env::is_disabling(&value));
        let selection = IdSelection::from_env(env);
        Self {
            enabled: config.enabled && !overridden,
            mode: selection.mode(),
            selected_ids: selection.ids(),
            variables: STATUS_VARS
                .iter()
                .map(|name| VarStatus {
                    name: name.to_string(),
                    value: env.var(name),
                })
                .collect(),
        }
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "cipdb Status")?;
        writeln!(out, "{}", "=".repeat(40))?;
        writeln!(out, "Global enabled: {}", self.enabled)?;
        writeln!(out, "Mode: {}", self.mode)?;
        if self.selected_ids.is_empty() {
            writeln!(out, "Selected IDs: <all>")?;
        } else {
            writeln!(out, "Selected IDs: {}", self.selected_ids.join(", "))?;
        }

        writeln!(out, "\nEnvironment Variables:")?;
        for var in &self.variables {
            writeln!(
                out,
                "  {}: {}",
                var.name,
                var.value.as_deref().unwrap_or("<not set>")
            )?;
        }

        writeln!(out, "\nUsage Examples:")?;
        for example in USAGE_EXAMPLES {
            writeln!(out, "  {example}")?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CipdbError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the command for the target program
pub fn command(program: &str, args: &[String], plan: &EnvPlan) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    plan.apply(&mut command);
    command
}

/// Replace this process with the target program
///
/// Only returns on failure.
#[cfg(unix)]
pub fn launch(program: &str, args: &[String], plan: &EnvPlan) -> Result<i32, CipdbError> {
    use std::os::unix::process::CommandExt;

    log::debug!("Executing {} {:?}", program, args);
    let err = command(program, args, plan).exec();
    Err(CipdbError::launch(program, err))
}

/// Run the target program and return its exit code
#[cfg(not(unix))]
pub fn launch(program: &str, args: &[String], plan: &EnvPlan) -> Result<i32, CipdbError> {
    log::debug!("Running {} {:?}", program, args);
    let status = command(program, args, plan)
        .status()
        .map_err(|err| CipdbError::launch(program, err))?;
    Ok(status.code().unwrap_or(1))
}
