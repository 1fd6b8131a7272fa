// SPDX-License-Identifier: MIT

//! Interactive debugger back ends
//!
//! The gate only decides *whether* to stop. Stopping is delegated to a
//! [`Debugger`], resolved fresh on every stop by a [`DebuggerResolver`]:
//! the preferred back end is tried first and the fallback is used when
//! it cannot be resolved.

pub mod console;
pub mod native;

pub use console::ConsoleDebugger;
pub use native::NativeDebugger;

use crate::context::{CallSite, Failure};
use crate::error::{CipdbError, DebuggerError};

/// An interactive debugging session provider
pub trait Debugger {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Stop at a live call site
    fn enter_interactive(&mut self, site: &CallSite) -> Result<(), DebuggerError>;

    /// Inspect a failure after the fact
    fn enter_post_mortem(&mut self, failure: &Failure) -> Result<(), DebuggerError>;
}

/// Resolves a debugger, or explains why it is unavailable
pub type DebuggerFactory =
    Box<dyn Fn() -> Result<Box<dyn Debugger>, DebuggerError> + Send + Sync>;

/// Preferred/fallback debugger selection
pub struct DebuggerResolver {
    preferred: DebuggerFactory,
    fallback: DebuggerFactory,
}

impl DebuggerResolver {
    pub fn new<P, F>(preferred: P, fallback: F) -> Self
    where
        P: Fn() -> Result<Box<dyn Debugger>, DebuggerError> + Send + Sync + 'static,
        F: Fn() -> Result<Box<dyn Debugger>, DebuggerError> + Send + Sync + 'static,
    {
        Self {
            preferred: Box::new(preferred),
            fallback: Box::new(fallback),
        }
    }

    /// Try the preferred debugger, then the fallback
    pub fn resolve(&self) -> Result<Box<dyn Debugger>, CipdbError> {
        let preferred = match (self.preferred)() {
            Ok(debugger) => return Ok(debugger),
            Err(err) => err,
        };
        log::debug!("Preferred debugger unavailable: {}", preferred);

        match (self.fallback)() {
            Ok(debugger) => {
                log::info!("Falling back to {} debugger", debugger.name());
                Ok(debugger)
            }
            Err(fallback) => Err(CipdbError::NoDebugger {
                preferred,
                fallback,
            }),
        }
    }
}

/// Native tracer first, console session second
impl Default for DebuggerResolver {
    fn default() -> Self {
        Self::new(
            || NativeDebugger::attached().map(|d| Box::new(d) as Box<dyn Debugger>),
            || ConsoleDebugger::stdio().map(|d| Box::new(d) as Box<dyn Debugger>),
        )
    }
}
