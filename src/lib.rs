// SPDX-License-Identifier: MIT

//! Conditional breakpoints that stay in the source
//!
//! A breakpoint fires only when the gate is enabled, `CIPDB` does not
//! switch it off, its identifier is selected (when `CIPDB_ID` or
//! `CIPDB_IDS` is set), and its condition holds. A firing breakpoint
//! hands off to a native debugger tracing the process, or to a console
//! session when none is attached.
//!
//! ```no_run
//! fn validate(batch: &[u32]) -> Result<(), cipdb::CipdbError> {
//!     cipdb::break_at(batch.is_empty(), Some("validate"))?;
//!     cipdb::break_at("ENV=staging", None)?;
//!     Ok(())
//! }
//! ```

pub mod condition;
pub mod context;
pub mod debugger;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod launcher;

pub use condition::{Condition, EnvCondition};
pub use context::{install_panic_hook, CallSite, Failure};
pub use debugger::{Debugger, DebuggerResolver};
pub use env::{Environment, MapEnv, ProcessEnv};
pub use error::{CipdbError, DebuggerError};
pub use evaluator::{ConditionEvaluator, GateConfig, Verdict};
pub use gate::{break_at, break_on_exception, disable, enable, is_enabled, DebugGate};
