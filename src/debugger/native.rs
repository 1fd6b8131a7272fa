// SPDX-License-Identifier: MIT

//! Native debugger (gdb, lldb) already tracing this process
//!
//! Resolution succeeds only when a tracer is attached. Entering a session
//! raises `SIGTRAP`, which the tracer reports as a stop inside the gate;
//! step out once to reach the breakpoint's call site.

use crate::context::{CallSite, Failure};
use crate::debugger::Debugger;
use crate::error::DebuggerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDebugger {
    tracer_pid: u32,
}

impl NativeDebugger {
    /// Resolve the debugger tracing this process
    pub fn attached() -> Result<Self, DebuggerError> {
        match tracer_pid()? {
            0 => Err(DebuggerError::NotAttached {
                pid: std::process::id(),
            }),
            tracer_pid => Ok(Self { tracer_pid }),
        }
    }

    pub fn tracer_pid(&self) -> u32 {
        self.tracer_pid
    }
}

impl Debugger for NativeDebugger {
    fn name(&self) -> &str {
        "native"
    }

    fn enter_interactive(&mut self, site: &CallSite) -> Result<(), DebuggerError> {
        log::info!("Breakpoint at {} (tracer pid {})", site, self.tracer_pid);
        trap()
    }

    fn enter_post_mortem(&mut self, failure: &Failure) -> Result<(), DebuggerError> {
        log::warn!("Post-mortem stop (tracer pid {}): {}", self.tracer_pid, failure);
        trap()
    }
}

#[cfg(target_os = "linux")]
fn tracer_pid() -> Result<u32, DebuggerError> {
    let status = std::fs::read_to_string("/proc/self/status")?;
    Ok(parse_tracer_pid(&status).unwrap_or(0))
}

#[cfg(not(target_os = "linux"))]
fn tracer_pid() -> Result<u32, DebuggerError> {
    Err(DebuggerError::Unsupported("tracer detection".to_string()))
}

/// Extract `TracerPid` from `/proc/<pid>/status` contents
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(unix)]
fn trap() -> Result<(), DebuggerError> {
    let result = unsafe { libc::raise(libc::SIGTRAP) };
    if result != 0 {
        return Err(DebuggerError::Signal(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn trap() -> Result<(), DebuggerError> {
    Err(DebuggerError::Unsupported("SIGTRAP".to_string()))
}
