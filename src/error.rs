// SPDX-License-Identifier: MIT

//! Typed error handling for cipdb
//!
//! Breakpoint decisions never fail. Errors only come from resolving or
//! running a debugger session, and from the launcher binary.

use thiserror::Error;

/// Top-level error type for cipdb
#[derive(Debug, Error)]
pub enum CipdbError {
    /// Neither the preferred nor the fallback debugger could be resolved
    #[error("No debugger available (preferred: {preferred}; fallback: {fallback})")]
    NoDebugger {
        preferred: DebuggerError,
        fallback: DebuggerError,
    },

    /// A debugger was resolved but the session itself failed
    #[error("Debugger '{name}' failed: {source}")]
    Session {
        name: String,
        #[source]
        source: DebuggerError,
    },

    /// Launcher could not find the target program
    #[error("program '{0}' not found")]
    ProgramNotFound(String),

    /// Launcher failed to start the target program
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization errors (status reports)
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Debugger resolution and session errors
#[derive(Debug, Error)]
pub enum DebuggerError {
    /// Capability not available on this platform
    #[error("{0} is not supported on this platform")]
    Unsupported(String),

    /// No native debugger is tracing the process
    #[error("No debugger is attached to process {pid}")]
    NotAttached { pid: u32 },

    /// Console sessions need an interactive terminal
    #[error("Standard input is not a terminal")]
    NoTerminal,

    /// Raising the breakpoint signal failed
    #[error("Failed to raise SIGTRAP: {0}")]
    Signal(std::io::Error),

    /// The user quit the session
    #[error("Debugging session aborted")]
    Aborted,

    /// I/O errors while talking to the terminal
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CipdbError {
    /// Create a session error for the named debugger
    pub fn session(name: impl Into<String>, source: DebuggerError) -> Self {
        Self::Session {
            name: name.into(),
            source,
        }
    }

    /// Map a spawn/exec failure to a launcher error
    pub fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        let program = program.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::ProgramNotFound(program)
        } else {
            Self::Launch { program, source }
        }
    }
}
