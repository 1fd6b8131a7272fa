// SPDX-License-Identifier: MIT

//! Line-oriented debugger on the terminal
//!
//! Used when no native debugger is attached. It cannot step or inspect
//! locals, but it pauses the program at the breakpoint and can show where
//! it stopped.

use crate::context::{CallSite, Failure, SourceLocation};
use crate::debugger::Debugger;
use crate::error::DebuggerError;
use std::backtrace::Backtrace;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Stderr, StdinLock, Write};

const PROMPT: &str = "(cipdb) ";
const CONTEXT_LINES: u32 = 5;

const HELP: &str = "\
Commands:
  c, cont, continue   resume the program
  q, quit             abort the session
  w, where, bt        print a backtrace
  l, list             show source around the stop
  p, env NAME         print an environment variable
  h, help             show this help";

pub struct ConsoleDebugger<R, W> {
    input: R,
    output: W,
}

impl ConsoleDebugger<StdinLock<'static>, Stderr> {
    /// Resolve a session on stdin/stderr; stdin must be a terminal
    pub fn stdio() -> Result<Self, DebuggerError> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Err(DebuggerError::NoTerminal);
        }
        Ok(Self::new(stdin.lock(), io::stderr()))
    }
}

impl<R: BufRead, W: Write> ConsoleDebugger<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn run(&mut self, stop: Stop<'_>) -> Result<(), DebuggerError> {
        match stop {
            Stop::Live(site) => writeln!(self.output, "> {site}")?,
            Stop::PostMortem(failure) => {
                writeln!(self.output, "*** Post-mortem: {failure}")?;
                if let Some(thread) = &failure.thread {
                    writeln!(self.output, "*** Thread: {thread}")?;
                }
            }
        }

        loop {
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(());
            }

            match Command::parse(&line) {
                Command::Continue => return Ok(()),
                Command::Quit => return Err(DebuggerError::Aborted),
                Command::Where => match stop.backtrace() {
                    Some(backtrace) => writeln!(self.output, "{backtrace}")?,
                    None => writeln!(
                        self.output,
                        "*** No backtrace recorded (run with RUST_BACKTRACE=1)"
                    )?,
                },
                Command::List => match stop.location() {
                    Some(location) => self.list(location)?,
                    None => writeln!(self.output, "*** No source location")?,
                },
                Command::Print(Some(name)) => match std::env::var(&name) {
                    Ok(value) => writeln!(self.output, "{name}={value}")?,
                    Err(_) => writeln!(self.output, "{name} is not set")?,
                },
                Command::Print(None) => writeln!(self.output, "*** Usage: p NAME")?,
                Command::Help => writeln!(self.output, "{HELP}")?,
                Command::Empty => {}
                Command::Unknown(cmd) => writeln!(
                    self.output,
                    "*** Unknown command: {cmd}. Type 'h' for help."
                )?,
            }
        }
    }

    fn list(&mut self, location: &SourceLocation) -> Result<(), DebuggerError> {
        let source = match fs::read_to_string(&location.file) {
            Ok(source) => source,
            Err(err) => {
                writeln!(self.output, "*** Source not available: {}: {err}", location.file)?;
                return Ok(());
            }
        };

        let first = location.line.saturating_sub(CONTEXT_LINES).max(1);
        let last = location.line.saturating_add(CONTEXT_LINES);
        for (number, text) in (1u32..).zip(source.lines()) {
            if number < first {
                continue;
            }
            if number > last {
                break;
            }
            let marker = if number == location.line { "->" } else { "  " };
            writeln!(self.output, "{number:>5} {marker} {text}")?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Debugger for ConsoleDebugger<R, W> {
    fn name(&self) -> &str {
        "console"
    }

    fn enter_interactive(&mut self, site: &CallSite) -> Result<(), DebuggerError> {
        self.run(Stop::Live(site))
    }

    fn enter_post_mortem(&mut self, failure: &Failure) -> Result<(), DebuggerError> {
        self.run(Stop::PostMortem(failure))
    }
}

#[derive(Clone, Copy)]
enum Stop<'a> {
    Live(&'a CallSite),
    PostMortem(&'a Failure),
}

impl Stop<'_> {
    fn location(&self) -> Option<&SourceLocation> {
        match self {
            Stop::Live(site) => Some(&site.location),
            Stop::PostMortem(failure) => failure.location.as_ref(),
        }
    }

    fn backtrace(&self) -> Option<String> {
        match self {
            Stop::Live(_) => Some(Backtrace::force_capture().to_string()),
            Stop::PostMortem(failure) => failure.backtrace.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Continue,
    Quit,
    Where,
    List,
    Print(Option<String>),
    Help,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Command::Empty;
        };
        match head {
            "c" | "cont" | "continue" => Command::Continue,
            "q" | "quit" => Command::Quit,
            "w" | "where" | "bt" => Command::Where,
            "l" | "list" => Command::List,
            "p" | "env" => Command::Print(words.next().map(str::to_string)),
            "h" | "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}
