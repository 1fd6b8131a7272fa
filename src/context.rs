// SPDX-License-Identifier: MIT

//! Execution contexts handed to a debugger
//!
//! - [`CallSite`]: where a live breakpoint was hit
//! - [`Failure`]: an error or panic to inspect post-mortem
//!
//! [`catch`] turns a panic into a [`Failure`], and [`handling`] makes a
//! failure current while its handler runs, so `break_on_exception` can
//! find it there without being passed one.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location, PanicHookInfo};
use std::sync::Once;

/// File position captured from [`std::panic::Location`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A breakpoint call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub location: SourceLocation,
    pub id: Option<String>,
}

impl CallSite {
    /// The location of the nearest caller not marked `#[track_caller]`
    #[track_caller]
    pub fn caller(id: Option<&str>) -> Self {
        Self {
            location: Location::caller().into(),
            id: id.filter(|id| !id.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} [{}]", self.location, id),
            None => write!(f, "{}", self.location),
        }
    }
}

/// Post-mortem context: an error chain or a panic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    /// `source()` chain, outermost first
    pub causes: Vec<String>,
    pub location: Option<SourceLocation>,
    /// Rendered backtrace, when one was captured
    pub backtrace: Option<String>,
    pub thread: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
            location: None,
            backtrace: None,
            thread: std::thread::current().name().map(str::to_string),
        }
    }

    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut failure = Self::new(err.to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            failure.causes.push(cause.to_string());
            source = cause.source();
        }
        failure
    }

    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let mut failure = Self::new(panic_message(info.payload()));
        failure.location = info.location().map(SourceLocation::from);
        failure.with_backtrace(&Backtrace::capture())
    }

    /// Attach `backtrace` if it was actually captured
    pub fn with_backtrace(mut self, backtrace: &Backtrace) -> Self {
        if backtrace.status() == BacktraceStatus::Captured {
            self.backtrace = Some(backtrace.to_string());
        }
        self
    }

    /// Caller location, for failures raised by hand
    #[track_caller]
    pub fn here(mut self) -> Self {
        self.location = Some(Location::caller().into());
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        for cause in &self.causes {
            write!(f, "\n  caused by: {cause}")?;
        }
        Ok(())
    }
}

thread_local! {
    /// Failure whose handler is running, set by [`handling`]
    static HANDLED: RefCell<Option<Failure>> = const { RefCell::new(None) };
    /// Panic seen by the hook while [`catch`] runs
    static CAUGHT: RefCell<Option<Failure>> = const { RefCell::new(None) };
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

static HOOK: Once = Once::new();

/// Install the cipdb panic hook
///
/// The hook chains onto the one installed before it. Panics inside
/// [`catch`] are captured with their location and backtrace; panics from
/// breakpoint predicates are not reported at all. [`catch`] and predicate
/// evaluation install it on first use, so calling this is only needed to
/// pin the chaining order early. Later calls have no effect.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if QUIET.with(Cell::get) {
                return;
            }
            if CAPTURING.with(Cell::get) {
                CAUGHT.with(|caught| *caught.borrow_mut() = Some(Failure::from_panic(info)));
            }
            previous(info);
        }));
    });
}

/// Run `f`, turning a panic into a [`Failure`]
///
/// Like `catch_unwind` wrapped in `AssertUnwindSafe`: the caller vouches
/// for any state `f` leaves half-updated.
///
/// ```no_run
/// use cipdb::context;
///
/// let items: Vec<u32> = Vec::new();
/// if let Err(failure) = context::catch(|| items[3]) {
///     context::handling(&failure, || cipdb::break_on_exception(None, "DEBUG", None))?;
/// }
/// # Ok::<(), cipdb::CipdbError>(())
/// ```
pub fn catch<T>(f: impl FnOnce() -> T) -> Result<T, Failure> {
    install_panic_hook();
    let was_capturing = CAPTURING.with(|capturing| capturing.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|capturing| capturing.set(was_capturing));
    let caught = CAUGHT.with(|caught| caught.borrow_mut().take());
    result.map_err(|payload| caught.unwrap_or_else(|| Failure::new(panic_message(&*payload))))
}

/// Run the handler `f` with `failure` as the thread's current failure
///
/// The previous value comes back when `f` returns or unwinds, so handlers
/// nest.
pub fn handling<R>(failure: &Failure, f: impl FnOnce() -> R) -> R {
    let _restore = Restore(HANDLED.with(|handled| handled.replace(Some(failure.clone()))));
    f()
}

struct Restore(Option<Failure>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        HANDLED.with(|handled| *handled.borrow_mut() = previous);
    }
}

/// The failure being handled on this thread, if any
pub fn current_failure() -> Option<Failure> {
    HANDLED.with(|handled| handled.borrow().clone())
}

/// Run `f`, turning a panic into its message
///
/// Panics raised here are neither captured nor reported by any hook
/// installed before cipdb's.
pub(crate) fn catch_quietly<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    install_panic_hook();
    let was_quiet = QUIET.with(|quiet| quiet.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET.with(|quiet| quiet.set(was_quiet));
    result.map_err(|payload| panic_message(&*payload))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
