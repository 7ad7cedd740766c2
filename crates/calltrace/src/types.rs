//! Core trace data types.
//!
//! `Frame` is the per-call record living on the call context stack;
//! `TraceEvent` is the immutable record built when a call completes. The
//! serde field order of `TraceEvent` is the wire schema and must not be
//! reordered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase role supplied by the test-runner boundary for an incoming call.
///
/// `Plain` means the call carries no marker of its own and classifies from
/// its ancestors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhaseRole {
    Test,
    Setup,
    Cleanup,
    #[default]
    Plain,
}

/// One of the seven classification tags describing a call's position
/// relative to the test/setup/cleanup phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The testcase entry point itself.
    Test,
    /// Called directly by the testcase root.
    TestFunction,
    /// Nested deeper under the testcase root.
    TestSubfunction,
    /// The setup entry point.
    SetupFunction,
    /// Nested under a setup-tagged call.
    SetupSubfunction,
    /// The cleanup entry point.
    CleanupFunction,
    /// Nested under a cleanup-tagged call.
    CleanupSubfunction,
}

impl Classification {
    /// Wire tag used in the `<tag>...</tag>` markup of the emitted line.
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Test => "test",
            Classification::TestFunction => "test_function",
            Classification::TestSubfunction => "test_subfunction",
            Classification::SetupFunction => "setup_function",
            Classification::SetupSubfunction => "setup_subfunction",
            Classification::CleanupFunction => "cleanup_function",
            Classification::CleanupSubfunction => "cleanup_subfunction",
        }
    }

    /// True for `test`, `test_function` and `test_subfunction`.
    pub fn is_test_tagged(self) -> bool {
        matches!(
            self,
            Classification::Test
                | Classification::TestFunction
                | Classification::TestSubfunction
        )
    }

    /// True for `setup_function` and `setup_subfunction`.
    pub fn is_setup_tagged(self) -> bool {
        matches!(
            self,
            Classification::SetupFunction | Classification::SetupSubfunction
        )
    }

    /// True for `cleanup_function` and `cleanup_subfunction`.
    pub fn is_cleanup_tagged(self) -> bool {
        matches!(
            self,
            Classification::CleanupFunction | Classification::CleanupSubfunction
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy controlling when argument snapshots are attached to events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpArgs {
    /// Capture a snapshot unconditionally.
    #[default]
    Always,
    /// Omit the args/kwargs fields entirely.
    Never,
    /// Capture only when the call failed or was skipped.
    OnFailure,
}

/// The static identity of a traced call site.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Function name as it appears in the event.
    pub function: &'static str,
    /// Defining source file.
    pub file: &'static str,
    /// Definition line.
    pub line: u32,
}

impl CallSite {
    pub fn new(function: &'static str, file: &'static str, line: u32) -> Self {
        Self {
            function,
            file,
            line,
        }
    }
}

/// Build a [`CallSite`] for the current location.
///
/// ```
/// let site = calltrace::call_site!("my_helper");
/// assert_eq!(site.function, "my_helper");
/// ```
#[macro_export]
macro_rules! call_site {
    ($function:expr) => {
        $crate::CallSite::new($function, file!(), line!())
    };
}

/// Owned, rendered snapshot of a call's arguments.
///
/// The snapshot is a copy taken before the call runs; no references to live
/// arguments are retained past event construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgsSnapshot {
    /// Tuple-style rendering, e.g. `(1, 2)`.
    pub args: String,
    /// Map-style rendering of named arguments, e.g. `{"x": 3}`.
    pub kwargs: String,
}

impl ArgsSnapshot {
    /// Snapshot a positional argument tuple via its `Debug` rendering.
    pub fn of<A: fmt::Debug>(args: &A) -> Self {
        Self {
            args: format!("{args:?}"),
            kwargs: "{}".to_string(),
        }
    }

    /// Snapshot with an explicit named-argument rendering.
    pub fn with_kwargs<A: fmt::Debug>(args: &A, kwargs: impl Into<String>) -> Self {
        Self {
            args: format!("{args:?}"),
            kwargs: kwargs.into(),
        }
    }
}

/// Panic payload meaning "this test should be marked skipped".
///
/// Raised by [`skip`] and recognized by the call recorder, which records the
/// skip and rethrows the payload unchanged so the host runner still counts
/// the test as skipped.
#[derive(Debug, Clone)]
pub struct SkipSignal {
    pub message: String,
}

/// Raise the skip signal for the current test.
pub fn skip(message: impl Into<String>) -> ! {
    std::panic::panic_any(SkipSignal {
        message: message.into(),
    })
}

/// One active traced call on the context stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Function name.
    pub function: String,
    /// Name of the class owning the function, empty for plain functions.
    pub source_class: String,
    /// Source file of the call site.
    pub file: String,
    /// Source line of the call site.
    pub line: u32,
    /// Phase role the call was pushed with.
    pub role: PhaseRole,
    /// Tag assigned at push time. `None` means untraced context: the frame
    /// participates in stack bookkeeping but emits no event.
    pub classification: Option<Classification>,
    /// Entry timestamp, whole seconds since the epoch.
    pub entered_at: i64,
    /// Function name of the immediate parent frame, empty at the stack root.
    pub called_by: String,
    /// Name of the active testcase, inherited from the test root. Empty
    /// outside a test body.
    pub test_name: String,
    /// Source location of the testcase invocation point, empty if not
    /// applicable.
    pub test_source: String,
}

/// The emitted record for one completed call.
///
/// The serialized field order below is the fixed wire schema.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub function_name: String,
    pub called_by: String,
    pub start: i64,
    pub duration: u64,
    pub traceback: bool,
    pub skipped: bool,
    pub msg: String,
    pub test: String,
    pub source: String,
    pub source_class: String,
    pub desc: String,
    /// Classification tag, rendered as the surrounding markup rather than a
    /// JSON field.
    #[serde(skip_serializing)]
    pub classification: Classification,
    /// Collapsed call stack, `None` when capture is disabled for this call.
    #[serde(skip_serializing)]
    pub stack: Option<Vec<String>>,
    /// Argument snapshot, `None` when the dump policy excludes it.
    #[serde(skip_serializing)]
    pub args: Option<ArgsSnapshot>,
}
