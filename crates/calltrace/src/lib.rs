//! Per-call structured tracing for test runs.
//!
//! This crate instruments test execution to produce one structured log line
//! per traced call, classified against the enclosing testcase/setup/cleanup
//! phase:
//!
//! - **Context**: per-thread call context stack and phase markers
//! - **Classify**: the seven-tag phase classifier
//! - **Collapse**: compact `file:function:line` stack rendering
//! - **Recorder**: per-call timing, outcome capture, and event construction
//! - **Emit**: the fixed-schema line format and pluggable sinks
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use calltrace::{MemorySink, TraceOptions, Tracer, mark_test_start};
//!
//! let sink = Arc::new(MemorySink::new());
//! let tracer = Tracer::new(sink.clone());
//!
//! mark_test_start("test_widget", "suite.rs", 12);
//! tracer.record(
//!     &calltrace::call_site!("test_widget"),
//!     &TraceOptions::default(),
//!     None,
//!     || {
//!         // test body; nested tracer.record calls classify as
//!         // test_function / test_subfunction automatically
//!     },
//! );
//!
//! assert_eq!(calltrace::depth(), 0);
//! assert!(sink.lines()[0].starts_with("TRACER <test>"));
//! ```
//!
//! The tracer never alters the traced call: panics and skip signals are
//! recorded, then rethrown unchanged. Its own faults degrade to warnings;
//! a missing log line is acceptable, breaking a test run is not.

pub mod classify;
pub mod collapse;
pub mod config;
pub mod context;
pub mod emit;
pub mod error;
pub mod recorder;
pub mod registry;
pub mod types;

// Re-export main types
pub use config::TracerConfig;
pub use context::{
    ExecutionContext, depth, mark_cleanup_start, mark_setup_start, mark_test_start, with_context,
};
pub use emit::{EmitLevel, FileSink, LogSink, MemorySink, Sink, render_line};
pub use error::TraceFault;
pub use recorder::Tracer;
pub use registry::{Registry, RegistryBuilder, TraceOptions};
pub use types::{
    ArgsSnapshot, CallSite, Classification, DumpArgs, Frame, PhaseRole, SkipSignal, TraceEvent,
    skip,
};
