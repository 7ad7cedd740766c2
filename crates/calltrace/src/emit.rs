//! Event emission.
//!
//! Serializes a [`TraceEvent`] into the single-line wire format and writes it
//! to a sink. One synchronous write per event, no retries, no buffering
//! requirement: losing a single line is acceptable, breaking the traced
//! program is not, so sink failures are swallowed with a warning.
//!
//! Line format:
//!
//! ```text
//! TRACER <tag>{json body}</tag> stack=["file:fn:line", ...] args=(...) kwargs={...}
//! ```
//!
//! `stack=` is omitted when call-stack capture is disabled for the call;
//! `args=`/`kwargs=` are omitted when the dump policy excludes them.

use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::TraceFault;
use crate::types::{Classification, TraceEvent};

/// Severity the line is written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitLevel {
    Debug,
    Error,
}

/// Destination for rendered trace lines.
///
/// Implementations must be cheap and non-blocking beyond the write itself.
pub trait Sink: Send + Sync {
    fn write_line(&self, level: EmitLevel, line: &str) -> Result<(), TraceFault>;
}

/// Render the complete wire line for an event.
pub fn render_line(event: &TraceEvent) -> Result<String, TraceFault> {
    let tag = event.classification.as_str();
    let body = serde_json::to_string(event)
        .map_err(|err| TraceFault::Serialization(err.to_string()))?;

    let mut line = format!("TRACER <{tag}>{body}</{tag}>");
    if let Some(stack) = &event.stack {
        // Debug of Vec<String> yields the quoted comma-separated list
        let _ = write!(line, " stack={stack:?}");
    }
    if let Some(args) = &event.args {
        let _ = write!(line, " args={} kwargs={}", args.args, args.kwargs);
    }
    Ok(line)
}

/// Level routing: a testcase root that failed is worth an error line,
/// everything else stays at debug.
pub fn level_for(event: &TraceEvent) -> EmitLevel {
    if event.classification == Classification::Test && event.traceback {
        EmitLevel::Error
    } else {
        EmitLevel::Debug
    }
}

/// Render and write one event. Tracer-internal faults degrade to a warning;
/// nothing propagates to the traced program.
pub fn emit(sink: &dyn Sink, event: &TraceEvent) {
    match render_line(event) {
        Ok(line) => {
            if let Err(fault) = sink.write_line(level_for(event), &line) {
                tracing::warn!(target: "calltrace", "failed to write call trace: {fault}");
            }
        }
        Err(fault) => {
            tracing::warn!(target: "calltrace", "failed to render call trace: {fault}");
        }
    }
}

/// Default sink: routes lines through the `tracing` subscriber stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn write_line(&self, level: EmitLevel, line: &str) -> Result<(), TraceFault> {
        match level {
            EmitLevel::Debug => tracing::debug!(target: "calltrace", "{line}"),
            EmitLevel::Error => tracing::error!(target: "calltrace", "{line}"),
        }
        Ok(())
    }
}

/// File sink: appends one line per event, flushed immediately.
///
/// Thread-safe via internal mutex.
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Open (or create) the trace file for appending.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, TraceFault> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the trace file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_line(&self, _level: EmitLevel, line: &str) -> Result<(), TraceFault> {
        // A poisoned lock means some writer panicked mid-line; losing that
        // line is acceptable, refusing all further writes is not
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(EmitLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Lines together with the level they were written at.
    pub fn entries(&self) -> Vec<(EmitLevel, String)> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Sink for MemorySink {
    fn write_line(&self, level: EmitLevel, line: &str) -> Result<(), TraceFault> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, line.to_string()));
        Ok(())
    }
}
