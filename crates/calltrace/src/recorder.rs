//! Call recording.
//!
//! [`Tracer`] wraps a single invocation of a traced function: it pushes a
//! frame onto the thread's context, classifies it, runs the function, then
//! builds and emits exactly one [`TraceEvent`] before the frame pops,
//! whichever way the call exits. Panics and skip signals are observed and
//! rethrown unchanged; the recorder never alters control flow.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::classify::{active_test_root, classify};
use crate::collapse::collapse;
use crate::config::TracerConfig;
use crate::context::with_context;
use crate::emit::{FileSink, LogSink, Sink, emit};
use crate::error::TraceFault;
use crate::registry::{Registry, TraceOptions};
use crate::types::{ArgsSnapshot, CallSite, DumpArgs, Frame, SkipSignal, TraceEvent};

/// Records traced calls and dispatches their events to a shared sink.
///
/// Cheap to clone; the sink and settings are read-only after construction,
/// so clones can be handed to every wrapped entry point.
#[derive(Clone)]
pub struct Tracer {
    sink: Arc<dyn Sink>,
    enabled: bool,
    max_stack_depth: Option<usize>,
}

impl Tracer {
    /// Tracer writing to the given sink.
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            enabled: true,
            max_stack_depth: None,
        }
    }

    /// Tracer routing lines through the `tracing` subscriber stack.
    pub fn to_log() -> Self {
        Self::new(Arc::new(LogSink))
    }

    /// Tracer that runs every call untouched and records nothing.
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(LogSink),
            enabled: false,
            max_stack_depth: None,
        }
    }

    /// Build a tracer from configuration.
    pub fn from_config(config: &TracerConfig) -> Result<Self, TraceFault> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let sink: Arc<dyn Sink> = match &config.trace_file {
            Some(path) => Arc::new(FileSink::create(path)?),
            None => Arc::new(LogSink),
        };
        Ok(Self {
            sink,
            enabled: true,
            max_stack_depth: config.max_stack_depth,
        })
    }

    /// Cap the number of collapsed stack tokens per event.
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = Some(depth);
        self
    }

    /// Record one invocation of a traced function.
    ///
    /// `args` is the pre-call snapshot (pass `None` when the dump policy is
    /// `Never`). Returns whatever `f` returns; if `f` panics or raises the
    /// skip signal, the payload is rethrown unchanged after the event is
    /// emitted.
    pub fn record<T>(
        &self,
        site: &CallSite,
        options: &TraceOptions,
        args: Option<ArgsSnapshot>,
        f: impl FnOnce() -> T,
    ) -> T {
        if !self.enabled {
            // A marker applies to exactly one call; consume it even when
            // nothing is recorded so it cannot leak onto a later call
            with_context(|ctx| {
                let _ = ctx.take_pending();
            });
            return f();
        }

        self.push_frame(site, options);
        let started = Instant::now();

        let result = catch_unwind(AssertUnwindSafe(f));

        let outcome = match &result {
            Ok(_) => Outcome::ok(),
            Err(payload) => Outcome::of_panic(payload.as_ref()),
        };
        let duration = started.elapsed().as_secs();
        self.finish_frame(options, args, &outcome, duration);

        match result {
            Ok(value) => value,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Wrap a function so every call performs the full recording behavior.
    ///
    /// This is the `register(function, config) -> wrapped_function` surface:
    /// the returned closure takes the argument tuple, snapshots it per the
    /// dump policy, and returns or panics exactly as the original would.
    pub fn wrap<A, T, F>(
        &self,
        site: CallSite,
        options: TraceOptions,
        f: F,
    ) -> impl Fn(A) -> T + use<A, T, F>
    where
        A: fmt::Debug,
        F: Fn(A) -> T,
    {
        let tracer = self.clone();
        move |args: A| {
            let snapshot = (options.dump_args != DumpArgs::Never)
                .then(|| ArgsSnapshot::of(&args));
            tracer.record(&site, &options, snapshot, || f(args))
        }
    }

    /// Wrap a function using the options registered under its name.
    ///
    /// The lookup key is `site.function` (use the `Class::method` form for
    /// methods registered in bulk). Functions absent from the registry run
    /// untraced, so a whole table of entry points can be wrapped uniformly
    /// and only the registered ones produce events.
    pub fn wrap_registered<A, T, F>(
        &self,
        registry: &Registry,
        site: CallSite,
        f: F,
    ) -> impl Fn(A) -> T + use<A, T, F>
    where
        A: fmt::Debug,
        F: Fn(A) -> T,
    {
        let options = registry.options_for(site.function).cloned();
        let tracer = self.clone();
        move |args: A| match &options {
            Some(options) => {
                let snapshot = (options.dump_args != DumpArgs::Never)
                    .then(|| ArgsSnapshot::of(&args));
                tracer.record(&site, options, snapshot, || f(args))
            }
            None => f(args),
        }
    }

    fn push_frame(&self, site: &CallSite, options: &TraceOptions) {
        with_context(|ctx| {
            let (role, test_info) = ctx.take_pending();
            let classification = classify(ctx.frames(), role);
            let called_by = ctx
                .peek()
                .map(|parent| parent.function.clone())
                .unwrap_or_default();
            let (test_name, test_source) = match test_info {
                Some(info) => info,
                None => active_test_root(ctx.frames())
                    .map(|root| (root.test_name.clone(), root.test_source.clone()))
                    .unwrap_or_default(),
            };
            ctx.push(Frame {
                function: site.function.to_string(),
                source_class: options.source_class.clone(),
                file: site.file.to_string(),
                line: site.line,
                role,
                classification,
                entered_at: Utc::now().timestamp(),
                called_by,
                test_name,
                test_source,
            });
        });
    }

    /// Build and emit the event for the top frame, then pop it. Emission
    /// happens before the pop on every exit path. The context borrow is
    /// released while the sink runs, so sinks may read the context; a
    /// panicking sink costs one line, never the traced call.
    fn finish_frame(
        &self,
        options: &TraceOptions,
        args: Option<ArgsSnapshot>,
        outcome: &Outcome,
        duration: u64,
    ) {
        let event = with_context(|ctx| {
            ctx.peek().and_then(|frame| {
                let classification = frame.classification?;
                let stack = options
                    .call_stack
                    .then(|| collapse(ctx.frames(), self.max_stack_depth));
                let attach_args = match options.dump_args {
                    DumpArgs::Always => args.clone(),
                    DumpArgs::Never => None,
                    DumpArgs::OnFailure => {
                        (outcome.traceback || outcome.skipped).then(|| args.clone()).flatten()
                    }
                };
                Some(TraceEvent {
                    function_name: frame.function.clone(),
                    called_by: frame.called_by.clone(),
                    start: frame.entered_at,
                    duration,
                    traceback: outcome.traceback,
                    skipped: outcome.skipped,
                    msg: outcome.msg.clone(),
                    test: frame.test_name.clone(),
                    source: frame.test_source.clone(),
                    source_class: frame.source_class.clone(),
                    desc: options.desc.clone(),
                    classification,
                    stack,
                    args: attach_args,
                })
            })
        });

        if let Some(event) = &event {
            if event.skipped {
                tracing::info!(
                    target: "calltrace",
                    "skipped {}: {}", event.function_name, event.msg
                );
            }
            if catch_unwind(AssertUnwindSafe(|| emit(self.sink.as_ref(), event))).is_err() {
                tracing::warn!(target: "calltrace", "sink panicked while writing call trace");
            }
        }

        with_context(|ctx| {
            if let Err(fault) = ctx.pop() {
                tracing::warn!(target: "calltrace", "resetting call context: {fault}");
                ctx.reset();
            }
        });
    }
}

/// How a traced call exited.
struct Outcome {
    traceback: bool,
    skipped: bool,
    msg: String,
}

impl Outcome {
    fn ok() -> Self {
        Self {
            traceback: false,
            skipped: false,
            msg: String::new(),
        }
    }

    /// Inspect a caught panic payload. Skip signals are not failures.
    fn of_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(signal) = payload.downcast_ref::<SkipSignal>() {
            return Self {
                traceback: false,
                skipped: true,
                msg: signal.message.clone(),
            };
        }
        let msg = if let Some(text) = payload.downcast_ref::<&'static str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "<unrepresentable>".to_string()
        };
        Self {
            traceback: true,
            skipped: false,
            msg,
        }
    }
}
