//! Per-thread call context stack.
//!
//! Each thread of execution owns one `ExecutionContext`: the ordered stack of
//! active traced-call frames plus the pending phase marker set by the
//! test-runner boundary. The context is created lazily on the first traced
//! call and persists for the life of the thread; it must be empty between
//! test boundaries.

use std::cell::RefCell;

use crate::error::TraceFault;
use crate::types::{Frame, PhaseRole};

thread_local! {
    static CONTEXT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::new());
}

/// The call context stack for one logical thread of execution.
///
/// Threads never observe or mutate each other's context, so no locking is
/// involved anywhere on the hot path.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    frames: Vec<Frame>,
    pending_role: PhaseRole,
    pending_test: Option<(String, String)>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame to the top of the stack.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Remove and return the top frame.
    pub fn pop(&mut self) -> Result<Frame, TraceFault> {
        self.frames.pop().ok_or(TraceFault::StackUnderflow)
    }

    /// The top frame, if any.
    pub fn peek(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Immutable ordered copy of all frames, oldest first.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.clone()
    }

    /// Current stack depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The live frame slice, oldest first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Drop all frames and pending markers. Used to recover from internal
    /// faults; never part of normal operation.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.pending_role = PhaseRole::Plain;
        self.pending_test = None;
    }

    /// Record that the next pushed frame begins the named testcase.
    pub fn mark_test_start(&mut self, name: impl Into<String>, file: &str, line: u32) {
        self.pending_role = PhaseRole::Test;
        self.pending_test = Some((name.into(), format!("{file} [{line}]")));
    }

    /// Record that the next pushed frame begins setup.
    pub fn mark_setup_start(&mut self) {
        self.pending_role = PhaseRole::Setup;
        self.pending_test = None;
    }

    /// Record that the next pushed frame begins cleanup.
    pub fn mark_cleanup_start(&mut self) {
        self.pending_role = PhaseRole::Cleanup;
        self.pending_test = None;
    }

    /// Consume the pending phase marker for an incoming call.
    ///
    /// Returns the role plus the testcase name/source when the role is
    /// `Test`. Markers apply to exactly one push.
    pub fn take_pending(&mut self) -> (PhaseRole, Option<(String, String)>) {
        let role = std::mem::take(&mut self.pending_role);
        let test = self.pending_test.take();
        (role, test)
    }
}

/// Run `f` with the current thread's context.
///
/// The borrow is released when `f` returns, so traced calls may nest freely
/// as long as no caller holds the context across the traced function body.
pub fn with_context<R>(f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
    CONTEXT.with(|ctx| f(&mut ctx.borrow_mut()))
}

/// Signal that the next traced call on this thread begins the named testcase.
pub fn mark_test_start(name: impl Into<String>, file: &str, line: u32) {
    with_context(|ctx| ctx.mark_test_start(name, file, line));
}

/// Signal that the next traced call on this thread begins setup.
pub fn mark_setup_start() {
    with_context(|ctx| ctx.mark_setup_start());
}

/// Signal that the next traced call on this thread begins cleanup.
pub fn mark_cleanup_start() {
    with_context(|ctx| ctx.mark_cleanup_start());
}

/// Current stack depth for this thread. Zero between test boundaries.
pub fn depth() -> usize {
    with_context(|ctx| ctx.depth())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, PhaseRole};

    fn frame(name: &str) -> Frame {
        Frame {
            function: name.to_string(),
            source_class: String::new(),
            file: "test.rs".to_string(),
            line: 1,
            role: PhaseRole::Plain,
            classification: Some(Classification::TestSubfunction),
            entered_at: 0,
            called_by: String::new(),
            test_name: String::new(),
            test_source: String::new(),
        }
    }

    #[test]
    fn push_pop_is_lifo() {
        let mut ctx = ExecutionContext::new();
        ctx.push(frame("a"));
        ctx.push(frame("b"));
        assert_eq!(ctx.peek().unwrap().function, "b");
        assert_eq!(ctx.pop().unwrap().function, "b");
        assert_eq!(ctx.pop().unwrap().function, "a");
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn pop_on_empty_is_underflow() {
        let mut ctx = ExecutionContext::new();
        assert!(matches!(ctx.pop(), Err(TraceFault::StackUnderflow)));
    }

    #[test]
    fn snapshot_is_oldest_first() {
        let mut ctx = ExecutionContext::new();
        ctx.push(frame("outer"));
        ctx.push(frame("inner"));
        let snap = ctx.snapshot();
        assert_eq!(snap[0].function, "outer");
        assert_eq!(snap[1].function, "inner");
        // Snapshot is a copy; mutating the context leaves it untouched
        ctx.pop().unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn pending_marker_applies_once() {
        let mut ctx = ExecutionContext::new();
        ctx.mark_test_start("test_foo", "suite.rs", 42);
        let (role, info) = ctx.take_pending();
        assert_eq!(role, PhaseRole::Test);
        assert_eq!(
            info,
            Some(("test_foo".to_string(), "suite.rs [42]".to_string()))
        );
        let (role, info) = ctx.take_pending();
        assert_eq!(role, PhaseRole::Plain);
        assert!(info.is_none());
    }

    #[test]
    fn contexts_are_isolated_per_thread() {
        with_context(|ctx| ctx.push(frame("main_thread")));
        let other_depth = std::thread::spawn(|| depth()).join().unwrap();
        assert_eq!(other_depth, 0);
        assert_eq!(depth(), 1);
        with_context(|ctx| ctx.reset());
    }
}
