//! Integration tests for calltrace
//!
//! Exercises the public API end to end: phase markers, nested call
//! classification, outcome capture, and the emitted line format.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use calltrace::{
    ArgsSnapshot, DumpArgs, FileSink, MemorySink, SkipSignal, TraceOptions, Tracer, call_site,
    mark_cleanup_start, mark_setup_start, mark_test_start,
};

fn tracer_with_sink() -> (Tracer, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (Tracer::new(sink.clone()), sink)
}

fn tag_of(line: &str) -> &str {
    let start = line.find('<').unwrap() + 1;
    let end = line.find('>').unwrap();
    &line[start..end]
}

#[test]
fn test_root_helper_inner_classification() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default();

    mark_test_start("test_foo", "suite.rs", 12);
    tracer.record(&call_site!("test_foo"), &options, None, || {
        tracer.record(&call_site!("helper"), &options, None, || {
            tracer.record(&call_site!("inner"), &options, None, || {});
        });
    });

    // Events are emitted at return, so the deepest call logs first
    let lines = sink.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(tag_of(&lines[0]), "test_subfunction");
    assert_eq!(tag_of(&lines[1]), "test_function");
    assert_eq!(tag_of(&lines[2]), "test");

    assert!(lines[0].contains("\"function_name\":\"inner\""));
    assert!(lines[0].contains("\"called_by\":\"helper\""));
    assert!(lines[1].contains("\"called_by\":\"test_foo\""));
    assert!(lines[2].contains("\"called_by\":\"\""));

    // Every event under the root carries the testcase name and source
    for line in &lines {
        assert!(line.contains("\"test\":\"test_foo\""));
        assert!(line.contains("\"source\":\"suite.rs [12]\""));
    }
    assert_eq!(calltrace::depth(), 0);
}

#[test]
fn cleanup_chain_classification() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default();

    mark_cleanup_start();
    tracer.record(&call_site!("cleanup_a"), &options, None, || {
        tracer.record(&call_site!("cleanup_b"), &options, None, || {});
    });

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(tag_of(&lines[0]), "cleanup_subfunction");
    assert!(lines[0].contains("\"function_name\":\"cleanup_b\""));
    assert!(lines[0].contains("\"called_by\":\"cleanup_a\""));
    assert_eq!(tag_of(&lines[1]), "cleanup_function");
}

#[test]
fn setup_chain_classification() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default();

    mark_setup_start();
    tracer.record(&call_site!("setup_env"), &options, None, || {
        tracer.record(&call_site!("load_fixtures"), &options, None, || {});
    });

    let lines = sink.lines();
    assert_eq!(tag_of(&lines[0]), "setup_subfunction");
    assert_eq!(tag_of(&lines[1]), "setup_function");
    // Setup runs outside a test body; no testcase is attached
    assert!(lines[1].contains("\"test\":\"\""));
}

#[test]
fn stack_tokens_follow_call_nesting() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default();

    mark_test_start("test_stack", "suite.rs", 1);
    tracer.record(
        &calltrace::CallSite::new("test_stack", "tests/suite.rs", 10),
        &options,
        None,
        || {
            tracer.record(
                &calltrace::CallSite::new("helper", "src/helpers.rs", 20),
                &options,
                None,
                || {},
            );
        },
    );

    let lines = sink.lines();
    // The helper's event sees both frames, caller first
    assert!(lines[0].contains("stack=[\"suite.rs:test_stack:10\", \"helpers.rs:helper:20\"]"));
    // The root's event (emitted after the helper popped) sees only itself
    assert!(lines[1].contains("stack=[\"suite.rs:test_stack:10\"]"));
}

#[test]
fn disabling_call_stack_only_drops_the_stack_field() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default().without_call_stack();

    mark_test_start("test_quiet_stack", "suite.rs", 1);
    tracer.record(
        &call_site!("test_quiet_stack"),
        &options,
        Some(ArgsSnapshot::of(&(5,))),
        || {},
    );

    let line = &sink.lines()[0];
    assert!(!line.contains("stack="));
    assert!(line.contains("\"function_name\":\"test_quiet_stack\""));
    // The dump policy is unaffected by disabling the stack
    assert!(line.contains("args=(5,) kwargs={}"));
}

#[test]
fn dump_args_never_omits_args_and_kwargs() {
    let (tracer, sink) = tracer_with_sink();
    let wrapped = tracer.wrap(
        call_site!("configured"),
        TraceOptions::default().with_dump_args(DumpArgs::Never),
        |(a, b): (i32, i32)| a + b,
    );

    mark_test_start("test_never", "suite.rs", 1);
    tracer.record(&call_site!("test_never"), &TraceOptions::default(), None, || {
        assert_eq!(wrapped((1, 2)), 3);
    });

    let lines = sink.lines();
    assert!(!lines[0].contains("args="));
    assert!(!lines[0].contains("kwargs="));
}

#[test]
fn skip_propagates_and_is_counted_once() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default();

    mark_test_start("test_skipped", "suite.rs", 1);
    let caught = catch_unwind(AssertUnwindSafe(|| {
        tracer.record(&call_site!("test_skipped"), &options, None, || {
            tracer.record(&call_site!("check_platform"), &options, None, || {
                calltrace::skip("wrong platform");
            });
            unreachable!("skip must propagate through the helper");
        })
    }));

    let payload = caught.unwrap_err();
    assert_eq!(
        payload.downcast_ref::<SkipSignal>().unwrap().message,
        "wrong platform"
    );

    // One event per traced call, never more: the helper and the root
    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"function_name\":\"check_platform\""));
    assert!(lines[0].contains("\"skipped\":true"));
    assert!(lines[0].contains("\"traceback\":false"));
    assert!(lines[0].contains("\"msg\":\"wrong platform\""));
    // The skip unwound through the root, which records it as skipped too
    assert!(lines[1].contains("\"function_name\":\"test_skipped\""));
    assert!(lines[1].contains("\"skipped\":true"));
    assert_eq!(calltrace::depth(), 0);
}

#[test]
fn panic_propagates_with_balanced_stack() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions::default();

    mark_test_start("test_panics", "suite.rs", 1);
    let caught = catch_unwind(AssertUnwindSafe(|| {
        tracer.record(&call_site!("test_panics"), &options, None, || {
            tracer.record(&call_site!("explode"), &options, None, || {
                panic!("boom");
            });
        })
    }));

    assert_eq!(
        *caught.unwrap_err().downcast_ref::<&str>().unwrap(),
        "boom"
    );
    assert_eq!(calltrace::depth(), 0);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"traceback\":true"));
    assert!(lines[0].contains("\"msg\":\"boom\""));
    assert!(lines[1].contains("\"function_name\":\"test_panics\""));
    assert!(lines[1].contains("\"traceback\":true"));
}

#[test]
fn duration_is_whole_seconds_truncated() {
    let (tracer, sink) = tracer_with_sink();

    mark_test_start("test_slow", "suite.rs", 1);
    tracer.record(&call_site!("test_slow"), &TraceOptions::default(), None, || {
        std::thread::sleep(Duration::from_millis(1100));
    });

    let line = &sink.lines()[0];
    assert!(line.contains("\"duration\":1"), "line was: {line}");
}

#[test]
fn args_snapshot_appears_in_line() {
    let (tracer, sink) = tracer_with_sink();

    mark_test_start("test_args", "suite.rs", 1);
    tracer.record(
        &call_site!("test_args"),
        &TraceOptions::default(),
        Some(ArgsSnapshot::with_kwargs(&(1, 2), "{\"x\": 3}")),
        || {},
    );

    let line = &sink.lines()[0];
    assert!(line.ends_with("args=(1, 2) kwargs={\"x\": 3}"), "line was: {line}");
}

#[test]
fn file_sink_writes_trace_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.log");
    let tracer = Tracer::new(Arc::new(FileSink::create(&path).unwrap()));

    mark_test_start("test_to_file", "suite.rs", 1);
    tracer.record(&call_site!("test_to_file"), &TraceOptions::default(), None, || {});

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("TRACER <test>"));
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn desc_and_source_class_are_copied_into_events() {
    let (tracer, sink) = tracer_with_sink();
    let options = TraceOptions {
        desc: "storage".to_string(),
        source_class: "Volume".to_string(),
        ..TraceOptions::default()
    };

    mark_test_start("test_desc", "suite.rs", 1);
    tracer.record(&call_site!("test_desc"), &TraceOptions::default(), None, || {
        tracer.record(&call_site!("attach"), &options, None, || {});
    });

    let lines = sink.lines();
    assert!(lines[0].contains("\"source_class\":\"Volume\""));
    assert!(lines[0].contains("\"desc\":\"storage\""));
}
