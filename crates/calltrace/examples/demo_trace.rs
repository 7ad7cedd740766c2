//! Demo of the call tracer simulating one setup/test/cleanup cycle.

use std::sync::Arc;
use std::time::Duration;

use calltrace::{
    CallSite, DumpArgs, MemorySink, RegistryBuilder, TraceOptions, Tracer, call_site,
    mark_cleanup_start, mark_setup_start, mark_test_start,
};
use tracing_subscriber::EnvFilter;

fn provision_volume(tracer: &Tracer, site: &CallSite, options: &TraceOptions) {
    tracer.record(site, options, None, || {
        std::thread::sleep(Duration::from_millis(10));
    });
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    // Registration pass: decided once, read-only afterwards
    let registry = RegistryBuilder::new()
        .trace_fn("provision_volume", TraceOptions::default().with_desc("storage"))
        .trace_class(
            "Volume",
            &["attach", "detach"],
            TraceOptions::default().with_dump_args(DumpArgs::OnFailure),
        )
        .build();
    println!("registered {} traced entry points", registry.len());

    // Capture lines in memory as well, to print a summary at the end
    let sink = Arc::new(MemorySink::new());
    let tracer = Tracer::new(sink.clone());

    let provision_options = registry.options_for("provision_volume").unwrap().clone();

    // Setup phase
    mark_setup_start();
    tracer.record(&call_site!("setup_environment"), &TraceOptions::default(), None, || {
        provision_volume(&tracer, &call_site!("provision_volume"), &provision_options);
    });

    // Test body; the wrapper picks its options straight from the registry
    mark_test_start("test_volume_attach", file!(), line!());
    tracer.record(&call_site!("test_volume_attach"), &TraceOptions::default(), None, || {
        let attach = tracer.wrap_registered(
            &registry,
            call_site!("Volume::attach"),
            |(volume_id,): (u32,)| volume_id + 1,
        );
        let handle = attach((7,));
        assert_eq!(handle, 8);
    });

    // Cleanup phase
    mark_cleanup_start();
    tracer.record(&call_site!("cleanup_volumes"), &TraceOptions::default(), None, || {
        tracer.record(&call_site!("release_handle"), &TraceOptions::default(), None, || {});
    });

    println!("\n--- Emitted trace lines ---");
    for line in sink.lines() {
        println!("{line}");
    }
    assert_eq!(calltrace::depth(), 0);
}
