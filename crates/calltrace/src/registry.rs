//! Registration of traced functions.
//!
//! Tracing configuration is decided once, before the run starts: the builder
//! collects per-function options (including bulk registration of a class's
//! methods) and produces an immutable [`Registry`]. The registry is read-only
//! for the rest of the run, so wrapped entry points can consult it without
//! locks.

use std::collections::HashMap;

use crate::types::DumpArgs;

/// Per-function tracing options, fixed at registration time.
#[derive(Debug, Clone)]
pub struct TraceOptions {
    /// Populate the `stack=` field of emitted events.
    pub call_stack: bool,
    /// When to attach argument snapshots.
    pub dump_args: DumpArgs,
    /// Free-text annotation copied into every event.
    pub desc: String,
    /// Name of the class owning the function, empty for plain functions.
    pub source_class: String,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            call_stack: true,
            dump_args: DumpArgs::Always,
            desc: String::new(),
            source_class: String::new(),
        }
    }
}

impl TraceOptions {
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_dump_args(mut self, dump_args: DumpArgs) -> Self {
        self.dump_args = dump_args;
        self
    }

    pub fn without_call_stack(mut self) -> Self {
        self.call_stack = false;
        self
    }
}

/// Builder for the registration pass.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, TraceOptions>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain function under its name.
    pub fn trace_fn(mut self, name: impl Into<String>, options: TraceOptions) -> Self {
        self.entries.insert(name.into(), options);
        self
    }

    /// Register every listed method of a class. Entries are keyed
    /// `Class::method` and carry the class name as `source_class`.
    pub fn trace_class(
        mut self,
        class: &str,
        methods: &[&str],
        options: TraceOptions,
    ) -> Self {
        for method in methods {
            let entry = TraceOptions {
                source_class: class.to_string(),
                ..options.clone()
            };
            self.entries.insert(format!("{class}::{method}"), entry);
        }
        self
    }

    /// Freeze the table. No registrations happen after this point.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

/// Immutable table of traced entry points, shared read-only for the run.
#[derive(Debug)]
pub struct Registry {
    entries: HashMap<String, TraceOptions>,
}

impl Registry {
    /// Options for a registered function, `None` if it is not traced.
    pub fn options_for(&self, name: &str) -> Option<&TraceOptions> {
        self.entries.get(name)
    }

    pub fn is_traced(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
