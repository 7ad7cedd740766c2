//! Configuration file support.
//!
//! Settings are loaded once at startup from a TOML file and treated as
//! read-only for the rest of the run.
//!
//! ```toml
//! enabled = true
//! trace_file = ".calltrace/calls.log"
//! call_stack = true
//! dump_args = "on_failure"
//! max_stack_depth = 16
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::registry::TraceOptions;
use crate::types::DumpArgs;

/// Tracer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Master switch. A disabled tracer runs every call untouched.
    pub enabled: bool,
    /// Path of the trace file. `None` routes lines through the `tracing`
    /// subscriber stack instead.
    pub trace_file: Option<PathBuf>,
    /// Default for per-function `call_stack` when registration does not say.
    pub call_stack: bool,
    /// Default argument dump policy.
    pub dump_args: DumpArgs,
    /// Cap on collapsed stack tokens per event. `None` is unlimited.
    pub max_stack_depth: Option<usize>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trace_file: None,
            call_stack: true,
            dump_args: DumpArgs::Always,
            max_stack_depth: None,
        }
    }
}

impl TracerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Registration defaults derived from this configuration.
    pub fn default_options(&self) -> TraceOptions {
        TraceOptions {
            call_stack: self.call_stack,
            dump_args: self.dump_args,
            ..TraceOptions::default()
        }
    }
}
