//! Error types for the tracing engine.
//!
//! Every variant here is a tracer-internal fault. None of them ever propagate
//! into the traced program: callers log the fault and degrade to "stop tracing
//! this call, let the program proceed".

use thiserror::Error;

/// Internal faults the tracer can encounter while recording a call.
#[derive(Debug, Error)]
pub enum TraceFault {
    /// Popped an empty call context stack. Indicates a tracer bug; the
    /// context is reset and tracing continues.
    #[error("call context stack underflow")]
    StackUnderflow,

    /// An event could not be rendered into the log line.
    #[error("serialization failure: {0}")]
    Serialization(String),

    /// The logging destination rejected the write.
    #[error("sink write failure: {0}")]
    SinkWrite(#[from] std::io::Error),
}
