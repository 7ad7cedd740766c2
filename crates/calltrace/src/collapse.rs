//! Call stack collapsing.
//!
//! Renders a context snapshot into compact `file:function:line` tokens for
//! the `stack=` portion of the emitted line. Everything here works from frame
//! data captured at push time; no introspection happens on the hot path
//! beyond formatting.

use std::path::Path;

use crate::types::Frame;

/// Render frames into `file:function:line` tokens, most distant ancestor
/// first. `max_depth` keeps only the nearest frames when set.
pub fn collapse(frames: &[Frame], max_depth: Option<usize>) -> Vec<String> {
    let skip = max_depth.map_or(0, |depth| frames.len().saturating_sub(depth));
    frames.iter().skip(skip).map(token).collect()
}

/// One collapsed token. The file component is the basename only.
fn token(frame: &Frame) -> String {
    let file = Path::new(&frame.file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&frame.file);
    format!("{}:{}:{}", file, frame.function, frame.line)
}
