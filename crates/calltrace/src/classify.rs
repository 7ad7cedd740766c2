//! Phase classification for incoming calls.
//!
//! Classification is computed once at push time from the stack as it exists
//! at that instant and never revised afterwards, so later pops or reordering
//! cannot retroactively change an assigned tag.

use crate::types::{Classification, Frame, PhaseRole};

/// Compute the classification tag for a call about to be pushed.
///
/// `frames` is the stack beneath the incoming call, oldest first. Returns
/// `None` for untraced context: a plain call with no phase-tagged ancestor
/// and no test root anywhere in the stack emits no event.
pub fn classify(frames: &[Frame], role: PhaseRole) -> Option<Classification> {
    match role {
        PhaseRole::Test => Some(Classification::Test),
        PhaseRole::Setup => {
            if has_tagged_ancestor(frames, Classification::is_setup_tagged) {
                Some(Classification::SetupSubfunction)
            } else {
                Some(Classification::SetupFunction)
            }
        }
        PhaseRole::Cleanup => {
            if has_tagged_ancestor(frames, Classification::is_cleanup_tagged) {
                Some(Classification::CleanupSubfunction)
            } else {
                Some(Classification::CleanupFunction)
            }
        }
        PhaseRole::Plain => classify_plain(frames),
    }
}

/// Find the active test root for an incoming call, if one exists.
///
/// Descendants inherit the root's testcase name and source until it pops.
pub fn active_test_root(frames: &[Frame]) -> Option<&Frame> {
    frames
        .iter()
        .rev()
        .find(|f| f.classification == Some(Classification::Test))
}

fn has_tagged_ancestor(frames: &[Frame], pred: impl Fn(Classification) -> bool) -> bool {
    frames
        .iter()
        .rev()
        .any(|f| f.classification.is_some_and(&pred))
}

/// Classify an unmarked call from its nearest phase-tagged ancestor,
/// walking top toward root.
fn classify_plain(frames: &[Frame]) -> Option<Classification> {
    let top = frames.len().checked_sub(1)?;
    for (index, frame) in frames.iter().enumerate().rev() {
        let Some(tag) = frame.classification else {
            continue;
        };
        let classified = if tag.is_setup_tagged() {
            Classification::SetupSubfunction
        } else if tag.is_cleanup_tagged() {
            Classification::CleanupSubfunction
        } else if tag == Classification::Test && index == top {
            // Immediate parent is the testcase root
            Classification::TestFunction
        } else {
            Classification::TestSubfunction
        };
        return Some(classified);
    }
    None
}
