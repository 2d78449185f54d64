//! Line and character diffs between a cached view and a new write.

mod elide;
mod myers;
mod pretty;
mod unified;

pub use elide::{ELISION_MARKER, elide_unified_diff};
pub use pretty::{PrettyStyle, pretty_diff};
pub use unified::{DiffLine, DiffLineKind, parse_unified_diff, unified_diff};

/// Renders [`unified_diff`] and, when `context_lines` is non-negative,
/// elides it down to that much context.
pub fn elided_unified_diff(
    old: &[u8],
    new: &[u8],
    name: &str,
    context_lines: isize,
) -> Option<String> {
    let diff = unified_diff(old, new, name)?;
    if context_lines < 0 {
        Some(diff)
    } else {
        Some(elide_unified_diff(&diff, context_lines))
    }
}
