use super::unified::{DiffLineKind, parse_unified_diff};

pub const ELISION_MARKER: &str = "...";

/// Trims a rendered diff down to the changed lines plus `context_lines` of
/// surrounding context. Header lines are always kept, and each run of dropped
/// lines (including one at the start or end) is replaced by a single `...`.
/// Edge runs are marked too, not only gaps between kept regions, so every
/// dropped line leaves a trace in the output.
///
/// A negative `context_lines`, or a diff with no changed lines, returns the
/// input unmodified.
pub fn elide_unified_diff(diff: &str, context_lines: isize) -> String {
    let Ok(context) = usize::try_from(context_lines) else {
        return diff.to_owned();
    };

    let (headers, body): (Vec<_>, Vec<_>) = parse_unified_diff(diff)
        .into_iter()
        .partition(|line| line.kind == DiffLineKind::Header);

    let mut keep = vec![false; body.len()];
    let mut any_change = false;
    for (i, line) in body.iter().enumerate() {
        if line.is_change() {
            any_change = true;
            let lo = i.saturating_sub(context);
            let hi = i.saturating_add(context).min(body.len() - 1);
            keep[lo..=hi].fill(true);
        }
    }
    if !any_change {
        return diff.to_owned();
    }

    let mut out = String::with_capacity(diff.len());
    for header in &headers {
        out.push_str(&header.content);
        out.push('\n');
    }

    for (i, line) in body.iter().enumerate() {
        if keep[i] {
            out.push_str(&line.content);
            out.push('\n');
        } else if i == 0 || keep[i - 1] {
            out.push_str(ELISION_MARKER);
            out.push('\n');
        }
    }
    out
}
