use std::fmt::{self, Write};

use super::myers::{self, Edit};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrettyStyle {
    /// `[-removed-]{+added+}`
    #[default]
    Plain,
    /// removed text in red, added text in green
    Ansi,
}

impl PrettyStyle {
    fn open(self, op: Op) -> &'static str {
        match (self, op) {
            (PrettyStyle::Plain, Op::Delete) => "[-",
            (PrettyStyle::Plain, Op::Insert) => "{+",
            (PrettyStyle::Ansi, Op::Delete) => RED,
            (PrettyStyle::Ansi, Op::Insert) => GREEN,
            (_, Op::Equal) => "",
        }
    }

    fn close(self, op: Op) -> &'static str {
        match (self, op) {
            (PrettyStyle::Plain, Op::Delete) => "-]",
            (PrettyStyle::Plain, Op::Insert) => "+}",
            (PrettyStyle::Ansi, Op::Delete | Op::Insert) => RESET,
            (_, Op::Equal) => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Renders a character level diff of two buffers with inline highlighting.
/// Returns `None` if the (lossily decoded) texts are equal.
pub fn pretty_diff(old: &[u8], new: &[u8], style: PrettyStyle) -> Option<String> {
    let old: Vec<char> = String::from_utf8_lossy(old).chars().collect();
    let new: Vec<char> = String::from_utf8_lossy(new).chars().collect();

    let edits = myers::diff(&old, &new);
    if !edits.iter().any(Edit::is_change) {
        return None;
    }

    let mut out = String::with_capacity(old.len().max(new.len()));
    render(&mut out, style, &old, &new, &edits).ok()?;
    Some(out)
}

fn render(
    out: &mut impl Write,
    style: PrettyStyle,
    old: &[char],
    new: &[char],
    edits: &[Edit],
) -> fmt::Result {
    let mut run: Option<Op> = None;
    for edit in edits {
        let (op, ch) = match *edit {
            Edit::Equal { new: i, .. } => (Op::Equal, new[i]),
            Edit::Delete { old: i } => (Op::Delete, old[i]),
            Edit::Insert { new: i } => (Op::Insert, new[i]),
        };
        if run != Some(op) {
            if let Some(prev) = run {
                out.write_str(style.close(prev))?;
            }
            out.write_str(style.open(op))?;
            run = Some(op);
        }
        out.write_char(ch)?;
    }
    if let Some(prev) = run {
        out.write_str(style.close(prev))?;
    }
    Ok(())
}
