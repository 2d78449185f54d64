use std::fmt::{self, Write};

use super::myers::{self, Edit};

/// Renders a line-numbered unified diff between two buffers.
///
/// Lines are `\n`-terminated tokens of the (lossily decoded) input. Each
/// record is written as `<marker><line number>:<line>`, where the marker is a
/// space for unchanged lines, `-` for removed lines and `+` for added lines.
/// Removed lines carry their number in `old`; every other line is numbered in
/// `new`.
///
/// Returns `None` if no line changed.
pub fn unified_diff(old: &[u8], new: &[u8], name: &str) -> Option<String> {
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();

    let edits = myers::diff(&a, &b);
    if !edits.iter().any(Edit::is_change) {
        return None;
    }

    let mut out = String::new();
    render(&mut out, name, &a, &b, &edits).ok()?;
    Some(out)
}

fn render(
    out: &mut impl Write,
    name: &str,
    old: &[&str],
    new: &[&str],
    edits: &[Edit],
) -> fmt::Result {
    writeln!(out, "--- {name} (cached)")?;
    writeln!(out, "+++ {name} (new write)")?;
    for edit in edits {
        match *edit {
            Edit::Equal { new: i, .. } => writeln!(out, " {}:{}", i + 1, strip(new[i]))?,
            Edit::Delete { old: i } => writeln!(out, "-{}:{}", i + 1, strip(old[i]))?,
            Edit::Insert { new: i } => writeln!(out, "+{}:{}", i + 1, strip(new[i]))?,
        }
    }
    Ok(())
}

fn strip(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    /// an unchanged line, or any line the parser does not recognize
    Context,
    Add,
    Remove,
    /// `---` / `+++` file header
    Header,
    /// `@@` hunk header
    Location,
    /// the `...` marker left behind by elision
    Elided,
}

/// One line of a rendered diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// the full line as rendered, marker included
    pub content: String,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

impl DiffLine {
    #[inline]
    pub fn is_change(&self) -> bool {
        matches!(self.kind, DiffLineKind::Add | DiffLineKind::Remove)
    }

    /// The line text with its marker and line number removed.
    pub fn text(&self) -> &str {
        match self.kind {
            DiffLineKind::Context | DiffLineKind::Add | DiffLineKind::Remove
                if self.old_line.is_some() || self.new_line.is_some() =>
            {
                self.content
                    .split_once(':')
                    .map_or(self.content.as_str(), |(_, text)| text)
            }
            _ => &self.content,
        }
    }
}

/// Parses a diff produced by [`unified_diff`] (or an elided version of one)
/// back into structured lines.
pub fn parse_unified_diff(diff: &str) -> Vec<DiffLine> {
    diff.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> DiffLine {
    let plain = |kind| DiffLine {
        kind,
        content: line.to_owned(),
        old_line: None,
        new_line: None,
    };

    if line.starts_with("---") || line.starts_with("+++") {
        return plain(DiffLineKind::Header);
    }
    if line.starts_with("@@") {
        return plain(DiffLineKind::Location);
    }
    if line == "..." {
        return plain(DiffLineKind::Elided);
    }

    let (kind, rest) = match line.as_bytes().first() {
        Some(b'+') => (DiffLineKind::Add, &line[1..]),
        Some(b'-') => (DiffLineKind::Remove, &line[1..]),
        Some(b' ') => (DiffLineKind::Context, &line[1..]),
        _ => return plain(DiffLineKind::Context),
    };

    let number = rest
        .split_once(':')
        .and_then(|(n, _)| n.parse::<usize>().ok());

    let mut parsed = plain(kind);
    match kind {
        DiffLineKind::Remove => parsed.old_line = number,
        _ => parsed.new_line = number,
    }
    parsed
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[sniff_test::test]
    fn test_single_line_change() {
        let diff = unified_diff(b"line1\nline2\nline3\n", b"line1\nLINE2\nline3\n", "f").unwrap();
        assert_eq!(
            diff,
            "--- f (cached)\n+++ f (new write)\n 1:line1\n-2:line2\n+2:LINE2\n 3:line3\n"
        );
    }

    #[sniff_test::test]
    fn test_identical_is_none() {
        assert_eq!(unified_diff(b"same\n", b"same\n", "f"), None);
        assert_eq!(unified_diff(b"", b"", "f"), None);
    }

    #[sniff_test::test]
    fn test_numbering_tracks_each_side() {
        let diff = unified_diff(b"a\nb\nc\n", b"a\nx\ny\nc\n", "f").unwrap();
        let lines = parse_unified_diff(&diff);
        let summary: Vec<_> = lines
            .iter()
            .map(|l| (l.kind, l.old_line, l.new_line, l.text()))
            .collect();
        assert_eq!(summary, vec![
            (DiffLineKind::Header, None, None, "--- f (cached)"),
            (DiffLineKind::Header, None, None, "+++ f (new write)"),
            (DiffLineKind::Context, None, Some(1), "a"),
            (DiffLineKind::Remove, Some(2), None, "b"),
            (DiffLineKind::Add, None, Some(2), "x"),
            (DiffLineKind::Add, None, Some(3), "y"),
            (DiffLineKind::Context, None, Some(4), "c"),
        ]);
    }

    #[sniff_test::test]
    fn test_missing_trailing_newline_is_a_change() {
        let diff = unified_diff(b"a\nb", b"a\nb\n", "f").unwrap();
        assert!(diff.contains("-2:b\n"));
        assert!(diff.contains("+2:b\n"));
    }

    #[sniff_test::test]
    fn test_parse_unrecognized_lines() {
        let lines = parse_unified_diff("@@ -1,2 +1,2 @@\n...\nplain\n+nonumber\n");
        assert_matches!(lines[0].kind, DiffLineKind::Location);
        assert_matches!(lines[1].kind, DiffLineKind::Elided);
        assert_matches!(
            &lines[2],
            DiffLine { kind: DiffLineKind::Context, old_line: None, new_line: None, .. }
        );
        assert_matches!(
            &lines[3],
            DiffLine { kind: DiffLineKind::Add, new_line: None, .. }
        );
        assert_eq!(lines[3].text(), "+nonumber");
    }

    #[sniff_test::test]
    fn test_text_keeps_colons_in_content() {
        let diff = unified_diff(b"key: old\n", b"key: new\n", "cfg").unwrap();
        let lines = parse_unified_diff(&diff);
        assert_eq!(lines[2].text(), "key: old");
        assert_eq!(lines[3].text(), "key: new");
    }
}
