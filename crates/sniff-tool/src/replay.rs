use std::io::{BufRead, Write};

use sniff_filecache::{
    FileCache, PathHash,
    diff::{DiffLineKind, parse_unified_diff},
};

use crate::{
    err::ToolErr,
    trace::{self, EventOp},
};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: u64,
    pub reads: u64,
    pub writes: u64,
    pub diffs: u64,
    pub cleaned: u64,
}

/// Feeds captured events through a [`FileCache`], writing a diff to `out`
/// for every write that changes previously observed content.
pub struct Replayer<'a, W> {
    cache: &'a FileCache,
    out: W,
    context_lines: isize,
    cleanup_every: u64,
    color: bool,
    summary: ReplaySummary,
}

impl<'a, W: Write> Replayer<'a, W> {
    pub fn new(cache: &'a FileCache, out: W, context_lines: isize, cleanup_every: u64) -> Self {
        Self {
            cache,
            out,
            context_lines,
            cleanup_every,
            color: false,
            summary: ReplaySummary::default(),
        }
    }

    pub fn with_color(self, color: bool) -> Self {
        Self { color, ..self }
    }

    pub fn replay(mut self, reader: impl BufRead) -> Result<ReplaySummary, ToolErr> {
        for event in trace::events(reader) {
            let (line, event) = event?;
            self.apply(line, &event)?;
        }
        self.out.flush()?;
        Ok(self.summary)
    }

    fn apply(&mut self, line: usize, event: &trace::Event) -> Result<(), ToolErr> {
        let key = PathHash::of(&event.path);
        self.summary.events += 1;

        match event.op {
            EventOp::Read => {
                let data = event.payload(line)?;
                tracing::trace!(%key, path = %event.path, offset = event.offset, len = data.len(), "read");
                self.cache.add_read(key, event.offset, &data);
                self.summary.reads += 1;
            }
            EventOp::Write => {
                let data = event.payload(line)?;
                tracing::trace!(%key, path = %event.path, offset = event.offset, len = data.len(), "write");
                self.summary.writes += 1;
                if let Some(diff) = self.cache.record_write(
                    key,
                    event.offset,
                    &data,
                    &event.path,
                    self.context_lines,
                ) {
                    self.summary.diffs += 1;
                    self.print_diff(&diff)?;
                }
            }
            EventOp::Open | EventOp::Close | EventOp::Seek => {
                tracing::debug!(%key, path = %event.path, offset = event.offset, op = %event.op);
            }
        }

        if self.cleanup_every > 0 && self.summary.events % self.cleanup_every == 0 {
            let removed = self.cache.cleanup();
            if removed > 0 {
                tracing::debug!(removed, "periodic cleanup");
            }
            self.summary.cleaned += removed as u64;
        }
        Ok(())
    }

    fn print_diff(&mut self, diff: &str) -> Result<(), ToolErr> {
        if !self.color {
            self.out.write_all(diff.as_bytes())?;
            return Ok(());
        }
        for line in parse_unified_diff(diff) {
            let paint = match line.kind {
                DiffLineKind::Context => None,
                DiffLineKind::Add => Some(GREEN),
                DiffLineKind::Remove => Some(RED),
                DiffLineKind::Header => Some(BOLD),
                DiffLineKind::Location => Some(CYAN),
                DiffLineKind::Elided => Some(DIM),
            };
            match paint {
                Some(paint) => writeln!(self.out, "{paint}{}{RESET}", line.content)?,
                None => writeln!(self.out, "{}", line.content)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, time::Duration};

    use assert_matches::assert_matches;
    use sniff_filecache::{ByteUnit, ManualClock};

    use super::*;

    fn cache() -> FileCache {
        FileCache::new(
            ByteUnit::from_kb(64),
            ByteUnit::from_mb(1),
            Duration::from_secs(60),
            ManualClock::new(),
        )
    }

    const TRACE: &str = r#"
{"op": "open", "path": "/etc/app.conf"}
{"op": "read", "path": "/etc/app.conf", "offset": 0, "data": "port = 80\nhost = a\n"}
{"op": "write", "path": "/etc/app.conf", "offset": 0, "data": "port = 81\nhost = a\n"}
{"op": "write", "path": "/etc/app.conf", "offset": 0, "data": "port = 81\nhost = a\n"}
{"op": "write", "path": "/tmp/new", "offset": 0, "hex": "6869"}
{"op": "close", "path": "/etc/app.conf"}
"#;

    #[sniff_test::test]
    fn test_replay_prints_changed_writes() {
        let cache = cache();
        let mut out = Vec::new();
        let summary = Replayer::new(&cache, &mut out, 3, 0)
            .replay(Cursor::new(TRACE))
            .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                events: 6,
                reads: 1,
                writes: 3,
                diffs: 1,
                cleaned: 0
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "--- /etc/app.conf (cached)\n+++ /etc/app.conf (new write)\n-1:port = 80\n+1:port = 81\n 2:host = a\n"
        );
        assert_eq!(
            cache.get_old_content(PathHash::of("/tmp/new"), 0, 2).as_deref(),
            Some(&b"hi"[..])
        );
    }

    #[sniff_test::test]
    fn test_replay_with_color() {
        let cache = cache();
        let mut out = Vec::new();
        Replayer::new(&cache, &mut out, -1, 0)
            .with_color(true)
            .replay(Cursor::new(TRACE))
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("\x1b[31m-1:port = 80\x1b[0m\n"));
        assert!(out.contains("\x1b[32m+1:port = 81\x1b[0m\n"));
        assert!(out.contains("\n 2:host = a\n"));
    }

    #[sniff_test::test]
    fn test_periodic_cleanup_expires_idle_keys() {
        let clock = ManualClock::new();
        let cache = FileCache::new(
            ByteUnit::from_kb(64),
            ByteUnit::from_mb(1),
            Duration::from_secs(60),
            clock.clone(),
        );
        cache.add_read(PathHash::of("/old"), 0, b"stale");
        clock.advance(Duration::from_secs(120));

        let summary = Replayer::new(&cache, std::io::sink(), 3, 2)
            .replay(Cursor::new(TRACE))
            .unwrap();
        assert_eq!(summary.cleaned, 1);
        assert!(!cache.contains_key(PathHash::of("/old")));
        assert!(cache.contains_key(PathHash::of("/etc/app.conf")));
    }

    #[sniff_test::test]
    fn test_replay_stops_at_bad_event() {
        let cache = cache();
        let trace = "{\"op\": \"read\", \"path\": \"a\", \"data\": \"x\"}\n{\"op\": \"read\", \"path\": \"a\"}\n";
        assert_matches!(
            Replayer::new(&cache, std::io::sink(), 3, 0).replay(Cursor::new(trace)),
            Err(ToolErr::MissingPayload { line: 2, .. })
        );
        assert_eq!(cache.len(), 1);
    }
}
