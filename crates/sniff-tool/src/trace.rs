//! Captured file activity, one JSON event per line:
//!
//! ```json
//! {"op": "read", "path": "/etc/hosts", "offset": 0, "data": "127.0.0.1 localhost\n"}
//! {"op": "write", "path": "/var/db/blob", "offset": 512, "hex": "deadbeef"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::{
    fmt::{self, Display},
    io::BufRead,
};

use serde::Deserialize;

use crate::err::ToolErr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOp {
    Open,
    Read,
    Write,
    Close,
    Seek,
}

impl Display for EventOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventOp::Open => "open",
            EventOp::Read => "read",
            EventOp::Write => "write",
            EventOp::Close => "close",
            EventOp::Seek => "seek",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub op: EventOp,
    pub path: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub hex: Option<String>,
}

impl Event {
    /// The bytes carried by a read or write. `hex` wins over `data` when
    /// both are present.
    pub fn payload(&self, line: usize) -> Result<Vec<u8>, ToolErr> {
        match (&self.hex, &self.data) {
            (Some(hex), _) => {
                hex::decode(hex).map_err(|source| ToolErr::HexDecode { line, source })
            }
            (None, Some(data)) => Ok(data.as_bytes().to_vec()),
            (None, None) => Err(ToolErr::MissingPayload { line, op: self.op }),
        }
    }
}

/// Iterates over the events in `reader`, yielding each with its 1-based line
/// number.
pub fn events<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, Event), ToolErr>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line_no = idx + 1;
            match line {
                Err(source) => Some(Err(ToolErr::TraceRead { line: line_no, source })),
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        return None;
                    }
                    Some(
                        serde_json::from_str(line)
                            .map(|event| (line_no, event))
                            .map_err(|source| ToolErr::TraceParse { line: line_no, source }),
                    )
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;

    use super::*;

    #[sniff_test::test]
    fn test_parse_events() {
        let trace = r#"
# captured by hand
{"op": "open", "path": "/tmp/a"}
{"op": "read", "path": "/tmp/a", "offset": 4, "data": "abc"}

{"op": "write", "path": "/tmp/a", "offset": 4, "hex": "00ff"}
"#;
        let events: Vec<_> = events(Cursor::new(trace))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(events.len(), 3);

        let (line, open) = &events[0];
        assert_eq!(*line, 3);
        assert_eq!(open.op, EventOp::Open);
        assert_eq!(open.offset, 0);
        assert_matches!(open.payload(*line), Err(ToolErr::MissingPayload { line: 3, op: EventOp::Open }));

        let (line, read) = &events[1];
        assert_eq!(read.payload(*line).unwrap(), b"abc");

        let (line, write) = &events[2];
        assert_eq!(*line, 6);
        assert_eq!(write.payload(*line).unwrap(), vec![0x00, 0xff]);
    }

    #[sniff_test::test]
    fn test_errors_carry_line_numbers() {
        let trace = "{\"op\": \"read\", \"path\": \"a\", \"data\": \"x\"}\n{\"op\": \"truncate\", \"path\": \"a\"}\n";
        let results: Vec<_> = events(Cursor::new(trace)).collect();
        assert_matches!(results[0], Ok((1, _)));
        assert_matches!(results[1], Err(ToolErr::TraceParse { line: 2, .. }));

        let event: Event =
            serde_json::from_str(r#"{"op": "write", "path": "a", "hex": "xyz"}"#).unwrap();
        assert_matches!(event.payload(9), Err(ToolErr::HexDecode { line: 9, .. }));
    }
}
