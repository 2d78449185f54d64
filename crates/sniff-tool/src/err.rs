use std::path::PathBuf;

use crate::trace::EventOp;

#[derive(Debug, thiserror::Error)]
pub enum ToolErr {
    #[error("failed to load config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("line {line}: failed to read trace: {source}")]
    TraceRead {
        line: usize,
        source: std::io::Error,
    },

    #[error("line {line}: invalid event: {source}")]
    TraceParse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("line {line}: invalid hex payload: {source}")]
    HexDecode {
        line: usize,
        source: hex::FromHexError,
    },

    #[error("line {line}: {op} event has no data or hex payload")]
    MissingPayload { line: usize, op: EventOp },
}

impl ToolErr {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
