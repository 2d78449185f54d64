use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use sniff_filecache::CacheConfig;

use crate::err::ToolErr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub cache: CacheConfig,

    /// Unchanged lines kept around each change when printing diffs. Negative
    /// values print whole diffs.
    pub context_lines: isize,

    /// Run cache cleanup after this many replayed events. Zero disables
    /// periodic cleanup.
    pub cleanup_every: u64,

    pub log_file: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            cache: Default::default(),
            context_lines: 3,
            cleanup_every: 1000,
            log_file: None,
        }
    }
}

impl ToolConfig {
    /// Layers `sniff.toml` from the current directory, then `explicit` (or
    /// `SNIFF_CONFIG`), then `SNIFF_*` environment variables. Nested keys use
    /// `__`, e.g. `SNIFF_CACHE__PER_KEY_LIMIT="1 MB"`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ToolErr> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("SNIFF_CONFIG").map(PathBuf::from));

        let files = [
            Some(config::File::new("sniff.toml", FileFormat::Toml).required(false)),
            explicit.map(|path| {
                config::File::from(path)
                    .format(FileFormat::Toml)
                    .required(true)
            }),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        let builder = Config::builder().add_source(files).add_source(
            config::Environment::with_prefix("SNIFF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ToolErr> {
        Ok(builder.build()?.try_deserialize()?)
    }
}
