use std::{
    fs::{File, OpenOptions},
    io::{self, BufReader, IsTerminal, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use clap::{Parser, Subcommand};
use sniff_filecache::{FileCache, PathHash, PrettyStyle, diff};
use sniff_tracing::{TracingConsumer, init_tracing, init_tracing_with_writer};

use crate::{config::ToolConfig, err::ToolErr, replay::Replayer};

mod config;
mod err;
mod replay;
mod trace;

#[derive(Debug, Subcommand)]
enum Tool {
    /// Replay a JSON-lines trace of file events through the cache, printing
    /// a diff for every write which changes previously seen content
    Replay {
        trace: PathBuf,

        /// Lines of context around each change; negative prints whole diffs
        #[clap(short = 'C', long, allow_negative_numbers = true)]
        context: Option<isize>,

        /// Colorize diffs
        #[clap(long)]
        color: bool,
    },

    /// Print the cache key for each path
    Hash {
        #[clap(required = true)]
        paths: Vec<String>,
    },

    /// Diff two files with the same engine used for writes
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Lines of context around each change; negative prints whole diffs
        #[clap(short = 'C', long, allow_negative_numbers = true)]
        context: Option<isize>,

        /// Print an inline character diff instead of a line diff
        #[clap(long)]
        pretty: bool,
    },
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file to load after ./sniff.toml (defaults to $SNIFF_CONFIG)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    tool: Tool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match ToolConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            init_tracing(TracingConsumer::Tool, None);
            tracing::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = setup_logging(&config) {
        init_tracing(TracingConsumer::Tool, None);
        tracing::warn!("logging to stderr: {err}");
    }

    match run(cli.tool, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(config: &ToolConfig) -> Result<(), ToolErr> {
    let Some(path) = &config.log_file else {
        init_tracing(TracingConsumer::Tool, None);
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(ToolErr::io(path))?;
    init_tracing_with_writer(TracingConsumer::Tool, None, Mutex::new(file));
    tracing::info!("log file opened");
    Ok(())
}

fn run(tool: Tool, config: &ToolConfig) -> Result<(), ToolErr> {
    match tool {
        Tool::Replay { trace, context, color } => {
            if let Ok(toml) = toml::to_string_pretty(config) {
                tracing::info!("loaded configuration:\n{toml}");
            }

            let cache = FileCache::from_config(&config.cache);
            let reader = BufReader::new(File::open(&trace).map_err(ToolErr::io(&trace))?);
            let stdout = io::stdout();
            let color = color && stdout.is_terminal();

            let summary = Replayer::new(
                &cache,
                stdout.lock(),
                context.unwrap_or(config.context_lines),
                config.cleanup_every,
            )
            .with_color(color)
            .replay(reader)?;

            tracing::info!(?summary, "replay complete");
            tracing::info!(stats = ?cache.stats(), "final cache state");
        }

        Tool::Hash { paths } => {
            let mut out = io::stdout().lock();
            for path in paths {
                writeln!(out, "{}  {path}", PathHash::of(&path))?;
            }
        }

        Tool::Diff { old, new, context, pretty } => {
            let style = if io::stdout().is_terminal() {
                PrettyStyle::Ansi
            } else {
                PrettyStyle::Plain
            };
            let context = context.unwrap_or(config.context_lines);
            if let Some(out) = diff_files(&old, &new, context, pretty.then_some(style))? {
                let mut stdout = io::stdout().lock();
                stdout.write_all(out.as_bytes())?;
                if pretty {
                    writeln!(stdout)?;
                }
            }
        }
    }
    Ok(())
}

/// Diffs two files, returning `None` when their contents render identically.
fn diff_files(
    old: &Path,
    new: &Path,
    context: isize,
    pretty: Option<PrettyStyle>,
) -> Result<Option<String>, ToolErr> {
    let old_bytes = std::fs::read(old).map_err(ToolErr::io(old))?;
    let new_bytes = std::fs::read(new).map_err(ToolErr::io(new))?;

    Ok(match pretty {
        Some(style) => diff::pretty_diff(&old_bytes, &new_bytes, style),
        None => diff::elided_unified_diff(
            &old_bytes,
            &new_bytes,
            &new.display().to_string(),
            context,
        ),
    })
}
