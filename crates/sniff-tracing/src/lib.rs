use std::{sync::Once, time::Instant};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        MakeWriter,
        format::{FmtSpan, Writer},
        time::{FormatTime, SystemTime},
    },
    util::SubscriberInitExt,
};

/// Crates which log at trace level while testing.
const TEST_DIRECTIVES: &[&str] = &[
    "sniff_filecache=trace",
    "sniff_test=trace",
    "sniff_tool=trace",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingConsumer {
    Test,
    Tool,
}

/// Initialize tracing on stderr. If no process_id is specified one will be
/// randomly generated.
pub fn init_tracing(consumer: TracingConsumer, process_id: Option<String>) {
    let color = !std::env::var("NO_COLOR").is_ok_and(|s| !s.is_empty());
    init(consumer, process_id, std::io::stderr, color);
}

/// Initialize tracing with a custom writer, such as a log file. ANSI colors
/// are always disabled.
pub fn init_tracing_with_writer<W>(consumer: TracingConsumer, process_id: Option<String>, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    init(consumer, process_id, writer, false);
}

fn init<W>(consumer: TracingConsumer, process_id: Option<String>, writer: W, color: bool)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let testing = consumer == TracingConsumer::Test;

    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if testing {
        for directive in TEST_DIRECTIVES {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let prefix = testing.then(|| {
        process_id.unwrap_or_else(|| bs58::encode(rand::random::<u64>().to_le_bytes()).into_string())
    });

    let time = match consumer {
        TracingConsumer::Test => TimeFormat::Offset { start: Instant::now() },
        TracingConsumer::Tool => TimeFormat::Long(SystemTime),
    };

    static INIT: Once = Once::new();
    INIT.call_once(move || {
        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(color)
            .with_writer(writer)
            .with_timer(TimeAndPrefix::new(prefix, time))
            .finish()
            .try_init();

        // another subscriber may already be installed, e.g. by a test harness
        if let Err(err) = result {
            eprintln!("failed to setup tracing subscriber: {err}");
        }
    });
}

enum TimeFormat {
    Long(SystemTime),
    Offset { start: Instant },
}

struct TimeAndPrefix {
    prefix: Option<String>,
    time: TimeFormat,
}

impl TimeAndPrefix {
    fn new(prefix: Option<String>, time: TimeFormat) -> Self {
        Self { prefix, time }
    }

    fn write_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        match self.time {
            TimeFormat::Long(inner) => inner.format_time(w),
            TimeFormat::Offset { start } => {
                let e = start.elapsed();
                // whole milliseconds, rounded
                let millis = (e.subsec_nanos() as f64 / 1_000_000.0).round();
                write!(w, "{:03}.{millis:03}s", e.as_secs())
            }
        }
    }
}

impl FormatTime for TimeAndPrefix {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        match &self.prefix {
            None => self.write_time(w),
            Some(prefix) => {
                write!(w, "{prefix} ")?;
                self.write_time(w)
            }
        }
    }
}
