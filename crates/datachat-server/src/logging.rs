//! Structured logging for the Datachat server
//!
//! One subscriber serves every command: console output in pretty, JSON or
//! compact form, an optional daily log file, and a filter that keeps the
//! datachat crates at `info` while HTTP and model-client internals stay quiet.

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "datachat-server";
const LOG_FILE_SUFFIX: &str = "log";

/// Levels for the workspace crates when `RUST_LOG` is unset
const SERVICE_DIRECTIVES: &[&str] = &[
    "info",
    "datachat_server=info",
    "datachat_store=info",
    "datachat_duck=info",
];

/// Crates that log every connection or request at debug level
const QUIET_CRATES: &[&str] = &["hyper", "h2", "tokio", "tower", "reqwest", "async_openai"];

/// Console rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, coloured; the default for local runs
    Pretty,
    /// One JSON object per event
    Json,
    Compact,
}

impl LogFormat {
    /// Read `LOG_FORMAT`
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Where events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    /// Daily file under `LOG_DIR`
    File,
    Both,
}

impl LogOutput {
    /// Read `LOG_OUTPUT`
    pub fn from_env() -> Self {
        match std::env::var("LOG_OUTPUT").as_deref() {
            Ok("file") => LogOutput::File,
            Ok("both") => LogOutput::Both,
            _ => LogOutput::Stdout,
        }
    }

    fn to_stdout(self) -> bool {
        matches!(self, LogOutput::Stdout | LogOutput::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// Filter directives for a `RUST_LOG` value.
///
/// With no value the service defaults apply. Quiet crates are capped at
/// `warn` unless the caller names them explicitly.
fn filter_directives(rust_log: Option<&str>) -> String {
    let mut directives: Vec<String> = match rust_log.map(str::trim) {
        Some(custom) if !custom.is_empty() => vec![custom.to_string()],
        _ => SERVICE_DIRECTIVES.iter().map(|d| d.to_string()).collect(),
    };

    for krate in QUIET_CRATES {
        let named = rust_log.is_some_and(|custom| {
            custom.split(',').any(|d| d.trim().starts_with(krate))
        });
        if !named {
            directives.push(format!("{krate}=warn"));
        }
    }

    directives.join(",")
}

fn build_filter() -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    EnvFilter::new(filter_directives(rust_log.as_deref()))
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_ids(true)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

fn file_appender(log_dir: &str) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(log_dir).map_err(|e| format!("cannot create {log_dir}: {e}"))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)
        .map_err(|e| format!("cannot open log file in {log_dir}: {e}"))
}

/// Install the global subscriber.
///
/// Environment variables:
/// - `RUST_LOG`: filter, e.g. `datachat_server=debug,datachat_store=trace`
/// - `LOG_FORMAT`: `pretty`, `json` or `compact`
/// - `LOG_OUTPUT`: `stdout`, `file` or `both`
/// - `LOG_DIR`: directory for the daily file (default `./logs`)
///
/// `Config::apply_logging_env` fills these from the `logging` section of the
/// config file when they are not already set.
///
/// ```bash
/// # Query pipeline at debug, everything else at info
/// RUST_LOG=info,datachat_server=debug datachat-server serve
///
/// # Ship JSON to /var/log/datachat
/// LOG_FORMAT=json LOG_OUTPUT=file LOG_DIR=/var/log/datachat datachat-server serve
/// ```
pub fn init() {
    let format = LogFormat::from_env();
    let mut output = LogOutput::from_env();
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());

    let file = if output.to_file() {
        match file_appender(&log_dir) {
            Ok(appender) => Some(appender),
            Err(reason) => {
                // Subscriber is not installed yet
                eprintln!("File logging disabled, {reason}");
                output = LogOutput::Stdout;
                None
            }
        }
    } else {
        None
    };

    let console = output.to_stdout().then(|| console_layer(format));
    let file_layer = file.map(|appender| fmt::layer().with_writer(appender).with_ansi(false));

    tracing_subscriber::registry()
        .with(build_filter())
        .with(console)
        .with(file_layer)
        .init();

    tracing::info!(format = ?format, output = ?output, "Logging system initialized");
}

/// Emit an event with an `event` name and debug-formatted fields
///
/// ```ignore
/// log_event!(
///     level: tracing::Level::INFO,
///     event: "query_executed",
///     rows: 100
/// );
/// ```
#[macro_export]
macro_rules! log_event {
    (level: $level:expr, event: $event:expr $(, $key:ident: $value:expr)* $(,)?) => {
        tracing::event!(
            $level,
            event = $event
            $(, $key = ?$value)*
        );
    };
}
