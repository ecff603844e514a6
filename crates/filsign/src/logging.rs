//! # Logging
//!
//! `tracing` setup for the binary plus the few helpers the rest of the
//! crate logs through.
//!
//! Events are written to stderr, leaving stdout to command output. With
//! `[logging] file` set, a daily rolling file gets a copy without colors.
//! `RUST_LOG` replaces the configured level when present.
//!
//! ```no_run
//! use filsign::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::default()).expect("logging init");
//! tracing::info!("ready");
//! ```
//!
//! ## Security Events
//!
//! Key creation, import, export, deletion and every signature go through
//! [`log_security_event`] with target [`SECURITY_TARGET`], which lets an
//! operator keep them while silencing everything else:
//!
//! ```text
//! RUST_LOG=warn,filsign::security=info filsign send ...
//! ```
//!
//! Keys and the seed never reach a log macro. Bearer tokens are shown
//! through [`redact_sensitive`]:
//!
//! ```
//! use filsign::logging::redact_sensitive;
//!
//! assert_eq!(redact_sensitive("eyJhbGciOiJIUzI1NiJ9"), "eyJh***NiJ9");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use filsign_core::config::LogSettings;
use filsign_core::OperationKind;
use rand::RngCore;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Target of [`log_security_event`].
pub const SECURITY_TARGET: &str = "filsign::security";

/// Shortest secret [`redact_sensitive`] shows partially.
const PARTIAL_REDACTION_MIN: usize = 12;

/// Characters kept at each end of a partially redacted secret.
const REDACTION_EDGE: usize = 4;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Logging setup failures.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log directory could not be created.
    #[error("cannot create log directory: {0}")]
    FileCreation(String),

    /// Another global subscriber is already installed.
    #[error("cannot install log subscriber: {0}")]
    SubscriberInit(String),

    /// Unknown level or format, or an unusable file name.
    #[error("bad logging setting: {0}")]
    InvalidConfig(String),
}

/// How each event is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored.
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
    /// One line per event.
    Compact,
}

impl LogFormat {
    const ALL: [(&'static str, Self); 3] = [
        ("pretty", Self::Pretty),
        ("json", Self::Json),
        ("compact", Self::Compact),
    ];

    /// Name used in `[logging] format`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Compact => "compact",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, format)| *format)
            .ok_or_else(|| LogError::InvalidConfig(format!("log format '{wanted}'")))
    }
}

/// Parses a level name such as `info` or `WARN`.
///
/// # Errors
///
/// [`LogError::InvalidConfig`] for anything `tracing` does not recognize.
pub fn parse_level(s: &str) -> Result<LevelFilter, LogError> {
    let wanted = s.trim();
    match wanted.to_ascii_lowercase().as_str() {
        "warning" => Ok(LevelFilter::WARN),
        lower => LevelFilter::from_str(lower)
            .map_err(|_| LogError::InvalidConfig(format!("log level '{wanted}'"))),
    }
}

/// Subscriber settings.
///
/// ```
/// use filsign::logging::{LogConfig, LogFormat};
/// use tracing::level_filters::LevelFilter;
///
/// let config = LogConfig {
///     format: LogFormat::Json,
///     ..LogConfig::default()
/// };
/// assert_eq!(config.level, LevelFilter::INFO);
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used unless `RUST_LOG` is set.
    pub level: LevelFilter,
    /// Applies to stderr and the file alike.
    pub format: LogFormat,
    /// Copy of every event, rotated daily.
    pub file_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::default(),
            file_path: None,
        }
    }
}

impl LogConfig {
    /// Combines the `[logging]` section with the `-v` count; any `-v` wins
    /// over the configured level.
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidConfig`] for an unknown level or format.
    pub fn from_settings(settings: &LogSettings, verbose: u8) -> Result<Self, LogError> {
        let level = match verbose {
            0 => parse_level(&settings.level)?,
            n => verbosity_to_level(n),
        };
        Ok(Self {
            level,
            format: settings.format.parse()?,
            file_path: settings.file.as_deref().map(PathBuf::from),
        })
    }
}

/// Flushes the log file when dropped. Hold it for the life of `main`.
#[derive(Debug)]
pub struct LogGuard(Option<WorkerGuard>);

impl LogGuard {
    /// Whether a log file is being written.
    #[must_use]
    pub const fn writes_file(&self) -> bool {
        self.0.is_some()
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails when the log directory cannot be created or a subscriber is
/// already set. An unparsable `RUST_LOG` is ignored in favor of
/// `config.level`.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.level.into()));

    let (file, guard) = match config.file_path.as_deref() {
        Some(path) => {
            let (writer, guard) = open_log_file(path)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer(config.format))
        .with(file.map(|writer| file_layer(config.format, writer)))
        .try_init()
        .map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard(guard))
}

fn stderr_layer<S>(format: LogFormat) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => base.pretty().with_span_events(FmtSpan::CLOSE).boxed(),
        LogFormat::Json => base.json().with_current_span(true).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn file_layer<S>(format: LogFormat, writer: NonBlocking) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let base = fmt::layer().with_writer(writer).with_ansi(false);
    match format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Pretty => base.boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn open_log_file(path: &Path) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LogError::InvalidConfig(format!("log file '{}'", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| LogError::FileCreation(format!("{}: {e}", dir.display())))?;

    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::daily(dir, name),
    ))
}

/// Hides a secret for display.
///
/// Values of twelve or more characters keep four at each end; shorter ones
/// are replaced entirely.
///
/// ```
/// use filsign::logging::redact_sensitive;
///
/// assert_eq!(redact_sensitive("0123456789abcdef"), "0123***cdef");
/// assert_eq!(redact_sensitive("short"), "***");
/// ```
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    let len = value.chars().count();
    if len < PARTIAL_REDACTION_MIN {
        return "***".to_string();
    }
    let head: String = value.chars().take(REDACTION_EDGE).collect();
    let tail: String = value.chars().skip(len - REDACTION_EDGE).collect();
    format!("{head}***{tail}")
}

/// 128 random bits as lowercase hex.
#[must_use]
pub fn new_correlation_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The span every executor operation runs in.
#[must_use]
pub fn operation_span(correlation_id: &str, operation: OperationKind) -> tracing::Span {
    tracing::info_span!("execute", correlation_id, %operation)
}

/// `-v` count to level. No flag means warn.
///
/// ```
/// use filsign::logging::verbosity_to_level;
/// use tracing::level_filters::LevelFilter;
///
/// assert_eq!(verbosity_to_level(0), LevelFilter::WARN);
/// assert_eq!(verbosity_to_level(7), LevelFilter::TRACE);
/// ```
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Emits `event` at info under [`SECURITY_TARGET`]. Never pass key material
/// in `details`.
pub fn log_security_event(event: &str, details: &str) {
    tracing::info!(target: SECURITY_TARGET, event, details, "security event");
}
