//! Service log sink.
//!
//! # Responsibility
//! - Route `log` records to size-rotated files under one directory, or to
//!   stderr when no directory is configured.
//! - Keep every event on one `event=… module=… status=…` line.
//!
//! # Invariants
//! - One sink per process; a second `init_logging` with the same settings
//!   is a no-op, with different settings an error.
//! - Starting the sink never panics.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "eprint_apid";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED: usize = 5;
const PANIC_TEXT_MAX_CHARS: usize = 200;

static ACTIVE: OnceCell<ActiveSink> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveSink {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Validated sink settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// `None` logs to stderr.
    pub dir: Option<PathBuf>,
}

impl LogSettings {
    /// Accepts `trace|debug|info|warn|warning|error|off` and an absolute
    /// directory.
    pub fn parse(level: &str, dir: &str) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            dir: Some(parse_dir(dir)?),
        })
    }

    pub fn stderr(level: &str) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            dir: None,
        })
    }

    fn target(&self) -> String {
        self.dir
            .as_ref()
            .map_or_else(|| "stderr".to_string(), |dir| dir.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    InvalidDirectory(String),
    AlreadyActive(String),
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(f, "unknown log_level `{level}`"),
            Self::InvalidDirectory(detail) => write!(f, "invalid log directory: {detail}"),
            Self::AlreadyActive(detail) => write!(f, "logging already active: {detail}"),
            Self::Backend(detail) => write!(f, "cannot start log sink: {detail}"),
        }
    }
}

impl Error for LoggingError {}

/// Starts the process log sink.
///
/// Warnings and errors are also copied to stderr.
///
/// # Errors
/// - `UnsupportedLevel`, `InvalidDirectory` for bad settings.
/// - `AlreadyActive` when a sink with other settings is running.
/// - `Backend` when the directory or the file cannot be opened.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    activate(LogSettings::parse(level, log_dir)?)
}

/// Starts a stderr sink for processes without a log directory.
///
/// Same once-per-process rules as [`init_logging`].
pub fn init_stderr_logging(level: &str) -> Result<(), LoggingError> {
    activate(LogSettings::stderr(level)?)
}

fn activate(settings: LogSettings) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| start_sink(settings.clone()))?;
    if active.settings != settings {
        return Err(LoggingError::AlreadyActive(format!(
            "level={} target={}",
            active.settings.level,
            active.settings.target()
        )));
    }
    Ok(())
}

fn start_sink(settings: LogSettings) -> Result<ActiveSink, LoggingError> {
    let spec = LogSpecification::builder().default(settings.level).build();
    let logger = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                LoggingError::Backend(format!("create {}: {err}", dir.display()))
            })?;
            Logger::with(spec)
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_BASENAME),
                )
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .duplicate_to_stderr(Duplicate::Warn)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => Logger::with(spec)
            .log_to_stderr()
            .format(flexi_logger::detailed_format),
    };
    let handle = logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    PANIC_HOOK.get_or_init(install_panic_hook);
    info!(
        "event=logging_start module=logging status=ok level={} target={} pid={} version={}",
        settings.level,
        settings.target(),
        std::process::id(),
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveSink {
        settings,
        _handle: handle,
    })
}

/// Settings of the running sink, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// Level used when the settings file names none.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Single-line, length-capped copy of `value` for log fields.
pub fn sanitize_message(value: &str, max_chars: usize) -> String {
    let mut line = String::with_capacity(value.len().min(max_chars));
    for (count, ch) in value.chars().enumerate() {
        if count == max_chars {
            line.push_str("...");
            break;
        }
        line.push(if ch == '\n' || ch == '\r' { ' ' } else { ch });
    }
    line
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let level = level.trim().to_ascii_lowercase();
    let name = if level == "warning" { "warn" } else { level.as_str() };
    name.parse::<LevelFilter>()
        .map_err(|_| LoggingError::UnsupportedLevel(level.clone()))
}

fn parse_dir(dir: &str) -> Result<PathBuf, LoggingError> {
    let dir = Path::new(dir.trim());
    if dir.as_os_str().is_empty() {
        return Err(LoggingError::InvalidDirectory("empty path".to_string()));
    }
    if !dir.is_absolute() {
        return Err(LoggingError::InvalidDirectory(format!(
            "`{}` is not absolute",
            dir.display()
        )));
    }
    Ok(dir.to_path_buf())
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |at| format!("{}:{}", at.file(), at.line()));
        error!(
            "event=panic module=logging status=error location={location} message={}",
            panic_text(info)
        );
        previous(info);
    }));
}

fn panic_text(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let text = match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(text), _) => text,
        (None, Some(text)) => text.as_str(),
        (None, None) => "opaque panic payload",
    };
    sanitize_message(text, PANIC_TEXT_MAX_CHARS)
}
