//! Logging setup (tracing + tracing-subscriber)
//!
//! Console output always goes to stderr: several commands print JSON on
//! stdout and callers pipe it. A rolling log file can be added through
//! `[logging] file`, which is mostly useful for long `watch` sessions.
//! `RUST_LOG` still narrows or widens individual modules.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the file writer alive; logs are flushed when it drops.
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

// ─────────────────────────────────────────────────────────────────
// Plan
// ─────────────────────────────────────────────────────────────────

/// Where and how to log, resolved from settings and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogPlan {
    level: Level,
    json: bool,
    file: Option<FileTarget>,
}

impl LogPlan {
    fn new(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else {
            match verbose {
                0 => parse_level(&settings.level),
                1 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };

        let file = settings
            .file
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(|f| FileTarget::new(Path::new(f), settings.max_file_size_mb, settings.max_files));

        Self {
            level,
            json: settings.json_format,
            file,
        }
    }
}

/// A rolling log file, split into the pieces tracing-appender wants.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileTarget {
    directory: PathBuf,
    prefix: String,
    suffix: String,
    rotation: Rotation,
    max_files: usize,
}

impl FileTarget {
    fn new(path: &Path, max_size_mb: u64, max_files: u32) -> Self {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("hub")
            .to_string();
        let suffix = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("log")
            .to_string();

        // Rotation is time based; a small size budget rotates hourly.
        let rotation = if max_size_mb > 0 && max_size_mb < 10 {
            Rotation::HOURLY
        } else {
            Rotation::DAILY
        };

        Self {
            directory,
            prefix,
            suffix,
            rotation,
            max_files: max_files.max(1) as usize,
        }
    }

    fn open(&self) -> Result<RollingFileAppender> {
        fs::create_dir_all(&self.directory).map_err(|e| Error::IoWrite {
            path: self.directory.clone(),
            source: e,
        })?;

        RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(&self.prefix)
            .filename_suffix(&self.suffix)
            .max_log_files(self.max_files)
            .build(&self.directory)
            .map_err(|e| Error::config_field_invalid("logging.file", format!("cannot open log file: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────

/// Install the global subscriber for a hub command.
///
/// Keep the returned guards until the process exits.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let plan = LogPlan::new(settings, verbose, quiet);
    let filter = build_env_filter(plan.level)?;

    let console = format_layer(io::stderr, plan.json, true);

    let (file_layer, file_guard) = match &plan.file {
        Some(target) => {
            let (writer, guard) = tracing_appender::non_blocking(target.open()?);
            (Some(format_layer(writer, plan.json, false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(level = %plan.level, file = ?plan.file.as_ref().map(|f| &f.directory), json = plan.json, "Logging initialized");

    Ok(LogGuards {
        _file_guard: file_guard,
    })
}

/// Minimal stderr logging for commands that never touch the profile.
pub fn init_simple(level: Level) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).compact())
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// RUST_LOG wins for the modules it names; the hub itself always logs at
/// the requested level and the HTTP stack stays at warn.
fn build_env_filter(level: Level) -> Result<EnvFilter> {
    let base = level.to_string().to_lowercase();

    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&base))
        .add_directive(directive(&format!("nexus_hub={}", base))?)
        .add_directive(directive("hyper=warn")?)
        .add_directive(directive("reqwest=warn")?))
}

fn directive(text: &str) -> Result<Directive> {
    text.parse()
        .map_err(|e| Error::config_field_invalid("logging.level", format!("bad filter '{}': {}", text, e)))
}

/// One fmt layer. Files get source locations and no colour; the console
/// stays compact.
fn format_layer<S, W>(writer: W, json: bool, console: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(console && !json)
        .with_file(!console)
        .with_line_number(!console)
        .with_thread_ids(!console);

    if json {
        Box::new(layer.json().with_span_events(FmtSpan::CLOSE))
    } else if console {
        Box::new(layer.compact())
    } else {
        Box::new(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(level: &str) -> LoggingSettings {
        LoggingSettings {
            level: level.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }

    #[test]
    fn test_flags_override_configured_level() {
        let cfg = settings("warn");
        assert_eq!(LogPlan::new(&cfg, 0, false).level, Level::WARN);
        assert_eq!(LogPlan::new(&cfg, 1, false).level, Level::DEBUG);
        assert_eq!(LogPlan::new(&cfg, 3, false).level, Level::TRACE);
        // quiet beats verbose
        assert_eq!(LogPlan::new(&cfg, 2, true).level, Level::ERROR);
    }

    #[test]
    fn test_no_file_by_default() {
        let plan = LogPlan::new(&LoggingSettings::default(), 0, false);
        assert!(plan.file.is_none());

        let mut cfg = LoggingSettings::default();
        cfg.file = Some("  ".to_string());
        assert!(LogPlan::new(&cfg, 0, false).file.is_none());
    }

    #[test]
    fn test_file_target_splits_path() {
        let target = FileTarget::new(Path::new("/var/log/nexus/hub.log"), 100, 5);
        assert_eq!(target.directory, PathBuf::from("/var/log/nexus"));
        assert_eq!(target.prefix, "hub");
        assert_eq!(target.suffix, "log");
        assert_eq!(target.rotation, Rotation::DAILY);
        assert_eq!(target.max_files, 5);

        let bare = FileTarget::new(Path::new("watch.txt"), 5, 0);
        assert_eq!(bare.directory, PathBuf::from("."));
        assert_eq!(bare.suffix, "txt");
        assert_eq!(bare.rotation, Rotation::HOURLY);
        assert_eq!(bare.max_files, 1);
    }

    #[test]
    fn test_env_filter_builds() {
        assert!(build_env_filter(Level::INFO).is_ok());
        assert!(build_env_filter(Level::TRACE).is_ok());
        assert!(directive("nexus_hub=loud").is_err());
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("hub.log");

        let target = FileTarget::new(&path, 100, 3);
        assert!(target.open().is_ok());
        assert!(temp_dir.path().join("logs").is_dir());
    }
}
