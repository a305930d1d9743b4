//! Logging configuration for Quarry
//!
//! Structured logging through `tracing`. The query engine emits predicate
//! construction failures and evaluation summaries at `debug`, per-object
//! matches at `trace`, and commits and snapshot I/O at `info`/`debug`.

use quarry_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a daily-rotated file
    File(PathBuf),
    /// Output to both stdout and file
    Both(PathBuf),
}

impl LogOutput {
    fn to_stdout(&self) -> bool {
        matches!(self, LogOutput::Stdout | LogOutput::Both(_))
    }

    fn file(&self) -> Option<&Path> {
        match self {
            LogOutput::Stdout => None,
            LogOutput::File(path) | LogOutput::Both(path) => Some(path),
        }
    }
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level (`info`) or filter directives (`quarry_core=trace,info`)
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

impl LogConfig {
    /// Info level, stdout
    pub fn info() -> Self {
        Self::default()
    }

    /// Debug level, stdout; shows query summaries
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Trace level, stdout; shows every matched object
    pub fn trace() -> Self {
        Self::default().with_level("trace")
    }

    /// Warn level, stdout
    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stdout and file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Builds the filter for the configured level, ignoring `RUST_LOG`.
    ///
    /// A bare word must be a level name; anything with `=` or `,` is parsed
    /// as filter directives.
    pub fn filter(&self) -> Result<EnvFilter> {
        let invalid = |detail: String| {
            Error::InvalidInput(format!("invalid log level '{}': {}", self.level, detail))
        };

        if !self.level.contains(['=', ',']) {
            self.level
                .trim()
                .parse::<LevelFilter>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        EnvFilter::try_new(&self.level).map_err(|e| invalid(e.to_string()))
    }

    /// Initialize global logging with this configuration
    ///
    /// `RUST_LOG`, when set and valid, overrides the configured level.
    /// Returns a guard for file output that must be kept alive for logging
    /// to flush; dropping it shuts the writer thread down.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use quarry::logging::LogConfig;
    ///
    /// // Keep the guard alive for the lifetime of your application
    /// let _guard = LogConfig::debug().init()?;
    /// # Ok::<(), quarry::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let configured = self.filter()?;
        let filter = EnvFilter::try_from_default_env().unwrap_or(configured);

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if self.output.to_stdout() {
            layers.push(fmt_layer(self.format, std::io::stdout, true));
        }

        let mut guard = None;
        if let Some(path) = self.output.file() {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("quarry.log");
            let (writer, file_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            layers.push(fmt_layer(self.format, writer, false));
            guard = Some(file_guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .map_err(|e| Error::InvalidOperation(format!("logging already initialised: {}", e)))?;

        Ok(guard)
    }
}
