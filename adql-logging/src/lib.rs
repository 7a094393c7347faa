use std::str::FromStr;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Corresponds to [`tracing_subscriber::fmt::format::Compact`]
    Compact,

    /// Corresponds to [`tracing_subscriber::fmt::format::Full`]
    #[default]
    Full,

    /// Corresponds to [`tracing_subscriber::fmt::format::Pretty`]
    Pretty,

    /// Corresponds to [`tracing_subscriber::fmt::format::Json`]
    Json,
}

/// Error type for the [`FromStr`] implementation for [`LogFormat`]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid log format '{0}', expected one of 'compact', 'full', 'pretty', or 'json'")]
pub struct InvalidLogFormat(String);

impl FromStr for LogFormat {
    type Err = InvalidLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| InvalidLogFormat(s.to_owned()))
    }
}

pub fn warn_if_debug_build() {
    if cfg!(debug_assertions) {
        warn!("Running a debug build")
    }
}

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Format to use when emitting log events.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Full)]
    pub log_format: LogFormat,

    /// Log level filter for spans and events. The log level filter string is a comma separated
    /// list of directives.
    /// See [`tracing_subscriber::EnvFilter`] for full documentation on the directive syntax.
    ///
    /// Examples:
    ///
    /// Log at INFO level for all crates and dependencies.
    /// ```bash
    /// LOG_LEVEL=info
    /// ```
    ///
    /// Log the wire level details of the geography codec, and nothing else.
    /// ```bash
    /// LOG_LEVEL=warn,adql_geography=trace
    /// ```
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Full,
            log_level: "info".to_owned(),
        }
    }
}

impl Options {
    /// Install the global tracing subscriber. Logs go to stderr, so that the output of the
    /// binaries can be piped.
    pub fn init(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_new(&self.log_level)?;
        let s = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        match self.log_format {
            LogFormat::Compact => s.compact().try_init(),
            LogFormat::Full => s.try_init(),
            LogFormat::Pretty => s.pretty().try_init(),
            LogFormat::Json => s.json().with_current_span(true).try_init(),
        }
        .map_err(|e| anyhow::anyhow!(e))?;

        warn_if_debug_build();

        Ok(())
    }
}

/// Configure the global tracing subscriber for logging inside of tests
pub fn init_test_logging() {
    // This errors out if it's already been called within the scope of a process, which we don't
    // care about, so we just discard the result
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("LOG_LEVEL"))
        .with_test_writer()
        .try_init();
}
