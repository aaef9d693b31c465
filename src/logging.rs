//! Structured logging utilities for snb
//!
//! Diagnostics go to stderr through `tracing`; the build narration itself
//! (step headings, child output) is written directly by `cli_utils` and is
//! not affected by the log level.
//!
//! # Log Format Conventions
//!
//! - `operation`: The operation being performed (e.g., "is_cached", "save", "hash")
//! - `status`: The result status ("success", "miss", "error")
//! - `step`: Zero-based step index
//! - `path`: Referenced path as reported by the resolver
//!
//! # Examples
//!
//! ```bash
//! # Show every cache decision
//! RUST_LOG=snb=debug snb
//!
//! # JSON lines for CI log collectors
//! SNB_LOG_FORMAT=json snb
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Custom formatter that shows "snb" instead of full module path
struct SnbFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for SnbFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m", // Red
                tracing::Level::WARN => "\x1b[33m",  // Yellow
                tracing::Level::INFO => "\x1b[32m",  // Green
                tracing::Level::DEBUG => "\x1b[34m", // Blue
                tracing::Level::TRACE => "\x1b[35m", // Magenta
            };
            write!(writer, "{}{:5}(snb)\x1b[0m: ", level_style, meta.level())?;
        } else {
            write!(writer, "{:5}(snb): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    Pretty,
    /// Compact format (for CI)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    /// Parse a format name, falling back on the CI default
    pub fn parse(value: &str, in_ci: bool) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ => {
                if in_ci {
                    Self::Compact
                } else {
                    Self::Pretty
                }
            }
        }
    }

    /// Parse from environment variable (SNB_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            &std::env::var("SNB_LOG_FORMAT").unwrap_or_default(),
            std::env::var("CI").is_ok(),
        )
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (default "warn")
/// - `SNB_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match LogFormat::from_env() {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(SnbFormatter {
                            with_ansi: io::IsTerminal::is_terminal(&io::stderr()),
                        })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(SnbFormatter { with_ansi: false })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(false)
                        .with_writer(io::stderr)
                        .json(),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(LogFormat::parse("JSON", false), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact", false), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty", true), LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_format_depends_on_ci() {
        assert_eq!(LogFormat::parse("", false), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("", true), LogFormat::Compact);
    }
}
