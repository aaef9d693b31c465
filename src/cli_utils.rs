/// CLI utilities for consistent output formatting
///
/// All helpers are plain functions over a writer. Whether to emit ANSI
/// escapes is decided by the caller, usually once per run via `use_ansi`.
use std::io::{self, IsTerminal, Write};

/// Prefix for per-step status lines
pub const LOG_PREFIX: &str = " ---> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Bold white, step announcements
    Heading,
    /// White, status lines and child stdout
    Plain,
    /// Bold green, build summary on success
    Success,
    /// Bold red, build summary on failure
    Failure,
    /// Red, child stderr
    Error,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Heading => "\x1b[1;37m",
            Style::Plain => "\x1b[37m",
            Style::Success => "\x1b[1;32m",
            Style::Failure => "\x1b[1;31m",
            Style::Error => "\x1b[31m",
        }
    }
}

/// Whether a stream should receive ANSI colors
pub fn use_ansi<S: IsTerminal>(stream: &S) -> bool {
    stream.is_terminal()
}

/// Prefix for messages from snb itself. Bright cyan when `ansi` is set.
pub fn snb_prefix(ansi: bool) -> &'static str {
    if ansi {
        "\x1b[96m[snb]\x1b[0m"
    } else {
        "[snb]"
    }
}

/// Wrap `text` in the escape codes for `style`
pub fn paint(text: &str, style: Style, ansi: bool) -> String {
    if ansi {
        format!("{}{}\x1b[0m", style.code(), text)
    } else {
        text.to_string()
    }
}

/// Write one styled line
pub fn write_line<W: Write>(out: &mut W, text: &str, style: Style, ansi: bool) -> io::Result<()> {
    writeln!(out, "{}", paint(text, style, ansi))
}

/// `Step i/N : <definition>`, with `position` counted from 1
pub fn step_heading<W: Write>(
    out: &mut W,
    position: usize,
    total: usize,
    definition: &str,
    ansi: bool,
) -> io::Result<()> {
    write_line(
        out,
        &format!("Step {}/{} : {}", position, total, definition),
        Style::Heading,
        ansi,
    )
}

pub fn using_cache<W: Write>(out: &mut W, ansi: bool) -> io::Result<()> {
    write_line(out, &format!("{}Using cache", LOG_PREFIX), Style::Plain, ansi)
}

pub fn running<W: Write>(out: &mut W, ansi: bool) -> io::Result<()> {
    write_line(out, &format!("{}Running", LOG_PREFIX), Style::Plain, ansi)
}

pub fn build_completed<W: Write>(out: &mut W, seconds: f64, ansi: bool) -> io::Result<()> {
    write_line(
        out,
        &format!("\nBuild completed ({:.6} seconds)", seconds),
        Style::Success,
        ansi,
    )
}

pub fn build_failed<W: Write>(out: &mut W, exit_code: Option<i32>, ansi: bool) -> io::Result<()> {
    let text = match exit_code {
        Some(code) => format!("\nBuild failed (exit status: {})", code),
        None => "\nBuild failed".to_string(),
    };
    write_line(out, &text, Style::Failure, ansi)
}

/// One-line error summary
pub fn error_summary<W: Write>(out: &mut W, message: &str, ansi: bool) -> io::Result<()> {
    write_line(out, &format!("Error: {}.", message), Style::Failure, ansi)
}
