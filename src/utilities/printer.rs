//! Console printer for user-visible status lines.
//!
//! Operational logs go through `log`/`tracing` on stderr; the lines printed
//! here are the run's result as the operator sees it (`[skip] ...`,
//! `[dry-run] ...`, the generated text itself).

use serde::{Deserialize, Serialize};

/// Available colors for printed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterColor {
    Yellow,
    Cyan,
    BoldRed,
    BoldGreen,
    BoldYellow,
    Plain,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Yellow => "\x1b[33m",
            Self::Cyan => "\x1b[36m",
            Self::BoldRed => "\x1b[1;31m",
            Self::BoldGreen => "\x1b[1;32m",
            Self::BoldYellow => "\x1b[1;33m",
            Self::Plain => "",
        }
    }
}

/// ANSI reset code.
const RESET: &str = "\x1b[0m";

/// Kind of status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Error,
    Skip,
    DryRun,
    RateLimit,
    Ok,
    Info,
}

impl Status {
    /// Bracketed tag printed before the message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Error => "[error]",
            Self::Skip => "[skip]",
            Self::DryRun => "[dry-run]",
            Self::RateLimit => "[rate-limit]",
            Self::Ok => "[ok]",
            Self::Info => "[info]",
        }
    }

    fn color(&self) -> PrinterColor {
        match self {
            Self::Error => PrinterColor::BoldRed,
            Self::Skip => PrinterColor::Yellow,
            Self::DryRun => PrinterColor::Cyan,
            Self::RateLimit => PrinterColor::BoldYellow,
            Self::Ok => PrinterColor::BoldGreen,
            Self::Info => PrinterColor::Plain,
        }
    }
}

/// Format a status line without color codes.
pub fn status_line(status: Status, message: &str) -> String {
    format!("{} {}", status.tag(), message)
}

/// Printer for console output with optional color support.
#[derive(Debug, Clone, Default)]
pub struct Printer {
    /// Emit ANSI colors.
    pub color: bool,
}

impl Printer {
    /// Create a new `Printer`.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Print a message with the specified color.
    pub fn print(&self, content: &str, color: PrinterColor) {
        if self.color && color != PrinterColor::Plain {
            println!("{}{}{}", color.ansi_code(), content, RESET);
        } else {
            println!("{}", content);
        }
    }

    /// Print a tagged status line.
    pub fn status(&self, status: Status, message: &str) {
        self.print(&status_line(status, message), status.color());
    }

    /// Print content exactly as produced (post text, thread items).
    pub fn text(&self, content: &str) {
        println!("{}", content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_tags() {
        assert_eq!(status_line(Status::Skip, "duplicate"), "[skip] duplicate");
        assert_eq!(
            status_line(Status::RateLimit, "waiting 30s"),
            "[rate-limit] waiting 30s"
        );
        assert_eq!(Status::DryRun.tag(), "[dry-run]");
    }
}
