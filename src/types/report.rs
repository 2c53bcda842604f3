//! Validation report collected over a run.
//!
//! Recoverable conditions are recorded as warnings and never stop a run.
//! Fatal conditions are recorded as errors naming the unit they aborted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Logged, run continues.
    Warning,
    /// Aborted the unit it names.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Unit of work a diagnostic refers to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Unit {
    /// The whole run.
    Run,
    /// A chapter, by 1-based number.
    Chapter(u32),
    /// A localization group ("chapter_2", "sharedstrings", ...) in a language.
    Group {
        /// Group tag.
        group: String,
        /// Language code.
        language: String,
    },
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Chapter(n) => write!(f, "chapter {}", n),
            Self::Group { group, language } => write!(f, "{} [{}]", group, language),
        }
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Where it happened.
    pub unit: Unit,
    /// Actionable message naming the key/entity/file.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.unit, self.message)
    }
}

/// Ordered list of diagnostics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, unit: Unit, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            unit,
            message: message.into(),
        };
        tracing::warn!(unit = %diagnostic.unit, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Record a fatal problem for `unit`.
    pub fn error(&mut self, unit: Unit, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            unit,
            message: message.into(),
        };
        tracing::error!(unit = %diagnostic.unit, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// All diagnostics in record order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Errors only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// First error recorded, if any.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.errors().next()
    }

    /// Whether no error was recorded.
    pub fn is_ok(&self) -> bool {
        self.first_error().is_none()
    }

    /// Human-readable listing, one diagnostic per line.
    pub fn render(&self) -> String {
        self.diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
