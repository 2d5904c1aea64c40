//! Collected findings
//!
//! Structural and graph-consistency problems never abort a run. They are
//! pushed here as they are found and returned alongside the canonical
//! output. Logging them is a separate step so verbosity cannot change what
//! gets reported.

use serde::Serialize;
use std::fmt;

/// How bad a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recoverable, the affected feature fell back to a default
    Warning,
    /// The affected mesh or material failed validation
    Error,
}

/// Which tier of the error model a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Count or topology mismatch in a mesh
    Structural,
    /// Dangling reference in a skeleton or shading graph
    GraphConsistency,
}

/// A single finding about one scene element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    /// Path or name of the element the finding is about
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Ordered list of findings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Record a recoverable graph-consistency warning
    pub fn warn(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            category: Category::GraphConsistency,
            subject: subject.into(),
            message: message.into(),
        });
    }

    /// Record a structural failure
    pub fn fail(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            category: Category::Structural,
            subject: subject.into(),
            message: message.into(),
        });
    }

    /// Record a broken shading-graph connection or type
    pub fn reject(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            category: Category::GraphConsistency,
            subject: subject.into(),
            message: message.into(),
        });
    }

    /// Record a structural warning (element skipped, nothing failed)
    pub fn note(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            category: Category::Structural,
            subject: subject.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// Emit every finding through `tracing`
    ///
    /// Errors are always logged. Warnings only when `verbose` is set.
    pub fn log(&self, verbose: bool) {
        for diagnostic in &self.items {
            match diagnostic.severity {
                Severity::Error => tracing::error!("{}", diagnostic),
                Severity::Warning if verbose => tracing::warn!("{}", diagnostic),
                Severity::Warning => tracing::debug!("{}", diagnostic),
            }
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
