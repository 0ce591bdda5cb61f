//! Recoverable problems recorded during a conversion.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

/// Pipeline stage that recorded a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reader,
    Catalog,
    Structure,
    Resolver,
    Categorizer,
    Emitter,
    Compatibility,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Reader => "reader",
            Stage::Catalog => "catalog",
            Stage::Structure => "structure",
            Stage::Resolver => "resolver",
            Stage::Categorizer => "categorizer",
            Stage::Emitter => "emitter",
            Stage::Compatibility => "compatibility",
        }
    }
}

/// What kind of recovery took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Broken subtree or payload replaced by a stub/placeholder.
    PartialDamage,
    /// Reference that matched nothing; a fallback stub was emitted.
    UnresolvableReference,
    /// Content deliberately left out of the backup.
    SkippedItem,
    /// Source feature Moodle cannot represent faithfully.
    Compatibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub stage: Stage,
    pub kind: WarningKind,
    pub severity: Severity,
    /// The id, path or title the warning is about.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.severity,
            self.stage.as_str(),
            self.subject,
            self.message
        )
    }
}

/// Ordered warning list threaded through the pipeline.
///
/// Every push is also logged, so a run with logging enabled shows the same
/// problems the final report lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        match warning.severity {
            Severity::Info => info!(
                stage = warning.stage.as_str(),
                subject = %warning.subject,
                "{}",
                warning.message
            ),
            Severity::Warning | Severity::Error => warn!(
                stage = warning.stage.as_str(),
                subject = %warning.subject,
                "{}",
                warning.message
            ),
        }
        self.items.push(warning);
    }

    /// Record a warning-severity problem.
    pub fn warn(
        &mut self,
        stage: Stage,
        kind: WarningKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.record(stage, kind, Severity::Warning, subject, message);
    }

    /// Record an informational note.
    pub fn note(
        &mut self,
        stage: Stage,
        kind: WarningKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.record(stage, kind, Severity::Info, subject, message);
    }

    pub fn record(
        &mut self,
        stage: Stage,
        kind: WarningKind,
        severity: Severity,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Warning {
            stage,
            kind,
            severity,
            subject: subject.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: Warnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.items.iter().filter(move |w| w.kind == kind)
    }

    pub fn from_stage(&self, stage: Stage) -> impl Iterator<Item = &Warning> {
        self.items.iter().filter(move |w| w.stage == stage)
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let mut warnings = Warnings::new();
        warnings.warn(Stage::Resolver, WarningKind::UnresolvableReference, "99", "no match");
        warnings.note(Stage::Catalog, WarningKind::PartialDamage, "a.xml", "dup");
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings.iter().next().unwrap().subject, "99");
        assert_eq!(warnings.of_kind(WarningKind::PartialDamage).count(), 1);
        assert_eq!(warnings.from_stage(Stage::Resolver).count(), 1);
    }

    #[test]
    fn test_display() {
        let w = Warning {
            stage: Stage::Structure,
            kind: WarningKind::PartialDamage,
            severity: Severity::Warning,
            subject: "Item#4".into(),
            message: "missing RefId".into(),
        };
        assert_eq!(w.to_string(), "[warning] structure Item#4: missing RefId");
    }
}
