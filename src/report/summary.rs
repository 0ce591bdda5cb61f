//! End-of-run summary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use super::{Severity, Warning, Warnings};
use crate::export::BackupContents;
use crate::model::ResolutionSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub number: usize,
    pub name: String,
    pub items: usize,
}

/// What a conversion produced and what it had to work around.
///
/// Serializes to JSON as-is; [`ConversionReport::to_markdown`] gives the
/// human-readable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub course_title: String,
    pub installation_id: String,
    pub backup_file: String,
    pub sections: Vec<SectionSummary>,
    /// Emitted activities per Moodle module.
    pub activities: BTreeMap<String, usize>,
    /// `(ILIAS tag, Moodle module)` pairs and how often each occurred.
    pub conversions: BTreeMap<String, usize>,
    pub resolution: BTreeMap<ResolutionSource, usize>,
    pub placeholders: usize,
    pub warnings: Vec<Warning>,
}

impl ConversionReport {
    pub fn new(
        course_title: &str,
        installation_id: &str,
        contents: &BackupContents,
        warnings: &Warnings,
    ) -> Self {
        let sections = contents
            .sections
            .iter()
            .map(|s| SectionSummary {
                number: s.number,
                name: s.name.clone(),
                items: s.sequence.len(),
            })
            .collect();

        let mut activities = BTreeMap::new();
        let mut conversions = BTreeMap::new();
        let mut resolution = BTreeMap::new();
        let mut placeholders = 0;
        for activity in &contents.activities {
            *activities.entry(activity.module_name.clone()).or_insert(0) += 1;
            *conversions
                .entry(format!("{} -> {}", activity.source_type, activity.module_name))
                .or_insert(0) += 1;
            *resolution.entry(activity.resolution_source).or_insert(0) += 1;
            if activity.placeholder {
                placeholders += 1;
            }
        }

        Self {
            course_title: course_title.to_string(),
            installation_id: installation_id.to_string(),
            backup_file: contents.file_name.clone(),
            sections,
            activities,
            conversions,
            resolution,
            placeholders,
            warnings: warnings.iter().cloned().collect(),
        }
    }

    pub fn activity_count(&self) -> usize {
        self.activities.values().sum()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.warnings.iter().filter(|w| w.severity == severity).count()
    }

    /// Render the report as a Markdown document.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Conversion report: {}", self.course_title);
        let _ = writeln!(out);
        let _ = writeln!(out, "- Backup: `{}`", self.backup_file);
        if !self.installation_id.is_empty() {
            let _ = writeln!(out, "- ILIAS installation: {}", self.installation_id);
        }
        let _ = writeln!(out, "- Sections: {}", self.sections.len());
        let _ = writeln!(
            out,
            "- Activities: {} ({} placeholders)",
            self.activity_count(),
            self.placeholders
        );
        let _ = writeln!(
            out,
            "- Warnings: {} ({} informational)",
            self.warnings.len(),
            self.count_severity(Severity::Info)
        );

        let _ = writeln!(out, "\n## Sections\n");
        let _ = writeln!(out, "| # | Name | Items |");
        let _ = writeln!(out, "|---|------|-------|");
        for section in &self.sections {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                section.number,
                escape_cell(&section.name),
                section.items
            );
        }

        if !self.conversions.is_empty() {
            let _ = writeln!(out, "\n## Conversions\n");
            let _ = writeln!(out, "| ILIAS -> Moodle | Count |");
            let _ = writeln!(out, "|-----------------|-------|");
            for (pair, count) in &self.conversions {
                let _ = writeln!(out, "| {} | {} |", pair, count);
            }
        }

        if !self.resolution.is_empty() {
            let _ = writeln!(out, "\n## Resolution\n");
            for (source, count) in &self.resolution {
                let _ = writeln!(out, "- {}: {}", source.as_str(), count);
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "\n## Warnings\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "- {}", warning);
            }
        }
        out
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
