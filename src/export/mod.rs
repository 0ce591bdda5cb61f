//! Backup Emitter.
//!
//! Turns categorized sections into a Moodle 2 backup (`.mbz`): a gzip
//! compressed tar archive with a fixed directory layout.
//!
//! # Architecture
//!
//! Emission runs in three passes:
//! - [`BackupPlan::build`] allocates section and course-module ids and maps
//!   every item type to an activity module
//! - every document is rendered to a string; an activity whose text cannot
//!   be written degrades to a placeholder label
//! - [`MbzArchive`] packages the documents, descriptor first
//!
//! # Example
//!
//! ```no_run
//! use ilias2moodle::export::{CourseInfo, MbzExporter};
//! use ilias2moodle::model::Section;
//! use ilias2moodle::report::Warnings;
//! use std::fs::File;
//!
//! let sections = vec![Section::new(0, "Allgemein")];
//! let mut file = File::create("course.mbz")?;
//! let mut warnings = Warnings::new();
//! MbzExporter::new().export(&CourseInfo::new("Physik"), &sections, &mut file, &mut warnings)?;
//! # Ok::<(), ilias2moodle::Error>(())
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::model::Section;
use crate::report::{Stage, WarningKind, Warnings};
use crate::util::slugify;

mod activity;
mod archive;
mod course;
mod ids;
mod manifest;
mod mapping;
mod plan;
mod writer;

pub use activity::{RenderContext, render_activity};
pub use archive::MbzArchive;
pub use course::{CourseInfo, render_course, render_section, render_toplevel};
pub use ids::{IdAllocator, section_id};
pub use manifest::render_backup_descriptor;
pub use mapping::{ActivityKind, TypeMapping, default_kind};
pub use plan::{ActivitySummary, BackupContents, BackupPlan, PlannedActivity, PlannedSection};
pub use writer::{RenderError, XmlWriter};

/// Context id given to the course; activity contexts follow it.
const COURSE_CONTEXT_ID: u32 = 100;

const DEFAULT_WWWROOT: &str = "http://ilias-export-converter";

/// One document of the backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    /// Path inside the archive, `/`-separated.
    pub path: String,
    pub contents: String,
}

impl BackupFile {
    pub fn new(path: impl Into<String>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// Settings for the emitted backup (`[backup]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Site URL recorded as the backup origin; defaults to the ILIAS URL.
    pub wwwroot: Option<String>,
    pub course_format: String,
    pub moodle_version: String,
    pub moodle_release: String,
    pub backup_version: String,
    pub backup_release: String,
    /// Fixed Unix timestamp for reproducible output.
    pub timestamp: Option<i64>,
    /// Gzip level, 0-9.
    pub compression_level: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            wwwroot: None,
            course_format: "topics".to_string(),
            moodle_version: "2024100700".to_string(),
            moodle_release: "4.5 (Build: 20241007)".to_string(),
            backup_version: "2024100700".to_string(),
            backup_release: "4.5".to_string(),
            timestamp: None,
            compression_level: 6,
        }
    }
}

impl BackupConfig {
    pub fn wwwroot_for(&self, course: &CourseInfo) -> String {
        self.wwwroot
            .clone()
            .or_else(|| Some(course.installation_url.clone()).filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_WWWROOT.to_string())
    }

    /// The configured timestamp, or now.
    pub fn resolve_timestamp(&self) -> i64 {
        self.timestamp.unwrap_or_else(|| Utc::now().timestamp())
    }
}

/// `backup-moodle2-course-<slug>-<yyyymmdd>.mbz`
pub fn backup_file_name(title: &str, timestamp: i64) -> String {
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y%m%d");
    format!("backup-moodle2-course-{}-{}.mbz", slugify(title), date)
}

/// Moodle backup exporter.
///
/// Holds the backup settings and type mapping; [`MbzExporter::export`] can
/// be called any number of times.
pub struct MbzExporter {
    config: BackupConfig,
    mapping: TypeMapping,
}

impl MbzExporter {
    /// Create an exporter with default configuration.
    pub fn new() -> Self {
        Self {
            config: BackupConfig::default(),
            mapping: TypeMapping::default(),
        }
    }

    pub fn with_config(mut self, config: BackupConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mapping(mut self, mapping: TypeMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Write the backup for `sections` to `writer`.
    ///
    /// Activity render failures are recovered with placeholders and
    /// recorded in `warnings`; anything else that fails aborts the export.
    pub fn export<W: Write>(
        &self,
        course: &CourseInfo,
        sections: &[Section<'_>],
        writer: W,
        warnings: &mut Warnings,
    ) -> Result<BackupContents> {
        let timestamp = self.config.resolve_timestamp();
        let file_name = backup_file_name(&course.title, timestamp);
        let ctx = RenderContext {
            timestamp,
            moodle_version: &self.config.moodle_version,
            course_context_id: COURSE_CONTEXT_ID,
        };

        // 1. Allocate ids and module types
        let mut plan = BackupPlan::build(sections, &self.mapping, warnings);

        // 2. Activities, degrading to placeholders where needed
        let mut activity_files = Vec::new();
        for activity in &mut plan.activities {
            let files = match render_activity(activity, &ctx) {
                Ok(files) => files,
                Err(err) => {
                    warnings.warn(
                        Stage::Emitter,
                        WarningKind::PartialDamage,
                        activity.item.content_id.clone(),
                        format!(
                            "{} '{}' could not be rendered ({}); emitted as placeholder label",
                            activity.kind, activity.title, err
                        ),
                    );
                    activity.make_placeholder();
                    render_activity(activity, &ctx)?
                }
            };
            activity_files.extend(files);
        }

        // 3. Sections, course and top-level documents
        let mut files = render_toplevel();
        files.extend(render_course(course, &self.config.course_format, plan.sections.len(), &ctx)?);
        for section in &plan.sections {
            files.extend(render_section(section, &ctx)?);
        }
        files.extend(activity_files);

        // 4. Descriptor
        let descriptor = render_backup_descriptor(&plan, course, &file_name, &self.config, &ctx)?;

        // 5. Package
        let mut archive = MbzArchive::new(writer, self.config.compression_level, timestamp.max(0) as u64);
        archive.append("moodle_backup.xml", descriptor.as_bytes())?;
        for file in &files {
            debug!(path = %file.path, bytes = file.contents.len(), "packaging");
            archive.append_file(file)?;
        }
        let entries = archive.entries();
        archive.finish()?;

        info!(
            file = %file_name,
            sections = plan.sections.len(),
            activities = plan.activities.len(),
            entries,
            "wrote Moodle backup"
        );

        Ok(BackupContents {
            file_name,
            sections: plan.sections.clone(),
            activities: plan.activities.iter().map(ActivitySummary::from).collect(),
        })
    }
}

impl Default for MbzExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectType, ResolvedItem};

    #[test]
    fn test_file_name() {
        assert_eq!(
            backup_file_name("Physik für Anfänger", 1_700_000_000),
            "backup-moodle2-course-physik-fuer-anfaenger-20231114.mbz"
        );
    }

    #[test]
    fn test_wwwroot_fallbacks() {
        let config = BackupConfig::default();
        let mut course = CourseInfo::new("x");
        assert_eq!(config.wwwroot_for(&course), DEFAULT_WWWROOT);
        course.installation_url = "https://ilias.example.org".into();
        assert_eq!(config.wwwroot_for(&course), "https://ilias.example.org");
    }

    #[test]
    fn test_export_with_placeholder() {
        let mut good = ResolvedItem::stub("1");
        good.title = "Skript".into();
        good.item_type = ObjectType::File;
        let mut bad = ResolvedItem::stub("2");
        bad.title = "Test\u{1}".into();
        bad.item_type = ObjectType::Test;

        let mut section = Section::new(1, "Sonstiges");
        section.items = vec![&good, &bad];
        let sections = vec![Section::new(0, "Allgemein"), section];

        let exporter = MbzExporter::new().with_config(BackupConfig {
            timestamp: Some(1_700_000_000),
            ..BackupConfig::default()
        });
        let mut out = Vec::new();
        let mut warnings = Warnings::new();
        let contents = exporter
            .export(&CourseInfo::new("Physik"), &sections, &mut out, &mut warnings)
            .unwrap();

        assert!(!out.is_empty());
        assert_eq!(contents.activities.len(), 2);
        assert_eq!(contents.activities[1].directory, "activities/label_2");
        assert!(contents.activities[1].placeholder);
        assert_eq!(warnings.of_kind(WarningKind::PartialDamage).count(), 1);
        assert_eq!(contents.sections[1].sequence, [1, 2]);
    }
}
