//! The conversion pipeline.
//!
//! ```text
//! ExportSource -> ExportReader -> ComponentCatalog
//!                              -> ContainerStructure -> flatten_course
//!                                                    -> categorize -> MbzExporter
//! ```
//!
//! Every stage appends to one [`Warnings`] collector. Only structural
//! corruption and I/O failures abort a run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::categorize::categorize;
use crate::config::ConverterConfig;
use crate::error::Result;
use crate::export::{BackupContents, CourseInfo, MbzExporter};
use crate::import::{ComponentCatalog, ContainerStructure, ExportReader};
use crate::io::{ExportSource, open_export};
use crate::report::{ConversionReport, Warnings, check_compatibility};
use crate::resolve::flatten_course;

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub contents: BackupContents,
    pub report: ConversionReport,
    pub warnings: Warnings,
}

/// Runs the full pipeline with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one export and write the backup to `writer`.
    pub fn convert<W: Write>(&self, source: &dyn ExportSource, writer: W) -> Result<ConversionOutcome> {
        let mut warnings = Warnings::new();

        // 1. Layout and manifest
        let reader = ExportReader::open(source, &mut warnings)?;

        // 2. Components and container tree
        let catalog = ComponentCatalog::build(&reader, &mut warnings);
        let structure = reader.read_container(&mut warnings)?;
        check_compatibility(&structure, &mut warnings);

        // 3. Ordered items
        let items = flatten_course(&structure, &catalog, &mut warnings);

        // 4. Sections
        let rules = self.config.rule_table();
        let sections = categorize(&items, &rules);

        // 5. Backup
        let course = course_info(&reader, &structure, &catalog);
        let exporter = MbzExporter::new()
            .with_config(self.config.backup.clone())
            .with_mapping(self.config.type_mapping.clone());
        let contents = exporter.export(&course, &sections, writer, &mut warnings)?;

        let report = ConversionReport::new(
            &course.title,
            &course.installation_id,
            &contents,
            &warnings,
        );
        Ok(ConversionOutcome {
            contents,
            report,
            warnings,
        })
    }
}

/// Course facts from the manifest, completed from the container root.
fn course_info(
    reader: &ExportReader<'_>,
    structure: &ContainerStructure,
    catalog: &ComponentCatalog,
) -> CourseInfo {
    let manifest = reader.manifest();
    let root = structure.root();
    let title = Some(manifest.title.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(root.title.as_str());

    let mut course = CourseInfo::new(title);
    course.installation_id = manifest.installation_id.clone();
    course.installation_url = manifest.installation_url.clone();
    course.summary = root
        .content_id
        .as_deref()
        .and_then(|id| catalog.get(id))
        .and_then(|record| record.payload.get("description"))
        .filter(|d| !d.trim().is_empty())
        .cloned();
    course
}

/// Convert the export at `input` (directory or `.zip`) into an `.mbz` file.
///
/// `output` may name a file or an existing directory; without it the
/// backup is written next to the input under its default name. Nothing is
/// written when the conversion fails.
pub fn convert_export(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &ConverterConfig,
) -> Result<(PathBuf, ConversionOutcome)> {
    let input = input.as_ref();
    let source = open_export(input)?;

    let mut buffer = Vec::new();
    let outcome = Converter::new(config.clone()).convert(source.as_ref(), &mut buffer)?;

    let file_name = &outcome.contents.file_name;
    let path = match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => input
            .parent()
            .map(|dir| dir.join(file_name))
            .unwrap_or_else(|| PathBuf::from(file_name)),
    };
    fs::write(&path, &buffer)?;
    info!(
        path = %path.display(),
        bytes = buffer.len(),
        warnings = outcome.warnings.len(),
        "conversion finished"
    );
    Ok((path, outcome))
}
