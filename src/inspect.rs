//! Reading emitted backups back.
//!
//! [`read_backup`] unpacks an `.mbz` stream and collects the structure the
//! descriptor and section documents describe. [`BackupSummary::validate`]
//! cross-checks the two against the files actually present.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use flate2::read::GzDecoder;
use serde::Serialize;
use tar::Archive;
use tracing::debug;

use crate::error::{Error, Result};
use crate::util::decode_text;
use crate::xml::{Node, XmlTree};

/// Documents every restorable backup must contain.
const REQUIRED_FILES: &[&str] = &[
    "moodle_backup.xml",
    "files.xml",
    "questions.xml",
    "gradebook.xml",
    "course/course.xml",
    "course/inforef.xml",
];

/// Per-activity documents Moodle's restore reads unconditionally.
const REQUIRED_ACTIVITY_FILES: &[&str] = &["module.xml", "inforef.xml", "grades.xml", "roles.xml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionEntry {
    pub id: u32,
    pub number: usize,
    pub title: String,
    pub directory: String,
    /// Module ids from `section.xml`; empty if that file is missing.
    pub sequence: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub module_id: u32,
    pub section_id: u32,
    pub module_name: String,
    pub title: String,
    pub directory: String,
}

/// What an `.mbz` contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupSummary {
    pub name: String,
    pub course_title: String,
    pub moodle_release: String,
    pub sections: Vec<SectionEntry>,
    pub activities: Vec<ActivityEntry>,
    /// Every entry path in archive order.
    pub files: Vec<String>,
}

impl BackupSummary {
    pub fn activity(&self, module_id: u32) -> Option<&ActivityEntry> {
        self.activities.iter().find(|a| a.module_id == module_id)
    }

    /// Activities of one section, in sequence order.
    pub fn section_activities(&self, section: &SectionEntry) -> Vec<&ActivityEntry> {
        section
            .sequence
            .iter()
            .filter_map(|&id| self.activity(id))
            .collect()
    }

    /// Problems that would make Moodle refuse or mangle the restore.
    /// Empty when the backup is consistent.
    pub fn validate(&self) -> Vec<String> {
        let files: BTreeSet<&str> = self.files.iter().map(String::as_str).collect();
        let mut problems = Vec::new();

        for required in REQUIRED_FILES {
            if !files.contains(required) {
                problems.push(format!("missing required file {}", required));
            }
        }
        if self.files.first().map(String::as_str) != Some("moodle_backup.xml") {
            problems.push("moodle_backup.xml is not the first archive entry".to_string());
        }

        let mut directories: BTreeMap<u32, &str> = BTreeMap::new();
        for activity in &self.activities {
            for name in REQUIRED_ACTIVITY_FILES {
                let path = format!("{}/{}", activity.directory, name);
                if !files.contains(path.as_str()) {
                    problems.push(format!("activity {} is missing {}", activity.directory, name));
                }
            }
            if directories.insert(activity.module_id, &activity.directory).is_some() {
                problems.push(format!("module id {} is listed twice", activity.module_id));
            }
        }

        if self.sections.is_empty() {
            problems.push("descriptor lists no sections".to_string());
        }

        let mut placed = BTreeSet::new();
        for section in &self.sections {
            let path = format!("{}/section.xml", section.directory);
            if !files.contains(path.as_str()) {
                problems.push(format!("section {} is missing section.xml", section.id));
            }
            for module_id in &section.sequence {
                if !directories.contains_key(module_id) {
                    problems.push(format!(
                        "section {} lists module {} which has no activity directory",
                        section.id, module_id
                    ));
                }
                if !placed.insert(*module_id) {
                    problems.push(format!("module {} appears in more than one section", module_id));
                }
            }
        }
        for activity in &self.activities {
            if !placed.contains(&activity.module_id) {
                problems.push(format!("activity {} is not in any section", activity.directory));
            }
        }

        for (i, section) in self.sections.iter().enumerate() {
            if section.number != i {
                problems.push(format!(
                    "section {} has number {}, expected {}",
                    section.id, section.number, i
                ));
            }
        }
        problems
    }
}

/// Unpack an `.mbz` stream and summarize it.
pub fn read_backup<R: Read>(reader: R) -> Result<BackupSummary> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut files = Vec::new();
    let mut documents: BTreeMap<String, String> = BTreeMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().replace('\\', "/");
        let wanted = path == "moodle_backup.xml" || path.ends_with("/section.xml");
        if wanted {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            documents.insert(path.clone(), decode_text(&bytes, None).into_owned());
        }
        files.push(path);
    }
    debug!(entries = files.len(), "read backup archive");

    let descriptor = documents
        .get("moodle_backup.xml")
        .ok_or_else(|| Error::InvalidExport("backup has no moodle_backup.xml".to_string()))?;
    let tree = XmlTree::parse(descriptor)?;
    let root = tree.root();
    let information = root.child("information");
    let info = |name: &str| {
        information
            .and_then(|i| i.child_text(name))
            .unwrap_or_default()
            .to_string()
    };

    let contents = information.and_then(|i| i.child("contents"));
    let activities = contents
        .and_then(|c| c.child("activities"))
        .map(|list| list.children_named("activity").map(activity_entry).collect())
        .unwrap_or_default();

    let mut sections = Vec::new();
    if let Some(list) = contents.and_then(|c| c.child("sections")) {
        for node in list.children_named("section") {
            let id = number(node, "sectionid");
            let directory = node.child_text("directory").unwrap_or_default().to_string();
            let (number_in_course, sequence) = documents
                .get(&format!("{}/section.xml", directory))
                .map(|xml| section_document(xml))
                .transpose()?
                .unwrap_or((0, Vec::new()));
            sections.push(SectionEntry {
                id,
                number: number_in_course,
                title: node.child_text("title").unwrap_or_default().to_string(),
                directory,
                sequence,
            });
        }
    }

    Ok(BackupSummary {
        name: info("name"),
        course_title: info("original_course_fullname"),
        moodle_release: info("moodle_release"),
        sections,
        activities,
        files,
    })
}

fn number<T: std::str::FromStr + Default>(node: Node<'_>, name: &str) -> T {
    node.child_text(name)
        .and_then(|t| t.trim().parse().ok())
        .unwrap_or_default()
}

fn activity_entry(node: Node<'_>) -> ActivityEntry {
    ActivityEntry {
        module_id: number(node, "moduleid"),
        section_id: number(node, "sectionid"),
        module_name: node.child_text("modulename").unwrap_or_default().to_string(),
        title: node.child_text("title").unwrap_or_default().to_string(),
        directory: node.child_text("directory").unwrap_or_default().to_string(),
    }
}

/// Section number and sequence from a `section.xml`.
fn section_document(xml: &str) -> Result<(usize, Vec<u32>)> {
    let tree = XmlTree::parse(xml)?;
    let root = tree.root();
    let sequence = root
        .child_text("sequence")
        .map(|s| s.split(',').filter_map(|id| id.trim().parse().ok()).collect())
        .unwrap_or_default();
    Ok((number(root, "number"), sequence))
}
