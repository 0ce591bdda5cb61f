//! Reading ILIAS exports.
//!
//! An export is a directory tree (or zip) with a root `manifest.xml`, one
//! directory per exported object named `{timestamp}__{installation}__{type}_{id}`,
//! and a container structure document under `Services/Container/`:
//!
//! ```text
//! manifest.xml
//! set_1/1700000000__0__grp_6623/
//!     manifest.xml
//!     Modules/Group/set_1/export.xml
//!     Services/Container/set_1/export.xml
//! set_2/1700000000__0__tst_455/
//!     Modules/Test/set_1/export.xml
//! ```
//!
//! [`ExportReader`] locates these files and hands out their text; the
//! [`catalog`] and [`container`] modules turn them into typed records.

pub mod catalog;
pub mod container;
pub mod item_group;
mod manifest;

pub use catalog::{ComponentCatalog, ComponentRecord};
pub use container::{ContainerItem, ContainerStructure, NodeId};
pub use item_group::{InlineHint, ItemGroupMember, ItemGroupRecord};
pub use manifest::{ExportFileRef, ExportManifest, ExportSetRef, parse_component_dir_name};

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Result, StructuralCorruption};
use crate::io::ExportSource;
use crate::model::ObjectType;
use crate::report::{Stage, WarningKind, Warnings};

const MANIFEST_NAME: &str = "manifest.xml";
const CONTAINER_MARKER: &str = "Services/Container/";

/// One exported object directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDir {
    /// Directory path relative to the source root.
    pub path: String,
    pub entity: ObjectType,
    /// Object id encoded in the directory name.
    pub object_id: Option<String>,
    /// XML documents belonging to this object (manifest and container excluded).
    pub documents: Vec<String>,
}

/// A container structure document and the component that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDoc {
    pub path: String,
    pub owner: Option<usize>,
}

/// Where everything lives inside one export.
#[derive(Debug, Clone)]
pub struct ExportLayout {
    /// Directory holding the root manifest ("" when at the source root).
    pub base: String,
    pub manifest_path: String,
    pub manifest: ExportManifest,
    pub components: Vec<ComponentDir>,
    pub containers: Vec<ContainerDoc>,
}

impl ExportLayout {
    /// The container document that describes the course as a whole.
    ///
    /// Preference order: the container of the manifest's main entity, then
    /// any group/course container, then whatever comes first. Shallower
    /// owners win ties.
    pub fn primary_container(&self) -> Option<&ContainerDoc> {
        let main = &self.manifest.main_entity;
        self.containers.iter().min_by_key(|doc| {
            let owner = doc.owner.map(|i| &self.components[i]);
            let rank = match owner {
                Some(c) if &c.entity == main && c.entity.is_structural() => 0,
                Some(c) if c.entity.is_structural() => 1,
                None => 1,
                Some(_) => 2,
            };
            let depth = owner.map(|c| c.path.matches('/').count()).unwrap_or(0);
            (rank, depth, doc.path.clone())
        })
    }

    pub fn component(&self, index: usize) -> Option<&ComponentDir> {
        self.components.get(index)
    }
}

/// Entry point over an export source.
pub struct ExportReader<'s> {
    source: &'s dyn ExportSource,
    layout: ExportLayout,
}

impl<'s> ExportReader<'s> {
    /// Locate the manifest and index component directories.
    ///
    /// Fails only when there is no readable root manifest; everything else
    /// that is missing is recorded in `warnings`.
    pub fn open(source: &'s dyn ExportSource, warnings: &mut Warnings) -> Result<Self> {
        let files = source.files();

        // 1. Find the shallowest manifest.xml
        let manifest_path = files
            .iter()
            .filter(|p| file_name(p) == MANIFEST_NAME)
            .min_by(|a, b| (a.matches('/').count(), a).cmp(&(b.matches('/').count(), b)))
            .cloned()
            .ok_or_else(|| StructuralCorruption::MissingManifest {
                root: PathBuf::from(source.describe()),
            })?;
        let base = parent_dir(&manifest_path).to_string();

        // 2. Parse it
        let manifest = source
            .read_text(&manifest_path)
            .and_then(|text| ExportManifest::parse(&text))
            .map_err(|e| StructuralCorruption::UnreadableManifest {
                path: manifest_path.clone(),
                reason: e.to_string(),
            })?;
        info!(
            title = %manifest.title,
            main_entity = %manifest.main_entity,
            path = %manifest_path,
            "reading ILIAS export"
        );

        let in_base: Vec<&String> = files.iter().filter(|p| is_under(p, &base)).collect();

        // 3. Component directories from the naming pattern
        let mut dirs: BTreeMap<String, (ObjectType, String)> = BTreeMap::new();
        for path in &in_base {
            for (slash, _) in path.match_indices('/') {
                let dir = &path[..slash];
                if let Some(parsed) = parse_component_dir_name(file_name(dir)) {
                    dirs.entry(dir.to_string()).or_insert(parsed);
                }
            }
        }

        let mut components: Vec<ComponentDir> = dirs
            .into_iter()
            .map(|(path, (entity, object_id))| ComponentDir {
                path,
                entity,
                object_id: Some(object_id),
                documents: Vec::new(),
            })
            .collect();
        if components.is_empty() {
            debug!("no component directories found, treating export root as one component");
            components.push(ComponentDir {
                path: base.clone(),
                entity: manifest.main_entity.clone(),
                object_id: None,
                documents: Vec::new(),
            });
        }

        // 4. Assign documents and container files to their deepest component
        let mut containers = Vec::new();
        for path in &in_base {
            if !path.to_ascii_lowercase().ends_with(".xml") || file_name(path) == MANIFEST_NAME {
                continue;
            }
            let owner = deepest_owner(&components, path);
            if path.contains(CONTAINER_MARKER) {
                if file_name(path) == "export.xml" {
                    containers.push(ContainerDoc {
                        path: (*path).clone(),
                        owner,
                    });
                }
                continue;
            }
            if let Some(idx) = owner {
                components[idx].documents.push((*path).clone());
            }
        }

        // 5. Cross-check what the manifest promised
        for set in &manifest.export_sets {
            let full = join(&base, &set.path);
            if !files.iter().any(|p| is_under(p, &full)) {
                warnings.warn(
                    Stage::Reader,
                    WarningKind::PartialDamage,
                    &set.path,
                    "export set listed in manifest.xml is missing",
                );
            }
        }
        for file in &manifest.export_files {
            let full = join(&base, &file.path);
            if !source.contains(&full) {
                warnings.warn(
                    Stage::Reader,
                    WarningKind::PartialDamage,
                    &file.path,
                    format!("{} export file listed in manifest.xml is missing", file.component),
                );
            }
        }

        debug!(
            components = components.len(),
            containers = containers.len(),
            "indexed export layout"
        );

        Ok(Self {
            source,
            layout: ExportLayout {
                base,
                manifest_path,
                manifest,
                components,
                containers,
            },
        })
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    pub fn manifest(&self) -> &ExportManifest {
        &self.layout.manifest
    }

    pub fn source(&self) -> &'s dyn ExportSource {
        self.source
    }

    /// Decoded text of one document, by path relative to the source root.
    pub fn read_document(&self, path: &str) -> Result<String> {
        self.source.read_text(path)
    }

    /// Read and parse the primary container structure.
    pub fn read_container(&self, warnings: &mut Warnings) -> Result<ContainerStructure> {
        let doc = self
            .layout
            .primary_container()
            .ok_or(StructuralCorruption::MissingContainer)?;
        info!(path = %doc.path, "parsing container structure");
        let text = self.read_document(&doc.path)?;
        ContainerStructure::parse(&text, &doc.path, warnings)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

fn is_under(path: &str, dir: &str) -> bool {
    dir.is_empty() || (path.starts_with(dir) && path[dir.len()..].starts_with('/'))
}

fn join(base: &str, rel: &str) -> String {
    let rel = crate::io::normalize_path(rel);
    if base.is_empty() {
        rel
    } else {
        format!("{}/{}", base, rel)
    }
}

fn deepest_owner(components: &[ComponentDir], path: &str) -> Option<usize> {
    components
        .iter()
        .enumerate()
        .filter(|(_, c)| is_under(path, &c.path))
        .max_by_key(|(_, c)| c.path.len())
        .map(|(i, _)| i)
}
