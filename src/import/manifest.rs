//! ILIAS `manifest.xml` parsing.
//!
//! ```xml
//! <Manifest MainEntity="grp" Title="Physik 1" InstallationId="0"
//!           InstallationUrl="https://ilias.example.org">
//!   <ExportSet Path="set_1/1700000000__0__grp_6623" Type="grp"/>
//!   <ExportFile Component="Services/Container" Path="Services/Container/set_1/export.xml"/>
//! </Manifest>
//! ```

use crate::error::Result;
use crate::model::ObjectType;
use crate::xml::XmlTree;

/// A parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportManifest {
    pub main_entity: ObjectType,
    pub title: String,
    pub installation_id: String,
    pub installation_url: String,
    pub export_sets: Vec<ExportSetRef>,
    pub export_files: Vec<ExportFileRef>,
}

/// `<ExportSet Path Type>`: a sub-export bundled with the main one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSetRef {
    pub path: String,
    pub entity: Option<ObjectType>,
}

/// `<ExportFile Component Path>`: one component document of this export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFileRef {
    pub component: String,
    pub path: String,
}

impl ExportManifest {
    pub fn parse(xml: &str) -> Result<Self> {
        let tree = XmlTree::parse(xml)?;
        let root = tree.root();

        let mut export_sets = Vec::new();
        let mut export_files = Vec::new();
        for child in root.children() {
            match child.name() {
                "ExportSet" => {
                    if let Some(path) = child.attr("Path").filter(|p| !p.trim().is_empty()) {
                        export_sets.push(ExportSetRef {
                            path: path.trim().to_string(),
                            entity: child.attr("Type").map(ObjectType::from_tag),
                        });
                    }
                }
                "ExportFile" => {
                    if let Some(path) = child.attr("Path").filter(|p| !p.trim().is_empty()) {
                        export_files.push(ExportFileRef {
                            component: child.attr("Component").unwrap_or_default().to_string(),
                            path: path.trim().to_string(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            main_entity: ObjectType::from_tag(root.attr("MainEntity").unwrap_or_default()),
            title: root.attr("Title").unwrap_or_default().trim().to_string(),
            installation_id: root.attr("InstallationId").unwrap_or_default().to_string(),
            installation_url: root.attr("InstallationUrl").unwrap_or_default().to_string(),
            export_sets,
            export_files,
        })
    }
}

/// Split an export directory name `{timestamp}__{installation}__{type}_{objid}`.
pub fn parse_component_dir_name(name: &str) -> Option<(ObjectType, String)> {
    let mut parts = name.split("__");
    let timestamp = parts.next()?;
    let _installation = parts.next()?;
    let type_and_id = parts.next()?;
    if parts.next().is_some() || !timestamp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (tag, obj_id) = type_and_id.split_once('_')?;
    if tag.is_empty() || obj_id.is_empty() {
        return None;
    }
    Some((ObjectType::from_tag(tag), obj_id.to_string()))
}
