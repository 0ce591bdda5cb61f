//! Component Catalog: one uniform record per exported object.
//!
//! Each component directory contributes at most one [`ComponentRecord`],
//! built from its primary export document. Recognized types get a small
//! set of type-specific fields; anything else degrades to a generic record
//! with just an id and a title. Item group documents additionally yield an
//! [`ItemGroupRecord`] with the membership list.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use super::item_group::{ItemGroupRecord, parse_item_groups};
use super::{ComponentDir, ExportReader};
use crate::model::ObjectType;
use crate::report::{Stage, WarningKind, Warnings};
use crate::xml::{Node, XmlTree};

/// One parsed source component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub content_id: String,
    pub title: String,
    pub component_type: ObjectType,
    /// Extracted type-specific fields.
    pub payload: BTreeMap<String, String>,
    /// Document the record was built from.
    pub source_path: String,
}

/// All component records of one export, indexed by content id.
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    records: Vec<ComponentRecord>,
    by_content_id: HashMap<String, usize>,
    item_groups: Vec<ItemGroupRecord>,
    item_groups_by_id: HashMap<String, usize>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every component directory of an export.
    pub fn build(reader: &ExportReader<'_>, warnings: &mut Warnings) -> Self {
        let mut catalog = Self::new();
        for component in &reader.layout().components {
            let Some(path) = primary_document(component) else {
                debug!(dir = %component.path, "component has no export document");
                continue;
            };
            let text = match reader.read_document(path) {
                Ok(text) => text,
                Err(e) => {
                    warnings.warn(
                        Stage::Catalog,
                        WarningKind::PartialDamage,
                        path,
                        format!("unreadable component document: {}", e),
                    );
                    continue;
                }
            };
            catalog.add_document(&text, path, Some(component), warnings);
        }
        info!(
            records = catalog.len(),
            item_groups = catalog.item_groups.len(),
            "built component catalog"
        );
        catalog
    }

    /// Parse one component document and add what it describes.
    pub fn add_document(
        &mut self,
        xml: &str,
        source_path: &str,
        dir: Option<&ComponentDir>,
        warnings: &mut Warnings,
    ) {
        let tree = match XmlTree::parse(xml) {
            Ok(tree) => tree,
            Err(e) => {
                warnings.warn(
                    Stage::Catalog,
                    WarningKind::PartialDamage,
                    source_path,
                    format!("malformed component document: {}", e),
                );
                return;
            }
        };

        let record = parse_component(&tree, source_path, dir);
        if record.component_type == ObjectType::ItemGroup {
            for group in parse_item_groups(&tree, Some(&record.content_id)) {
                self.insert_item_group(group, warnings);
            }
        }
        self.insert(record, warnings);
    }

    /// Add a record. The first record for a content id wins.
    pub fn insert(&mut self, record: ComponentRecord, warnings: &mut Warnings) {
        if record.content_id.is_empty() {
            warnings.warn(
                Stage::Catalog,
                WarningKind::PartialDamage,
                &record.source_path,
                "component has no id and cannot be referenced",
            );
            return;
        }
        if self.by_content_id.contains_key(&record.content_id) {
            warnings.note(
                Stage::Catalog,
                WarningKind::PartialDamage,
                &record.content_id,
                format!("duplicate component record in {} ignored", record.source_path),
            );
            return;
        }
        self.by_content_id
            .insert(record.content_id.clone(), self.records.len());
        self.records.push(record);
    }

    pub fn insert_item_group(&mut self, group: ItemGroupRecord, warnings: &mut Warnings) {
        if group.content_id.is_empty() || self.item_groups_by_id.contains_key(&group.content_id) {
            warnings.note(
                Stage::Catalog,
                WarningKind::PartialDamage,
                &group.title,
                "item group without a usable id ignored",
            );
            return;
        }
        self.item_groups_by_id
            .insert(group.content_id.clone(), self.item_groups.len());
        self.item_groups.push(group);
    }

    pub fn get(&self, content_id: &str) -> Option<&ComponentRecord> {
        self.by_content_id.get(content_id).map(|&i| &self.records[i])
    }

    pub fn item_group(&self, content_id: &str) -> Option<&ItemGroupRecord> {
        self.item_groups_by_id
            .get(content_id)
            .map(|&i| &self.item_groups[i])
    }

    pub fn records(&self) -> &[ComponentRecord] {
        &self.records
    }

    pub fn item_groups(&self) -> &[ItemGroupRecord] {
        &self.item_groups
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The document that describes the component itself: its `export.xml`
/// outside `Services/`, falling back to the first XML file.
fn primary_document(component: &ComponentDir) -> Option<&str> {
    component
        .documents
        .iter()
        .find(|p| p.ends_with("/export.xml") && !p.contains("/Services/") && !p.starts_with("Services/"))
        .or_else(|| component.documents.iter().find(|p| p.ends_with("export.xml")))
        .or_else(|| component.documents.first())
        .map(String::as_str)
}

/// Root elements that identify a component type when no other hint exists.
const ROOT_ELEMENTS: &[(&str, &str)] = &[
    ("Group", "grp"),
    ("Course", "crs"),
    ("Folder", "fold"),
    ("Test", "tst"),
    ("questestinterop", "tst"),
    ("MediaCast", "mcst"),
    ("File", "file"),
    ("Forum", "frm"),
    ("Wiki", "wiki"),
    ("Exercise", "exc"),
    ("ItemGroup", "itgr"),
    ("Itgr", "itgr"),
    ("WebLinks", "webr"),
    ("ContentObject", "lm"),
    ("Glossary", "glo"),
    ("Survey", "svy"),
];

fn detect_type(tree: &XmlTree, dir: Option<&ComponentDir>) -> ObjectType {
    if let Some(entity) = tree.root().attr("Entity").filter(|e| !e.is_empty()) {
        return ObjectType::from_tag(entity);
    }
    if let Some(dir) = dir
        && !dir.entity.is_unknown()
    {
        return dir.entity.clone();
    }
    tree.iter()
        .find_map(|node| {
            ROOT_ELEMENTS
                .iter()
                .find(|(name, _)| *name == node.name())
                .map(|(_, tag)| ObjectType::from_tag(tag))
        })
        .or_else(|| dir.map(|d| d.entity.clone()))
        .unwrap_or_else(ObjectType::unknown)
}

/// The element holding the object's own fields, if the type has one.
fn entity_element<'a>(tree: &'a XmlTree, kind: &ObjectType) -> Option<Node<'a>> {
    let names: &[&str] = match kind {
        ObjectType::Group => &["Group", "group"],
        ObjectType::Course => &["Course", "course"],
        ObjectType::Folder => &["Folder"],
        ObjectType::Test => &["Test", "assessment"],
        ObjectType::MediaCast => &["MediaCast", "Mcst"],
        ObjectType::File => &["File"],
        ObjectType::Forum => &["Forum", "Frm"],
        ObjectType::Wiki => &["Wiki"],
        ObjectType::Exercise => &["Exercise", "Exc"],
        ObjectType::ItemGroup => &["Itgr", "ItemGroup"],
        ObjectType::WebLink => &["WebLinks"],
        ObjectType::Glossary => &["Glossary"],
        ObjectType::Survey => &["Survey"],
        _ => &[],
    };
    names.iter().find_map(|name| tree.find(name))
}

fn parse_component(tree: &XmlTree, source_path: &str, dir: Option<&ComponentDir>) -> ComponentRecord {
    let kind = detect_type(tree, dir);
    let entity = entity_element(tree, &kind);

    let content_id = tree
        .find("ExportItem")
        .and_then(|n| n.attr("Id"))
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .or_else(|| dir.and_then(|d| d.object_id.clone()))
        .or_else(|| {
            entity.and_then(|e| {
                e.child_text("Id")
                    .or_else(|| e.attr("Id"))
                    .or_else(|| e.attr("id"))
                    .map(str::to_string)
            })
        })
        .unwrap_or_default();

    let title = entity
        .and_then(|e| {
            e.child_text("Title")
                .or_else(|| e.child_text("title"))
                .or_else(|| e.attr("Title"))
                .or_else(|| e.attr("title"))
        })
        .or_else(|| tree.find_all("Title").map(|n| n.text()).find(|t| !t.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", kind, content_id));

    let mut payload = BTreeMap::new();
    if let Some(description) = entity
        .and_then(|e| e.child_text("Description").or_else(|| e.child_text("description")))
        .or_else(|| tree.find("Description").map(|n| n.text()).filter(|t| !t.is_empty()))
    {
        payload.insert("description".to_string(), description.to_string());
    }
    extract_fields(tree, entity, &kind, &mut payload);

    ComponentRecord {
        content_id: content_id.trim().to_string(),
        title: title.trim().to_string(),
        component_type: kind,
        payload,
        source_path: source_path.to_string(),
    }
}

/// Count elements named `name` plus DataSet records of `entity`.
fn count_entries(tree: &XmlTree, name: &str, entity: &str) -> usize {
    tree.iter()
        .filter(|n| n.name() == name || (n.name() == "Rec" && n.attr("Entity") == Some(entity)))
        .count()
}

fn put_count(payload: &mut BTreeMap<String, String>, key: &str, count: usize) {
    payload.insert(key.to_string(), count.to_string());
}

fn extract_fields(
    tree: &XmlTree,
    entity: Option<Node<'_>>,
    kind: &ObjectType,
    payload: &mut BTreeMap<String, String>,
) {
    let entity_text = |name: &str| entity.and_then(|e| e.child_text(name)).map(str::to_string);

    match kind {
        ObjectType::Test => {
            let questions = tree.find_all("Question").count() + tree.find_all("item").count();
            put_count(payload, "question_count", questions);
            if let Some(pass) = tree.find("PassScore").or_else(|| tree.find("MinimumPassScore")) {
                payload.insert("pass_score".into(), pass.text().to_string());
            }
        }
        ObjectType::MediaCast => {
            put_count(payload, "media_items", count_entries(tree, "MediaItem", "mcst_item"));
        }
        ObjectType::File => {
            let file_name = entity
                .and_then(|e| e.attr("fileName").or_else(|| e.attr("filename")))
                .map(str::to_string)
                .or_else(|| entity_text("Filename"))
                .or_else(|| entity_text("FileName"));
            if let Some(name) = file_name {
                payload.insert("file_name".into(), name);
            }
            if let Some(mime) = entity.and_then(|e| e.attr("type")) {
                payload.insert("mime_type".into(), mime.to_string());
            }
            if let Some(size) = entity_text("Size") {
                payload.insert("size".into(), size);
            }
            put_count(payload, "versions", tree.find_all("Version").count());
        }
        ObjectType::Forum => {
            put_count(payload, "topics", count_entries(tree, "Topic", "frm_thread"));
            put_count(payload, "posts", count_entries(tree, "Post", "frm_post"));
        }
        ObjectType::Wiki => {
            put_count(payload, "pages", count_entries(tree, "Page", "wpg"));
            if let Some(start) = entity_text("StartPage") {
                payload.insert("start_page".into(), start);
            }
        }
        ObjectType::Exercise => {
            put_count(
                payload,
                "assignments",
                count_entries(tree, "Assignment", "exc_assignment"),
            );
        }
        ObjectType::WebLink => {
            if let Some(target) = tree.find("Target").map(|n| n.text()).filter(|t| !t.is_empty()) {
                payload.insert("url".into(), target.to_string());
            }
        }
        ObjectType::ItemGroup => {
            put_count(payload, "members", count_entries(tree, "Item", "itgr_item"));
        }
        ObjectType::Group | ObjectType::Course => {
            if let Some(reg) = tree
                .find("RegistrationSettings")
                .or_else(|| tree.find("Registration"))
                .or_else(|| tree.find("registration"))
                && let Some(kind) = reg.attr("type").or_else(|| reg.attr("Type"))
            {
                payload.insert("registration".into(), kind.to_string());
            }
        }
        _ => {}
    }
}
