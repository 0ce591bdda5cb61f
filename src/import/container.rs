//! Container Structure Parser.
//!
//! Parses `Services/Container/set_*/export.xml` into an arena-backed tree:
//!
//! ```xml
//! <exp:Export Entity="struct">
//!   <exp:ExportItem Id="6623">
//!     <Items>
//!       <Item RefId="3845" Id="6623" Title="Physik" Type="grp" Page="" StartPage="" Style="0" Offline="">
//!         <Timing Type="0" Visible="1" Changeable="0"><Start>..</Start><End>..</End></Timing>
//!         <Item RefId="3846" Id="7" Title="Einführung" Type="mcst" .../>
//!       </Item>
//!     </Items>
//!   </exp:ExportItem>
//! </exp:Export>
//! ```
//!
//! Nodes are stored in a `Vec` and addressed by [`NodeId`]; parents and
//! children refer to each other by id only. Both id namespaces are indexed
//! while the document is read.
//!
//! `RefId` values must be unique: a repeat means the tree cannot be trusted
//! and parsing fails. `Id` (content id) values may repeat, since one object
//! can be linked at several positions; the first position is indexed and
//! later ones are reachable only through the tree.

use std::collections::{BTreeMap, HashMap};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use tracing::{debug, trace};

use crate::error::{Error, Result, StructuralCorruption};
use crate::model::{ObjectType, Timing, TimingKind};
use crate::report::{Stage, WarningKind, Warnings};
use crate::util::{local_name, resolve_entity};
use crate::xml::attribute_value;

/// Index of a node in a [`ContainerStructure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of the container tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerItem {
    /// Structural id, unique within the tree.
    pub ref_id: String,
    /// Object id; absent on some purely structural nodes.
    pub content_id: Option<String>,
    pub title: String,
    pub item_type: ObjectType,
    pub timing: Option<Timing>,
    pub offline: bool,
    /// Custom content style id (`"0"` or empty means default).
    pub style: Option<String>,
    pub page: Option<String>,
    pub start_page: Option<String>,
    pub parent: Option<NodeId>,
    /// Children in document order.
    pub children: Vec<NodeId>,
}

impl ContainerItem {
    /// Whether the item uses a non-default content style.
    pub fn has_custom_style(&self) -> bool {
        self.style
            .as_deref()
            .is_some_and(|s| !s.is_empty() && s != "0")
    }
}

/// The parsed container tree with its two lookup indices.
#[derive(Debug, Clone)]
pub struct ContainerStructure {
    nodes: Vec<ContainerItem>,
    roots: Vec<NodeId>,
    by_ref_id: HashMap<String, NodeId>,
    by_content_id: HashMap<String, NodeId>,
    source_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimingField {
    Start,
    End,
    SuggestionStart,
    SuggestionEnd,
}

impl TimingField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Start" => Some(TimingField::Start),
            b"End" => Some(TimingField::End),
            b"SuggestionStart" => Some(TimingField::SuggestionStart),
            b"SuggestionEnd" => Some(TimingField::SuggestionEnd),
            _ => None,
        }
    }

    fn slot<'t>(&self, timing: &'t mut Timing) -> &'t mut Option<String> {
        match self {
            TimingField::Start => &mut timing.start,
            TimingField::End => &mut timing.end,
            TimingField::SuggestionStart => &mut timing.suggestion_start,
            TimingField::SuggestionEnd => &mut timing.suggestion_end,
        }
    }
}

/// Attributes of an `<Item>` element.
struct ItemAttrs {
    ref_id: String,
    content_id: Option<String>,
    title: String,
    item_type: ObjectType,
    offline: bool,
    style: Option<String>,
    page: Option<String>,
    start_page: Option<String>,
}

impl ContainerStructure {
    /// Parse a container structure document.
    ///
    /// Malformed `<Item>` elements are skipped together with their subtree
    /// and recorded in `warnings`. A duplicate `RefId`, an unparseable
    /// document or a document without any item is fatal.
    pub fn parse(xml: &str, source_path: &str, warnings: &mut Warnings) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut structure = ContainerStructure {
            nodes: Vec::new(),
            roots: Vec::new(),
            by_ref_id: HashMap::new(),
            by_content_id: HashMap::new(),
            source_path: source_path.to_string(),
        };

        // Open <Item> elements, innermost last
        let mut stack: Vec<NodeId> = Vec::new();
        let mut timing: Option<Timing> = None;
        let mut timing_field: Option<TimingField> = None;
        let mut text = String::new();
        let mut skipped = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Item" => match parse_item_attrs(&e) {
                            Ok(attrs) => {
                                let id = structure.insert(attrs, stack.last().copied())?;
                                stack.push(id);
                            }
                            Err(reason) => {
                                skipped += 1;
                                warn_skipped(warnings, source_path, &stack, &structure, &reason);
                                let end = name.as_ref().to_vec();
                                reader.read_to_end(QName(&end))?;
                            }
                        },
                        b"Timing" if !stack.is_empty() => {
                            timing = Some(parse_timing_attrs(&e));
                        }
                        other if timing.is_some() => {
                            timing_field = TimingField::from_name(other);
                            text.clear();
                        }
                        _ => {}
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Item" => match parse_item_attrs(&e) {
                            Ok(attrs) => {
                                structure.insert(attrs, stack.last().copied())?;
                            }
                            Err(reason) => {
                                skipped += 1;
                                warn_skipped(warnings, source_path, &stack, &structure, &reason);
                            }
                        },
                        b"Timing" => {
                            if let Some(&top) = stack.last() {
                                structure.nodes[top.index()].timing = Some(parse_timing_attrs(&e));
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) => {
                    if timing_field.is_some() {
                        text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if timing_field.is_some() {
                        let entity = String::from_utf8_lossy(e.as_ref());
                        if let Some(resolved) = resolve_entity(&entity) {
                            text.push_str(&resolved);
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Item" => {
                            stack.pop();
                        }
                        b"Timing" => {
                            if let (Some(t), Some(&top)) = (timing.take(), stack.last()) {
                                structure.nodes[top.index()].timing = Some(t);
                            }
                            timing_field = None;
                        }
                        _ => {
                            if let (Some(field), Some(t)) = (timing_field.take(), timing.as_mut()) {
                                let value = text.trim();
                                if !value.is_empty() {
                                    *field.slot(t) = Some(value.to_string());
                                }
                                text.clear();
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
        }

        if structure.roots.is_empty() {
            return Err(StructuralCorruption::EmptyContainer {
                path: source_path.to_string(),
            }
            .into());
        }

        debug!(
            path = source_path,
            items = structure.nodes.len(),
            skipped,
            "parsed container structure"
        );
        Ok(structure)
    }

    fn insert(&mut self, attrs: ItemAttrs, parent: Option<NodeId>) -> Result<NodeId> {
        if self.by_ref_id.contains_key(&attrs.ref_id) {
            return Err(StructuralCorruption::DuplicateRefId {
                ref_id: attrs.ref_id,
            }
            .into());
        }

        let id = NodeId(self.nodes.len() as u32);
        self.by_ref_id.insert(attrs.ref_id.clone(), id);
        if let Some(content_id) = &attrs.content_id {
            // First occurrence wins; later links to the same object stay in the tree
            self.by_content_id.entry(content_id.clone()).or_insert(id);
        }
        trace!(ref_id = %attrs.ref_id, item_type = %attrs.item_type, "container item");

        self.nodes.push(ContainerItem {
            ref_id: attrs.ref_id,
            content_id: attrs.content_id,
            title: attrs.title,
            item_type: attrs.item_type,
            timing: None,
            offline: attrs.offline,
            style: attrs.style,
            page: attrs.page,
            start_page: attrs.start_page,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// The first top-level item (normally the exported group or course).
    pub fn root(&self) -> &ContainerItem {
        &self.nodes[self.roots[0].index()]
    }

    pub fn root_id(&self) -> NodeId {
        self.roots[0]
    }

    /// All top-level items in document order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> &ContainerItem {
        &self.nodes[id.index()]
    }

    pub fn by_ref_id(&self, ref_id: &str) -> Option<&ContainerItem> {
        self.by_ref_id.get(ref_id).map(|&id| self.get(id))
    }

    pub fn by_content_id(&self, content_id: &str) -> Option<&ContainerItem> {
        self.by_content_id.get(content_id).map(|&id| self.get(id))
    }

    pub fn node_id_by_content_id(&self, content_id: &str) -> Option<NodeId> {
        self.by_content_id.get(content_id).copied()
    }

    /// Every indexed `RefId`.
    pub fn ref_ids(&self) -> impl Iterator<Item = &str> {
        self.by_ref_id.keys().map(String::as_str)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ContainerItem)> {
        self.get(id).children.iter().map(|&c| (c, self.get(c)))
    }

    /// All nodes in pre-order (document order), without recursion.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.get(id).children.iter().rev().copied());
        }
        order
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).parent;
        }
        depth
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerItem> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Node count per type tag.
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.item_type.as_tag().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Indented outline of the tree, one node per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for id in self.preorder() {
            let node = self.get(id);
            out.push_str(&"  ".repeat(self.depth(id)));
            out.push_str(&format!(
                "{} [{}] ref={} id={}",
                node.title,
                node.item_type,
                node.ref_id,
                node.content_id.as_deref().unwrap_or("-")
            ));
            if node.offline {
                out.push_str(" (offline)");
            }
            out.push('\n');
        }
        out
    }
}

fn parse_item_attrs(e: &BytesStart<'_>) -> std::result::Result<ItemAttrs, String> {
    let mut ref_id = None;
    let mut content_id = None;
    let mut title = None;
    let mut item_type = None;
    let mut offline = false;
    let mut style = None;
    let mut page = None;
    let mut start_page = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("unreadable attribute: {}", err))?;
        let value = attribute_value(&attr);
        match local_name(attr.key.as_ref()) {
            b"RefId" => ref_id = Some(value),
            b"Id" => content_id = Some(value),
            b"Title" => title = Some(value),
            b"Type" => item_type = Some(value),
            b"Offline" => offline = matches!(value.trim(), "1" | "true" | "y"),
            b"Style" => style = Some(value),
            b"Page" => page = Some(value),
            b"StartPage" => start_page = Some(value),
            _ => {}
        }
    }

    let ref_id = ref_id
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| "item has no RefId".to_string())?;
    let item_type = ObjectType::from_tag(item_type.as_deref().unwrap_or_default());
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{} {}", item_type, ref_id));
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    Ok(ItemAttrs {
        ref_id,
        content_id: non_empty(content_id),
        title,
        item_type,
        offline,
        style: non_empty(style),
        page: non_empty(page),
        start_page: non_empty(start_page),
    })
}

fn parse_timing_attrs(e: &BytesStart<'_>) -> Timing {
    let mut timing = Timing::default();
    for attr in e.attributes().flatten() {
        let value = attribute_value(&attr);
        match local_name(attr.key.as_ref()) {
            b"Type" => timing.kind = TimingKind::from_attr(&value),
            b"Visible" => timing.visible = value.trim() == "1",
            b"Changeable" => timing.changeable = value.trim() == "1",
            _ => {}
        }
    }
    timing
}

fn warn_skipped(
    warnings: &mut Warnings,
    source_path: &str,
    stack: &[NodeId],
    structure: &ContainerStructure,
    reason: &str,
) {
    let location = match stack.last() {
        Some(&parent) => format!("child of RefId {}", structure.get(parent).ref_id),
        None => format!("top level of {}", source_path),
    };
    warnings.warn(
        Stage::Structure,
        WarningKind::PartialDamage,
        location,
        format!("{}; subtree skipped", reason),
    );
}
