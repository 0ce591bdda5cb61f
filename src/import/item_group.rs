//! Item group documents.
//!
//! ILIAS has exported item groups in two shapes. The DataSet form stores the
//! group and its membership as separate records:
//!
//! ```xml
//! <ds:DataSet>
//!   <ds:Rec Entity="itgr"><Itgr><Id>12</Id><Title>Video</Title></Itgr></ds:Rec>
//!   <ds:Rec Entity="itgr_item"><ItgrItem><ItgrId>12</ItgrId><ItemId>7</ItemId></ItgrItem></ds:Rec>
//! </ds:DataSet>
//! ```
//!
//! The older form nests the members, sometimes with a denormalized title:
//!
//! ```xml
//! <ItemGroup><Id>12</Id><Title>Video</Title>
//!   <Items><Item id="7" type="mcst"><Title>Einführung</Title></Item></Items>
//! </ItemGroup>
//! ```

use crate::model::ObjectType;
use crate::xml::{Node, XmlTree};

/// One item group and its ordered membership list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroupRecord {
    pub content_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Members in authoring order, exactly as written (ids may be malformed).
    pub members: Vec<ItemGroupMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroupMember {
    pub content_id: String,
    pub inline: Option<InlineHint>,
}

impl ItemGroupMember {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            inline: None,
        }
    }

    pub fn with_hint(content_id: impl Into<String>, title: &str, item_type: Option<ObjectType>) -> Self {
        Self {
            content_id: content_id.into(),
            inline: Some(InlineHint {
                title: Some(title.to_string()).filter(|t| !t.trim().is_empty()),
                item_type,
            }),
        }
    }
}

/// Denormalized member data some exports embed in the item group itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineHint {
    pub title: Option<String>,
    pub item_type: Option<ObjectType>,
}

/// Extract every item group a document describes.
///
/// `fallback_id` is used when the document carries no id of its own (taken
/// from the component directory name).
pub fn parse_item_groups(tree: &XmlTree, fallback_id: Option<&str>) -> Vec<ItemGroupRecord> {
    let mut groups = parse_dataset_form(tree);
    if groups.is_empty() {
        groups = tree
            .find_all("ItemGroup")
            .map(|node| parse_legacy_group(node, fallback_id))
            .collect();
    }
    if groups.len() == 1
        && groups[0].content_id.is_empty()
        && let Some(id) = fallback_id
    {
        groups[0].content_id = id.to_string();
    }
    groups
}

fn dataset_records<'a>(tree: &'a XmlTree, entity: &'a str) -> impl Iterator<Item = Node<'a>> + 'a {
    tree.find_all("Rec").filter(move |rec| rec.attr("Entity") == Some(entity))
}

fn parse_dataset_form(tree: &XmlTree) -> Vec<ItemGroupRecord> {
    let mut groups: Vec<ItemGroupRecord> = dataset_records(tree, "itgr")
        .filter_map(|rec| rec.child("Itgr"))
        .map(|itgr| ItemGroupRecord {
            content_id: itgr.child_text("Id").unwrap_or_default().to_string(),
            title: itgr.child_text("Title").unwrap_or_default().to_string(),
            description: itgr.child_text("Description").map(str::to_string),
            members: Vec::new(),
        })
        .collect();

    for item in dataset_records(tree, "itgr_item").filter_map(|rec| rec.child("ItgrItem")) {
        let member = ItemGroupMember::new(item.child("ItemId").map(|n| n.text()).unwrap_or_default());
        let owner = item.child_text("ItgrId");
        let target = match owner {
            Some(id) => groups.iter_mut().find(|g| g.content_id == id),
            None => None,
        };
        // Single-group documents often omit ItgrId
        match target {
            Some(group) => group.members.push(member),
            None => {
                if let Some(group) = groups.last_mut() {
                    group.members.push(member);
                }
            }
        }
    }
    groups
}

fn parse_legacy_group(node: Node<'_>, fallback_id: Option<&str>) -> ItemGroupRecord {
    let content_id = node
        .child_text("Id")
        .or_else(|| node.attr("Id"))
        .or(fallback_id)
        .unwrap_or_default()
        .to_string();
    let members = node
        .child("Items")
        .into_iter()
        .flat_map(|items| items.children_named("Item"))
        .map(|item| {
            let id = item.attr("id").or_else(|| item.attr("Id")).unwrap_or_default();
            let title = item.child_text("Title").unwrap_or_default();
            let item_type = item
                .attr("type")
                .or_else(|| item.attr("Type"))
                .filter(|t| !t.trim().is_empty())
                .map(ObjectType::from_tag);
            if title.is_empty() && item_type.is_none() {
                ItemGroupMember::new(id)
            } else {
                ItemGroupMember::with_hint(id, title, item_type)
            }
        })
        .collect();

    ItemGroupRecord {
        content_id,
        title: node.child_text("Title").unwrap_or_default().to_string(),
        description: node.child_text("Description").map(str::to_string),
        members,
    }
}
