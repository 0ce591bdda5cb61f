//! Flattening a container tree into the course's item sequence.

use std::collections::HashSet;

use tracing::{debug, info};

use super::{ItemGroupResolver, is_valid_content_id, item_from_container, merge_payload};
use crate::import::{ComponentCatalog, ContainerStructure, NodeId};
use crate::model::{ObjectType, ResolvedItem};
use crate::report::{Stage, WarningKind, Warnings};

/// Walk the tree in pre-order and produce the ordered item list.
///
/// - Groups, courses and folders are descended into, never emitted.
/// - An item group node is replaced by its resolved members. Without a
///   catalog record its structural children are used instead.
/// - Leaves claimed by any item group are emitted only through the group.
/// - A content id is emitted once, at its first position.
/// - Media objects are skipped.
pub fn flatten_course(
    structure: &ContainerStructure,
    catalog: &ComponentCatalog,
    warnings: &mut Warnings,
) -> Vec<ResolvedItem> {
    let resolver = ItemGroupResolver::new(structure, catalog);
    let claimed = claimed_members(structure, catalog);

    let mut items: Vec<ResolvedItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut emit = |item: ResolvedItem, items: &mut Vec<ResolvedItem>, warnings: &mut Warnings| {
        if seen.insert(item.content_id.clone()) {
            items.push(item);
        } else {
            warnings.note(
                Stage::Resolver,
                WarningKind::SkippedItem,
                item.content_id.clone(),
                format!(
                    "ref {} repeats content emitted at an earlier position; dropped",
                    item.ref_id.as_deref().unwrap_or("-")
                ),
            );
        }
    };

    let mut stack: Vec<NodeId> = structure.roots().iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let node = structure.get(id);
        let push_children = |stack: &mut Vec<NodeId>| {
            stack.extend(node.children.iter().rev().copied());
        };

        if node.item_type.is_structural() {
            push_children(&mut stack);
            continue;
        }

        match &node.item_type {
            ObjectType::ItemGroup => {
                let group = node
                    .content_id
                    .as_deref()
                    .and_then(|cid| catalog.item_group(cid));
                match group {
                    Some(group) => {
                        let resolution = resolver.resolve_group(group);
                        warnings.extend(resolution.warnings);
                        for mut item in resolution.items {
                            if item.offline || node.offline {
                                item.offline = true;
                            }
                            emit(item, &mut items, warnings);
                        }
                    }
                    None => {
                        warnings.warn(
                            Stage::Resolver,
                            WarningKind::UnresolvableReference,
                            format!("itgr ref {}", node.ref_id),
                            format!(
                                "item group '{}' has no membership record; using its structural children",
                                node.title
                            ),
                        );
                    }
                }
                push_children(&mut stack);
            }
            ObjectType::MediaObject => {
                warnings.warn(
                    Stage::Resolver,
                    WarningKind::SkippedItem,
                    format!("ref {}", node.ref_id),
                    format!("media object '{}' has no Moodle counterpart; skipped", node.title),
                );
            }
            _ => {
                let content_id = node.content_id.clone().unwrap_or_else(|| node.ref_id.clone());
                if claimed.contains(&content_id) {
                    debug!(id = %content_id, "leaf claimed by an item group");
                } else {
                    let mut item = item_from_container(node, &content_id);
                    if let Some(record) = catalog.get(&content_id) {
                        merge_payload(&mut item, record);
                    }
                    emit(item, &mut items, warnings);
                }
                push_children(&mut stack);
            }
        }
    }

    info!(
        nodes = structure.len(),
        items = items.len(),
        "flattened course structure"
    );
    items
}

/// Content ids listed by any item group that appears in the tree.
fn claimed_members(structure: &ContainerStructure, catalog: &ComponentCatalog) -> HashSet<String> {
    structure
        .iter()
        .filter(|node| node.item_type == ObjectType::ItemGroup)
        .filter_map(|node| node.content_id.as_deref())
        .filter_map(|cid| catalog.item_group(cid))
        .flat_map(|group| group.members.iter())
        .filter(|member| is_valid_content_id(&member.content_id))
        .map(|member| member.content_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolutionSource;
    use crate::report::Severity;

    const STRUCTURE: &str = r#"<Items>
      <Item RefId="1" Id="100" Type="grp" Title="Physik">
        <Item RefId="2" Id="12" Type="itgr" Title="Video"/>
        <Item RefId="3" Id="7" Type="mcst" Title="Einführung"/>
        <Item RefId="4" Id="8" Type="mcst" Title="Mechanik" Offline="1"/>
        <Item RefId="5" Type="fold" Title="Material">
          <Item RefId="6" Id="31" Type="file" Title="Skript"/>
          <Item RefId="7" Id="40" Type="mob" Title="Bild"/>
        </Item>
        <Item RefId="8" Id="31" Type="file" Title="Skript (Verknüpfung)"/>
        <Item RefId="9" Id="13" Type="itgr" Title="Ohne Datensatz">
          <Item RefId="10" Id="55" Type="tst" Title="Quiz"/>
        </Item>
      </Item></Items>"#;

    const ITGR: &str = r#"<exp:Export Entity="itgr"><exp:ExportItem Id="12"><ds:DataSet>
      <ds:Rec Entity="itgr"><Itgr><Id>12</Id><Title>Video</Title></Itgr></ds:Rec>
      <ds:Rec Entity="itgr_item"><ItgrItem><ItgrId>12</ItgrId><ItemId>7</ItemId></ItgrItem></ds:Rec>
      <ds:Rec Entity="itgr_item"><ItgrItem><ItgrId>12</ItgrId><ItemId>8</ItemId></ItgrItem></ds:Rec>
      <ds:Rec Entity="itgr_item"><ItgrItem><ItgrId>12</ItgrId><ItemId>999</ItemId></ItgrItem></ds:Rec>
      </ds:DataSet></exp:ExportItem></exp:Export>"#;

    fn flatten() -> (Vec<ResolvedItem>, Warnings) {
        let mut warnings = Warnings::new();
        let structure = ContainerStructure::parse(STRUCTURE, "export.xml", &mut warnings).unwrap();
        let mut catalog = ComponentCatalog::new();
        catalog.add_document(ITGR, "itgr/export.xml", None, &mut warnings);
        let items = flatten_course(&structure, &catalog, &mut warnings);
        (items, warnings)
    }

    #[test]
    fn test_item_group_expands_in_place() {
        let (items, _) = flatten();
        let ids: Vec<_> = items.iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, ["7", "8", "999", "31", "55"]);
        assert!(items[0..2]
            .iter()
            .all(|i| i.resolution_source == ResolutionSource::ContainerLookup));
        assert!(items[1].offline);
        assert!(items[2].is_stub());
    }

    #[test]
    fn test_duplicate_content_first_position_wins() {
        let (items, _) = flatten();
        let skript: Vec<_> = items.iter().filter(|i| i.content_id == "31").collect();
        assert_eq!(skript.len(), 1);
        assert_eq!(skript[0].ref_id.as_deref(), Some("6"));
    }

    #[test]
    fn test_member_listed_by_two_groups_is_reported() {
        let structure = r#"<Items><Item RefId="1" Id="1" Type="crs" Title="K">
          <Item RefId="2" Id="12" Type="itgr" Title="A"/>
          <Item RefId="3" Id="14" Type="itgr" Title="B"/>
          <Item RefId="4" Id="7" Type="tst" Title="Quiz"/>
        </Item></Items>"#;
        let group = |id: &str| {
            format!(
                r#"<exp:Export Entity="itgr"><exp:ExportItem Id="{id}"><ds:DataSet>
                <ds:Rec Entity="itgr"><Itgr><Id>{id}</Id><Title>G</Title></Itgr></ds:Rec>
                <ds:Rec Entity="itgr_item"><ItgrItem><ItgrId>{id}</ItgrId><ItemId>7</ItemId></ItgrItem></ds:Rec>
                </ds:DataSet></exp:ExportItem></exp:Export>"#
            )
        };
        let mut warnings = Warnings::new();
        let structure = ContainerStructure::parse(structure, "export.xml", &mut warnings).unwrap();
        let mut catalog = ComponentCatalog::new();
        catalog.add_document(&group("12"), "itgr_12/export.xml", None, &mut warnings);
        catalog.add_document(&group("14"), "itgr_14/export.xml", None, &mut warnings);

        let items = flatten_course(&structure, &catalog, &mut warnings);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content_id, "7");
        let skipped: Vec<_> = warnings.of_kind(WarningKind::SkippedItem).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].subject, "7");
        assert_eq!(skipped[0].stage, Stage::Resolver);
    }

    #[test]
    fn test_warnings() {
        let (_, warnings) = flatten();
        // media object + second position of content 31
        assert_eq!(warnings.of_kind(WarningKind::SkippedItem).count(), 2);
        let repeated = warnings
            .of_kind(WarningKind::SkippedItem)
            .find(|w| w.subject == "31")
            .unwrap();
        assert_eq!(repeated.severity, Severity::Info);
        assert!(repeated.message.contains("ref 8"));
        // stub member + item group without record
        assert_eq!(warnings.of_kind(WarningKind::UnresolvableReference).count(), 2);
    }
}
