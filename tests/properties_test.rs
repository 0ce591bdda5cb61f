//! Property tests: id uniqueness in the parsed tree, totality of item group
//! resolution, and contiguous, order-preserving categorization.

use std::collections::HashSet;

use proptest::prelude::*;

use ilias2moodle::categorize::{CategoryRule, RuleTable, categorize};
use ilias2moodle::export::{BackupPlan, TypeMapping};
use ilias2moodle::import::{ComponentCatalog, ContainerStructure, ItemGroupMember};
use ilias2moodle::model::{ObjectType, ResolvedItem};
use ilias2moodle::report::Warnings;
use ilias2moodle::ItemGroupResolver;

const TYPES: &[&str] = &["fold", "file", "tst", "mcst", "frm", "wiki", "exc", "itgr", "bibl"];

/// Render a tree where node `i > 0` hangs below node `parents[i - 1] % i`.
fn render_tree(parents: &[usize], types: &[usize]) -> (String, usize) {
    let count = parents.len() + 1;
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, parent) in parents.iter().enumerate() {
        let node = i + 1;
        children[parent % node].push(node);
    }

    fn write(node: usize, children: &[Vec<usize>], types: &[usize], out: &mut String) {
        let item_type = if node == 0 {
            "grp"
        } else {
            TYPES[types[node % types.len()] % TYPES.len()]
        };
        out.push_str(&format!(
            r#"<Item RefId="{}" Id="{}" Title="Item {}" Type="{}">"#,
            1000 + node,
            node,
            node,
            item_type
        ));
        for &child in &children[node] {
            write(child, children, types, out);
        }
        out.push_str("</Item>");
    }

    let mut out = String::from("<Items>");
    write(0, &children, types, &mut out);
    out.push_str("</Items>");
    (out, count)
}

fn item(id: usize, item_type: &str, title: &str) -> ResolvedItem {
    let mut item = ResolvedItem::stub(&id.to_string());
    item.item_type = ObjectType::from_tag(item_type);
    item.title = title.to_string();
    item
}

proptest! {
    #[test]
    fn prop_every_ref_id_indexed_once(
        parents in prop::collection::vec(any::<usize>(), 0..60),
        types in prop::collection::vec(any::<usize>(), 1..8),
    ) {
        let (xml, count) = render_tree(&parents, &types);
        let mut warnings = Warnings::new();
        let structure = ContainerStructure::parse(&xml, "export.xml", &mut warnings).unwrap();

        prop_assert_eq!(structure.len(), count);
        let ref_ids: HashSet<&str> = structure.ref_ids().collect();
        prop_assert_eq!(ref_ids.len(), count);
        for node in 0..count {
            let ref_id = (1000 + node).to_string();
            let found = structure.by_ref_id(&ref_id);
            prop_assert!(found.is_some());
            prop_assert_eq!(&found.unwrap().ref_id, &ref_id);
        }
        prop_assert_eq!(structure.preorder().len(), count);
        prop_assert!(warnings.is_empty());
    }

    #[test]
    fn prop_resolution_is_total_and_ordered(
        members in prop::collection::vec(0usize..20, 0..30),
    ) {
        // Content ids 0-6 exist in the tree; the rest fall through to stubs
        let (xml, _) = render_tree(&[0; 6], &[1]);
        let mut warnings = Warnings::new();
        let structure = ContainerStructure::parse(&xml, "export.xml", &mut warnings).unwrap();
        let catalog = ComponentCatalog::new();
        let resolver = ItemGroupResolver::new(&structure, &catalog);

        let members: Vec<ItemGroupMember> =
            members.iter().map(|id| ItemGroupMember::new(id.to_string())).collect();
        let resolution = resolver.resolve_members("1", &members);

        prop_assert_eq!(resolution.items.len(), members.len());
        for (item, member) in resolution.items.iter().zip(&members) {
            prop_assert_eq!(&item.content_id, &member.content_id);
        }
        let stubs = resolution.items.iter().filter(|i| i.is_stub()).count();
        prop_assert_eq!(resolution.warnings.len(), stubs);
    }

    #[test]
    fn prop_sections_contiguous_and_complete(
        picks in prop::collection::vec((0usize..TYPES.len(), any::<bool>()), 0..50),
    ) {
        let items: Vec<ResolvedItem> = picks
            .iter()
            .enumerate()
            .map(|(i, &(t, video))| item(i, TYPES[t], if video { "Video Teil" } else { "Kapitel" }))
            .collect();
        let rules = RuleTable::new(vec![
            CategoryRule::new("Videos").keyword("video"),
            CategoryRule::new("Tests").item_type(ObjectType::Test),
            CategoryRule::new("Material").item_type(ObjectType::File).item_type(ObjectType::Folder),
        ]);

        let sections = categorize(&items, &rules);

        // Ordinals are 0..n with the empty general section first
        for (i, section) in sections.iter().enumerate() {
            prop_assert_eq!(section.ordinal, i);
        }
        prop_assert!(sections[0].is_empty());
        prop_assert!(sections[1..].iter().all(|s| !s.is_empty()));

        // Each rule section is a run of consecutive input items; two
        // neighbouring sections share a name only across an unmatched item
        let position = |id: &str| items.iter().position(|i| i.content_id == id).unwrap();
        let ruled = if sections.last().is_some_and(|s| s.name == rules.names.fallback) {
            &sections[1..sections.len() - 1]
        } else {
            &sections[1..]
        };
        for section in ruled {
            let first = position(&section.items[0].content_id);
            for (offset, item) in section.items.iter().enumerate() {
                prop_assert_eq!(position(&item.content_id), first + offset);
            }
        }
        for pair in ruled.windows(2) {
            if pair[0].name == pair[1].name {
                let end = position(&pair[0].items[pair[0].len() - 1].content_id);
                let start = position(&pair[1].items[0].content_id);
                prop_assert!(start > end + 1);
            }
        }

        // Every item appears exactly once; matched items keep their order
        let placed: Vec<&str> = sections
            .iter()
            .flat_map(|s| s.items.iter().map(|i| i.content_id.as_str()))
            .collect();
        prop_assert_eq!(placed.len(), items.len());
        let unique: HashSet<&str> = placed.iter().copied().collect();
        prop_assert_eq!(unique.len(), items.len());

        let matched: Vec<&str> = items
            .iter()
            .filter(|i| rules.section_for(i).is_some())
            .map(|i| i.content_id.as_str())
            .collect();
        prop_assert_eq!(&placed[..matched.len()], &matched[..]);
    }

    #[test]
    fn prop_module_ids_sequential(
        picks in prop::collection::vec(0usize..TYPES.len(), 0..40),
    ) {
        let items: Vec<ResolvedItem> =
            picks.iter().enumerate().map(|(i, &t)| item(i, TYPES[t], "x")).collect();
        let rules = RuleTable::new(vec![CategoryRule::new("Tests").item_type(ObjectType::Test)]);
        let sections = categorize(&items, &rules);

        let plan = BackupPlan::build(&sections, &TypeMapping::new(), &mut Warnings::new());

        let ids: Vec<u32> = plan.sections.iter().flat_map(|s| s.sequence.iter().copied()).collect();
        let expected: Vec<u32> = (1..=items.len() as u32).collect();
        prop_assert_eq!(ids, expected);
        for (i, section) in plan.sections.iter().enumerate() {
            prop_assert_eq!(section.id, i as u32 + 1);
        }
    }
}
