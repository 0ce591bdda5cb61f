//! ItemGroup Resolver.
//!
//! An item group lists member content ids; this module turns each member
//! into a concrete [`ResolvedItem`]. Lookups are expressed as an ordered
//! list of [`ResolveStrategy`] values tried left to right, with a labeled
//! stub as the final fallback so every well-formed member surfaces.
//!
//! Resolution is a pure function of the group, the container tree and the
//! component catalog; the only output besides the items is the warning list
//! returned in [`Resolution`].

mod course;

pub use course::flatten_course;

use tracing::{debug, trace};

use crate::import::{ComponentCatalog, ComponentRecord, ContainerItem, ContainerStructure};
use crate::import::{ItemGroupMember, ItemGroupRecord};
use crate::model::{ResolutionSource, ResolvedItem};
use crate::report::{Stage, WarningKind, Warnings};

/// One way of finding a member.
pub trait ResolveStrategy {
    /// The tag recorded on items this strategy produces.
    fn source(&self) -> ResolutionSource;

    /// Try to resolve a single member.
    fn resolve(&self, member: &ItemGroupMember) -> Option<ResolvedItem>;
}

/// Looks the member up in the container tree's content id index.
pub struct ContainerLookup<'a> {
    structure: &'a ContainerStructure,
}

impl<'a> ContainerLookup<'a> {
    pub fn new(structure: &'a ContainerStructure) -> Self {
        Self { structure }
    }
}

impl ResolveStrategy for ContainerLookup<'_> {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::ContainerLookup
    }

    fn resolve(&self, member: &ItemGroupMember) -> Option<ResolvedItem> {
        self.structure
            .by_content_id(&member.content_id)
            .map(|node| item_from_container(node, &member.content_id))
    }
}

/// Looks the member up in the component catalog.
pub struct CatalogLookup<'a> {
    catalog: &'a ComponentCatalog,
}

impl<'a> CatalogLookup<'a> {
    pub fn new(catalog: &'a ComponentCatalog) -> Self {
        Self { catalog }
    }
}

impl ResolveStrategy for CatalogLookup<'_> {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::CatalogLookup
    }

    fn resolve(&self, member: &ItemGroupMember) -> Option<ResolvedItem> {
        self.catalog.get(&member.content_id).map(item_from_record)
    }
}

/// Uses the title/type copy some item group documents embed per member.
pub struct InlineMetadata;

impl ResolveStrategy for InlineMetadata {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::InlineMetadata
    }

    fn resolve(&self, member: &ItemGroupMember) -> Option<ResolvedItem> {
        let hint = member.inline.as_ref()?;
        if hint.title.is_none() && hint.item_type.is_none() {
            return None;
        }
        let mut item = ResolvedItem::stub(&member.content_id);
        item.resolution_source = ResolutionSource::InlineMetadata;
        if let Some(title) = &hint.title {
            item.title = title.clone();
        }
        if let Some(item_type) = &hint.item_type {
            item.item_type = item_type.clone();
        }
        Some(item)
    }
}

/// Result of resolving one item group.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// One item per well-formed member, in membership order.
    pub items: Vec<ResolvedItem>,
    pub warnings: Warnings,
}

/// Resolves item group members against the tree and the catalog.
pub struct ItemGroupResolver<'a> {
    strategies: Vec<Box<dyn ResolveStrategy + 'a>>,
    catalog: Option<&'a ComponentCatalog>,
}

impl<'a> ItemGroupResolver<'a> {
    /// The standard chain: container, catalog, inline metadata.
    pub fn new(structure: &'a ContainerStructure, catalog: &'a ComponentCatalog) -> Self {
        Self {
            strategies: vec![
                Box::new(ContainerLookup::new(structure)),
                Box::new(CatalogLookup::new(catalog)),
                Box::new(InlineMetadata),
            ],
            catalog: Some(catalog),
        }
    }

    /// A resolver with a custom chain and no catalog enrichment.
    pub fn with_strategies(strategies: Vec<Box<dyn ResolveStrategy + 'a>>) -> Self {
        Self {
            strategies,
            catalog: None,
        }
    }

    /// Resolve every member of `group`.
    pub fn resolve_group(&self, group: &ItemGroupRecord) -> Resolution {
        let mut resolution = self.resolve_members(&group.content_id, &group.members);
        for item in &mut resolution.items {
            if !group.title.is_empty() {
                item.metadata
                    .entry("item_group".to_string())
                    .or_insert_with(|| group.title.clone());
            }
        }
        resolution
    }

    /// Resolve a membership list. `group_id` only labels warnings.
    pub fn resolve_members(&self, group_id: &str, members: &[ItemGroupMember]) -> Resolution {
        let mut resolution = Resolution {
            items: Vec::with_capacity(members.len()),
            warnings: Warnings::new(),
        };

        for member in members {
            if !is_valid_content_id(&member.content_id) {
                resolution.warnings.warn(
                    Stage::Resolver,
                    WarningKind::SkippedItem,
                    format!("itgr {}", group_id),
                    format!("member id {:?} is malformed; skipped", member.content_id),
                );
                continue;
            }
            let item = self.resolve_member(member);
            if item.is_stub() {
                resolution.warnings.warn(
                    Stage::Resolver,
                    WarningKind::UnresolvableReference,
                    member.content_id.clone(),
                    format!("member of item group {} matched nothing; emitted as stub", group_id),
                );
            }
            resolution.items.push(item);
        }

        debug!(
            group = group_id,
            members = members.len(),
            resolved = resolution.items.len(),
            "resolved item group"
        );
        resolution
    }

    /// Run the strategy chain for one member, falling back to a stub.
    pub fn resolve_member(&self, member: &ItemGroupMember) -> ResolvedItem {
        let found = self.strategies.iter().find_map(|strategy| {
            let item = strategy.resolve(member)?;
            trace!(id = %member.content_id, source = strategy.source().as_str(), "member resolved");
            Some(item)
        });
        match found {
            Some(mut item) => {
                if let Some(catalog) = self.catalog
                    && item.resolution_source != ResolutionSource::CatalogLookup
                    && let Some(record) = catalog.get(&item.content_id)
                {
                    merge_payload(&mut item, record);
                }
                item
            }
            None => ResolvedItem::stub(&member.content_id),
        }
    }
}

/// Whether a member id looks like an authored reference.
///
/// Empty ids and ids with characters other than ASCII alphanumerics, `_`
/// and `-` (whitespace included) are encoding artifacts.
pub fn is_valid_content_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Build an item from a container node.
pub(crate) fn item_from_container(node: &ContainerItem, content_id: &str) -> ResolvedItem {
    let mut item = ResolvedItem {
        content_id: content_id.to_string(),
        ref_id: Some(node.ref_id.clone()),
        title: node.title.clone(),
        item_type: node.item_type.clone(),
        resolution_source: ResolutionSource::ContainerLookup,
        timing: node.timing.clone(),
        offline: node.offline,
        metadata: Default::default(),
    };
    for (key, value) in [
        ("style", &node.style),
        ("page", &node.page),
        ("start_page", &node.start_page),
    ] {
        if let Some(value) = value {
            item.metadata.insert(key.to_string(), value.clone());
        }
    }
    item
}

fn item_from_record(record: &ComponentRecord) -> ResolvedItem {
    ResolvedItem {
        content_id: record.content_id.clone(),
        ref_id: None,
        title: record.title.clone(),
        item_type: record.component_type.clone(),
        resolution_source: ResolutionSource::CatalogLookup,
        timing: None,
        offline: false,
        metadata: record.payload.clone(),
    }
}

/// Add catalog payload fields without overwriting what the item has.
pub(crate) fn merge_payload(item: &mut ResolvedItem, record: &ComponentRecord) {
    for (key, value) in &record.payload {
        item.metadata
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    if item.item_type.is_unknown() && !record.component_type.is_unknown() {
        item.item_type = record.component_type.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectType;

    const STRUCTURE: &str = r#"<Items>
      <Item RefId="1" Id="100" Type="grp" Title="Physik">
        <Item RefId="2" Id="12" Type="itgr" Title="Video"/>
        <Item RefId="3" Id="7" Type="mcst" Title="Einführung"/>
        <Item RefId="4" Id="8" Type="mcst" Title="Mechanik"/>
      </Item></Items>"#;

    const TEST_DOC: &str = r#"<exp:Export Entity="tst"><exp:ExportItem Id="455">
      <Test><Title>Abschlusstest</Title><Question/><Question/></Test>
      </exp:ExportItem></exp:Export>"#;

    fn fixtures() -> (ContainerStructure, ComponentCatalog) {
        let mut warnings = Warnings::new();
        let structure = ContainerStructure::parse(STRUCTURE, "export.xml", &mut warnings).unwrap();
        let mut catalog = ComponentCatalog::new();
        catalog.add_document(TEST_DOC, "set_2/tst/export.xml", None, &mut warnings);
        (structure, catalog)
    }

    fn group(title: &str, members: Vec<ItemGroupMember>) -> ItemGroupRecord {
        ItemGroupRecord {
            content_id: "12".into(),
            title: title.into(),
            description: None,
            members,
        }
    }

    #[test]
    fn test_container_lookup_preserves_order() {
        let (structure, catalog) = fixtures();
        let resolver = ItemGroupResolver::new(&structure, &catalog);
        let resolution = resolver.resolve_group(&group(
            "Video",
            vec![ItemGroupMember::new("7"), ItemGroupMember::new("8")],
        ));

        assert!(resolution.warnings.is_empty());
        let ids: Vec<_> = resolution.items.iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, ["7", "8"]);
        for item in &resolution.items {
            assert_eq!(item.resolution_source, ResolutionSource::ContainerLookup);
            assert!(item.ref_id.is_some());
            assert_eq!(item.metadata.get("item_group").map(String::as_str), Some("Video"));
        }
    }

    #[test]
    fn test_strategy_fallthrough() {
        let (structure, catalog) = fixtures();
        let resolver = ItemGroupResolver::new(&structure, &catalog);
        let members = vec![
            ItemGroupMember::new("455"),
            ItemGroupMember::with_hint("31", "Skript", Some(ObjectType::File)),
            ItemGroupMember::new("999"),
        ];
        let resolution = resolver.resolve_members("12", &members);

        let sources: Vec<_> = resolution.items.iter().map(|i| i.resolution_source).collect();
        assert_eq!(
            sources,
            [
                ResolutionSource::CatalogLookup,
                ResolutionSource::InlineMetadata,
                ResolutionSource::FallbackStub
            ]
        );
        assert_eq!(resolution.items[0].title, "Abschlusstest");
        assert_eq!(resolution.items[0].item_type, ObjectType::Test);
        assert_eq!(resolution.items[1].item_type, ObjectType::File);

        let stub = &resolution.items[2];
        assert_eq!(stub.title, "Item 999");
        assert_eq!(stub.item_type, ObjectType::unknown());
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(
            resolution.warnings.iter().next().unwrap().kind,
            WarningKind::UnresolvableReference
        );
    }

    #[test]
    fn test_malformed_members_are_skipped() {
        let (structure, catalog) = fixtures();
        let resolver = ItemGroupResolver::new(&structure, &catalog);
        let members = vec![
            ItemGroupMember::new(""),
            ItemGroupMember::new("7"),
            ItemGroupMember::new("  "),
            ItemGroupMember::new("8<x>"),
        ];
        let resolution = resolver.resolve_members("12", &members);
        assert_eq!(resolution.items.len(), 1);
        assert_eq!(resolution.warnings.of_kind(WarningKind::SkippedItem).count(), 3);
    }

    #[test]
    fn test_custom_chain() {
        let (structure, _) = fixtures();
        let resolver = ItemGroupResolver::with_strategies(vec![Box::new(ContainerLookup::new(&structure))]);
        let item = resolver.resolve_member(&ItemGroupMember::with_hint("42", "Hint", None));
        assert!(item.is_stub());
    }

    #[test]
    fn test_content_id_validation() {
        assert!(is_valid_content_id("455"));
        assert!(is_valid_content_id("il_0_tst_455"));
        assert!(!is_valid_content_id(""));
        assert!(!is_valid_content_id("a b"));
        assert!(!is_valid_content_id("7/8"));
    }
}
