//! Resolved course items.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{ObjectType, Timing};

/// Which lookup produced a [`ResolvedItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    /// Found as a node of the container tree.
    ContainerLookup,
    /// Found in the component catalog.
    CatalogLookup,
    /// Built from hints embedded in the item group document.
    InlineMetadata,
    /// Nothing matched; a labeled placeholder.
    FallbackStub,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::ContainerLookup => "container-lookup",
            ResolutionSource::CatalogLookup => "catalog-lookup",
            ResolutionSource::InlineMetadata => "inline-metadata",
            ResolutionSource::FallbackStub => "fallback-stub",
        }
    }
}

/// One concrete course item, ready for categorization and emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedItem {
    pub content_id: String,
    /// Present only when the item was found in the container tree.
    pub ref_id: Option<String>,
    pub title: String,
    pub item_type: ObjectType,
    pub resolution_source: ResolutionSource,
    pub timing: Option<Timing>,
    pub offline: bool,
    /// Opaque extra fields (component payload, style, ...).
    pub metadata: BTreeMap<String, String>,
}

impl ResolvedItem {
    /// Placeholder for a member nothing else could resolve.
    pub fn stub(content_id: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            ref_id: None,
            title: format!("Item {}", content_id),
            item_type: ObjectType::unknown(),
            resolution_source: ResolutionSource::FallbackStub,
            timing: None,
            offline: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_stub(&self) -> bool {
        self.resolution_source == ResolutionSource::FallbackStub
    }
}
