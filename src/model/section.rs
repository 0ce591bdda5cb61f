//! Target-side sections.

use super::ResolvedItem;

/// A named, ordered group of items in the emitted course.
///
/// Items are borrowed from the resolver output; a section never owns them.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    /// 0-based position; 0 is the general section.
    pub ordinal: usize,
    pub name: String,
    pub items: Vec<&'a ResolvedItem>,
}

impl<'a> Section<'a> {
    pub fn new(ordinal: usize, name: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
