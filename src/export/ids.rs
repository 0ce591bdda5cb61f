//! Target id allocation.

use std::collections::HashMap;

/// Hands out course-module ids from 1 upward, one per content id.
///
/// The map lives for one conversion job only; the same content id always
/// gets the same target id within it.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
    by_content_id: HashMap<String, u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: 1,
            by_content_id: HashMap::new(),
        }
    }

    /// Id for `content_id`, and whether it was freshly allocated.
    pub fn allocate(&mut self, content_id: &str) -> (u32, bool) {
        if let Some(&id) = self.by_content_id.get(content_id) {
            return (id, false);
        }
        let id = self.next.max(1);
        self.next = id + 1;
        self.by_content_id.insert(content_id.to_string(), id);
        (id, true)
    }

    pub fn get(&self, content_id: &str) -> Option<u32> {
        self.by_content_id.get(content_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_content_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_content_id.is_empty()
    }
}

/// Moodle section id for a section ordinal.
pub fn section_id(ordinal: usize) -> u32 {
    ordinal as u32 + 1
}
