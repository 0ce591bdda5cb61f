//! Section Categorizer.
//!
//! Partitions the course's ordered items into sections:
//!
//! - ordinal 0 is the general section and stays empty;
//! - each item goes to the section named by the first matching rule;
//! - consecutive items with the same section name share one section, a
//!   later non-adjacent run opens a new section with the same name;
//! - items no rule matches are collected into the fallback section, which
//!   comes last and is only emitted when non-empty.
//!
//! An unmatched item ends the current run, so the next rule-assigned item
//! opens a new section even when its name equals the previous one.

mod rules;

pub use rules::{CategoryRule, RuleTable, SectionNames};

use tracing::{debug, info};

use crate::model::{ResolvedItem, Section};

/// Split `items` into sections according to `rules`.
pub fn categorize<'a>(items: &'a [ResolvedItem], rules: &RuleTable) -> Vec<Section<'a>> {
    let mut sections = vec![Section::new(0, rules.names.general.clone())];
    let mut unmatched: Vec<&'a ResolvedItem> = Vec::new();
    // Whether the last section is still open for adjacent items
    let mut run_open = false;

    for item in items {
        let Some(name) = rules.section_for(item) else {
            debug!(id = %item.content_id, "no rule matched");
            unmatched.push(item);
            run_open = false;
            continue;
        };
        let last = sections.len() - 1;
        if run_open && sections[last].name == name {
            sections[last].items.push(item);
        } else {
            let mut section = Section::new(sections.len(), name);
            section.items.push(item);
            sections.push(section);
            run_open = true;
        }
    }

    if !unmatched.is_empty() {
        let mut fallback = Section::new(sections.len(), rules.names.fallback.clone());
        fallback.items = unmatched;
        sections.push(fallback);
    }

    info!(
        items = items.len(),
        sections = sections.len(),
        "categorized course items"
    );
    sections
}
