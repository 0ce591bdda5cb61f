//! Backup layout planning: id allocation and type mapping.

use serde::Serialize;
use tracing::debug;

use super::ids::{IdAllocator, section_id};
use super::mapping::{ActivityKind, TypeMapping};
use crate::model::{ResolutionSource, ResolvedItem, Section};
use crate::report::{Stage, WarningKind, Warnings};
use crate::util::sanitize_xml_text;

/// One activity as it will appear in the backup.
#[derive(Debug, Clone)]
pub struct PlannedActivity<'a> {
    /// Course-module id; also used as the instance id.
    pub module_id: u32,
    pub kind: ActivityKind,
    pub section_id: u32,
    pub section_number: usize,
    pub title: String,
    pub visible: bool,
    /// Set when the real payload could not be rendered.
    pub placeholder: bool,
    pub item: &'a ResolvedItem,
}

impl PlannedActivity<'_> {
    /// `activities/<module>_<id>`
    pub fn directory(&self) -> String {
        format!("activities/{}_{}", self.kind.module_name(), self.module_id)
    }

    /// `<module>_<id>`, the key used in backup settings.
    pub fn key(&self) -> String {
        format!("{}_{}", self.kind.module_name(), self.module_id)
    }

    /// Degrade to a label carrying a cleaned-up title.
    pub fn make_placeholder(&mut self) {
        self.kind = ActivityKind::Label;
        self.title = sanitize_xml_text(&self.title).into_owned();
        self.placeholder = true;
    }
}

/// One section as it will appear in the backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSection {
    pub id: u32,
    pub number: usize,
    pub name: String,
    /// Module ids in display order.
    pub sequence: Vec<u32>,
}

impl PlannedSection {
    /// `sections/section_<id>`
    pub fn directory(&self) -> String {
        format!("sections/section_{}", self.id)
    }

    pub fn sequence_string(&self) -> String {
        self.sequence
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The complete id assignment for one backup.
#[derive(Debug, Clone)]
pub struct BackupPlan<'a> {
    pub sections: Vec<PlannedSection>,
    pub activities: Vec<PlannedActivity<'a>>,
}

impl<'a> BackupPlan<'a> {
    /// Allocate ids in section/sequence order.
    pub fn build(sections: &[Section<'a>], mapping: &TypeMapping, warnings: &mut Warnings) -> Self {
        let mut ids = IdAllocator::new();
        let mut planned_sections = Vec::with_capacity(sections.len());
        let mut activities = Vec::new();

        for section in sections {
            let id = section_id(section.ordinal);
            let mut sequence = Vec::with_capacity(section.items.len());
            for &item in &section.items {
                let (module_id, fresh) = ids.allocate(&item.content_id);
                if !fresh {
                    warnings.note(
                        Stage::Emitter,
                        WarningKind::SkippedItem,
                        item.content_id.clone(),
                        format!("already emitted as module {}; later occurrence dropped", module_id),
                    );
                    continue;
                }
                let kind = mapping.map(&item.item_type);
                debug!(
                    module_id,
                    module = kind.module_name(),
                    source_type = %item.item_type,
                    "planned activity"
                );
                sequence.push(module_id);
                activities.push(PlannedActivity {
                    module_id,
                    kind,
                    section_id: id,
                    section_number: section.ordinal,
                    title: item.title.clone(),
                    visible: !item.offline,
                    placeholder: false,
                    item,
                });
            }
            planned_sections.push(PlannedSection {
                id,
                number: section.ordinal,
                name: section.name.clone(),
                sequence,
            });
        }

        Self {
            sections: planned_sections,
            activities,
        }
    }
}

/// Owned description of an emitted backup, returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupContents {
    pub file_name: String,
    pub sections: Vec<PlannedSection>,
    pub activities: Vec<ActivitySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    pub module_id: u32,
    pub module_name: String,
    pub section_id: u32,
    pub title: String,
    pub directory: String,
    pub content_id: String,
    pub source_type: String,
    pub resolution_source: ResolutionSource,
    pub visible: bool,
    pub placeholder: bool,
}

impl From<&PlannedActivity<'_>> for ActivitySummary {
    fn from(activity: &PlannedActivity<'_>) -> Self {
        Self {
            module_id: activity.module_id,
            module_name: activity.kind.module_name().to_string(),
            section_id: activity.section_id,
            title: activity.title.clone(),
            directory: activity.directory(),
            content_id: activity.item.content_id.clone(),
            source_type: activity.item.item_type.as_tag().to_string(),
            resolution_source: activity.item.resolution_source,
            visible: activity.visible,
            placeholder: activity.placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectType;

    fn item(id: &str, item_type: ObjectType) -> ResolvedItem {
        let mut item = ResolvedItem::stub(id);
        item.item_type = item_type;
        item
    }

    #[test]
    fn test_ids_follow_section_order() {
        let a = item("455", ObjectType::Test);
        let b = item("7", ObjectType::MediaCast);
        let mut c = item("31", ObjectType::File);
        c.offline = true;

        let general = Section::new(0, "Allgemein");
        let mut first = Section::new(1, "Wiederholung");
        first.items = vec![&a];
        let mut second = Section::new(2, "Sonstiges");
        second.items = vec![&b, &c];

        let mut warnings = Warnings::new();
        let plan = BackupPlan::build(&[general, first, second], &TypeMapping::new(), &mut warnings);

        let ids: Vec<_> = plan.sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert!(plan.sections[0].sequence.is_empty());
        assert_eq!(plan.sections[1].sequence, [1]);
        assert_eq!(plan.sections[2].sequence_string(), "2,3");

        assert_eq!(plan.activities[0].directory(), "activities/quiz_1");
        assert_eq!(plan.activities[1].directory(), "activities/resource_2");
        assert!(!plan.activities[2].visible);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_repeated_item_gets_one_module() {
        let a = item("455", ObjectType::Test);
        let mut first = Section::new(1, "A");
        first.items = vec![&a];
        let mut second = Section::new(2, "B");
        second.items = vec![&a];

        let mut warnings = Warnings::new();
        let plan = BackupPlan::build(&[first, second], &TypeMapping::new(), &mut warnings);
        assert_eq!(plan.activities.len(), 1);
        assert!(plan.sections[1].sequence.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_placeholder() {
        let mut a = item("1", ObjectType::Test);
        a.title = "Kapitel\u{1}1".into();
        let mut section = Section::new(1, "A");
        section.items = vec![&a];
        let mut warnings = Warnings::new();
        let mut plan = BackupPlan::build(&[section], &TypeMapping::new(), &mut warnings);
        plan.activities[0].make_placeholder();
        assert_eq!(plan.activities[0].directory(), "activities/label_1");
        assert_eq!(plan.activities[0].title, "Kapitel1");
    }
}
