//! Source features without a faithful Moodle equivalent.

use tracing::debug;

use super::{Severity, Stage, WarningKind, Warnings};
use crate::import::{ContainerItem, ContainerStructure};

/// Scan the container tree and record every feature the backup will lose
/// or approximate.
pub fn check_compatibility(structure: &ContainerStructure, warnings: &mut Warnings) {
    let before = warnings.len();
    for item in structure.iter() {
        check_item(item, warnings);
    }
    debug!(
        items = structure.len(),
        findings = warnings.len() - before,
        "compatibility check finished"
    );
}

fn check_item(item: &ContainerItem, warnings: &mut Warnings) {
    let subject = subject(item);
    let mut finding = |severity, message: String| {
        warnings.record(
            Stage::Compatibility,
            WarningKind::Compatibility,
            severity,
            subject.clone(),
            message,
        );
    };

    if item.item_type.is_unknown() {
        finding(
            Severity::Warning,
            format!(
                "unknown object type '{}'; '{}' is emitted with the default module",
                item.item_type, item.title
            ),
        );
    }

    if let Some(timing) = &item.timing {
        if timing.changeable {
            finding(
                Severity::Warning,
                format!(
                    "'{}' has a timing window members may change; Moodle keeps it only as metadata",
                    item.title
                ),
            );
        }
        if timing.has_suggestion() {
            finding(
                Severity::Info,
                format!("suggested processing time of '{}' has no Moodle counterpart", item.title),
            );
        }
    }

    if item.offline {
        finding(
            Severity::Info,
            format!("'{}' is offline and will be hidden from students", item.title),
        );
    }

    if item.has_custom_style() {
        finding(
            Severity::Warning,
            format!(
                "'{}' uses content style {}; styles are not converted",
                item.title,
                item.style.as_deref().unwrap_or_default()
            ),
        );
    }
}

fn subject(item: &ContainerItem) -> String {
    match &item.content_id {
        Some(id) => format!("{} ({})", item.ref_id, id),
        None => item.ref_id.clone(),
    }
}
