//! `moodle_backup.xml`, the backup descriptor.

use super::activity::RenderContext;
use super::course::CourseInfo;
use super::plan::BackupPlan;
use super::writer::{RenderError, XmlWriter};
use super::BackupConfig;

/// Root-level settings in the order the backup UI lists them.
const ROOT_SETTINGS: &[(&str, &str)] = &[
    ("users", "0"),
    ("anonymize", "0"),
    ("role_assignments", "0"),
    ("activities", "1"),
    ("blocks", "0"),
    ("files", "1"),
    ("filters", "0"),
    ("comments", "0"),
    ("badges", "0"),
    ("calendarevents", "0"),
    ("userscompletion", "0"),
    ("logs", "0"),
    ("grade_histories", "0"),
    ("questionbank", "1"),
    ("groups", "0"),
    ("competencies", "0"),
    ("customfield", "0"),
    ("contentbankcontent", "0"),
    ("xapistate", "0"),
    ("legacyfiles", "0"),
];

/// Hex digest identifying `text`; stands in for Moodle's md5 identifiers.
fn digest(text: &str) -> String {
    let hex = sha1_smol::Sha1::from(text).digest().to_string();
    hex[..32].to_string()
}

fn setting(w: &mut XmlWriter, level: &str, scope: Option<&str>, name: &str, value: &str) {
    w.start("setting", &[]).element("level", level);
    if let Some(scope) = scope {
        w.element(level, scope);
    }
    w.element("name", name).element("value", value).end();
}

/// Render the descriptor for a fully planned backup.
pub fn render_backup_descriptor(
    plan: &BackupPlan<'_>,
    course: &CourseInfo,
    file_name: &str,
    config: &BackupConfig,
    ctx: &RenderContext<'_>,
) -> Result<String, RenderError> {
    let wwwroot = config.wwwroot_for(course);
    let backup_id = digest(&format!("{}:{}:{}", course.title, file_name, ctx.timestamp));

    let mut w = XmlWriter::new();
    w.start("moodle_backup", &[]);
    w.start("information", &[])
        .element("name", file_name)
        .element("moodle_version", &config.moodle_version)
        .element("moodle_release", &config.moodle_release)
        .element("backup_version", &config.backup_version)
        .element("backup_release", &config.backup_release)
        .element("backup_date", ctx.timestamp)
        .element("mnet_remoteusers", 0)
        .element("include_files", 1)
        .element("include_file_references_to_external_content", 0)
        .element("original_wwwroot", &wwwroot)
        .element("original_site_identifier_hash", digest(&wwwroot))
        .element("original_course_id", 1)
        .element("original_course_format", &config.course_format)
        .element("original_course_fullname", &course.title)
        .element("original_course_shortname", course.short_name())
        .element("original_course_startdate", ctx.timestamp)
        .element("original_course_enddate", 0)
        .element("original_course_contextid", ctx.course_context_id)
        .element("original_system_contextid", 1);

    w.start("details", &[])
        .start("detail", &[("backup_id", &backup_id)])
        .element("type", "course")
        .element("format", "moodle2")
        .element("interactive", 1)
        .element("mode", 10)
        .element("execution", 1)
        .element("executiontime", 0)
        .end()
        .end();

    w.start("contents", &[]);
    w.start("activities", &[]);
    for activity in &plan.activities {
        w.start("activity", &[])
            .element("moduleid", activity.module_id)
            .element("sectionid", activity.section_id)
            .element("modulename", activity.kind.module_name())
            .element("title", &activity.title)
            .element("directory", activity.directory())
            .empty("insubsection")
            .end();
    }
    w.end();
    w.start("sections", &[]);
    for section in &plan.sections {
        w.start("section", &[])
            .element("sectionid", section.id)
            .element("title", &section.name)
            .element("directory", section.directory())
            .empty("parentcmid")
            .empty("modname")
            .end();
    }
    w.end();
    w.start("course", &[])
        .element("courseid", 1)
        .element("title", &course.title)
        .element("directory", "course")
        .end();
    w.end();

    w.start("settings", &[]);
    setting(&mut w, "root", None, "filename", file_name);
    for (name, value) in ROOT_SETTINGS {
        setting(&mut w, "root", None, name, value);
    }
    for section in &plan.sections {
        let key = format!("section_{}", section.id);
        setting(&mut w, "section", Some(&key), &format!("{}_included", key), "1");
        setting(&mut w, "section", Some(&key), &format!("{}_userinfo", key), "0");
    }
    for activity in &plan.activities {
        let key = activity.key();
        setting(&mut w, "activity", Some(&key), &format!("{}_included", key), "1");
        setting(&mut w, "activity", Some(&key), &format!("{}_userinfo", key), "0");
    }
    w.end();

    w.end().end();
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::TypeMapping;
    use crate::model::{ObjectType, ResolvedItem, Section};
    use crate::report::Warnings;

    #[test]
    fn test_descriptor_lists_everything() {
        let mut quiz = ResolvedItem::stub("455");
        quiz.title = "Abschlusstest".into();
        quiz.item_type = ObjectType::Test;
        let general = Section::new(0, "Allgemein");
        let mut first = Section::new(1, "Wiederholung");
        first.items = vec![&quiz];

        let plan = BackupPlan::build(&[general, first], &TypeMapping::new(), &mut Warnings::new());
        let config = BackupConfig::default();
        let ctx = RenderContext {
            timestamp: 1_700_000_000,
            moodle_version: &config.moodle_version,
            course_context_id: 100,
        };
        let course = CourseInfo::new("Physik");
        let xml = render_backup_descriptor(&plan, &course, "backup.mbz", &config, &ctx).unwrap();

        assert!(xml.contains("<name>backup.mbz</name>"));
        assert!(xml.contains("<directory>activities/quiz_1</directory>"));
        assert!(xml.contains("<directory>sections/section_2</directory>"));
        assert!(xml.contains("<name>section_1_included</name>"));
        assert!(xml.contains("<activity>quiz_1</activity>"));
        assert!(xml.contains("<name>quiz_1_userinfo</name>"));
        assert!(xml.contains("<original_course_format>topics</original_course_format>"));
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest("https://ilias.example.org"), digest("https://ilias.example.org"));
        assert_eq!(digest("x").len(), 32);
    }
}
