//! Course, section and top-level backup documents.

use super::BackupFile;
use super::activity::RenderContext;
use super::plan::PlannedSection;
use super::writer::{RenderError, XmlWriter, skeleton};

/// Course-level facts written into `course/course.xml` and the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseInfo {
    pub title: String,
    pub summary: Option<String>,
    /// ILIAS installation the export came from.
    pub installation_id: String,
    pub installation_url: String,
}

impl CourseInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Moodle limits short names; keep the first 20 characters.
    pub fn short_name(&self) -> String {
        self.title.chars().take(20).collect::<String>().trim().to_string()
    }
}

/// `sections/section_<id>/section.xml` and its `inforef.xml`.
pub fn render_section(
    section: &PlannedSection,
    ctx: &RenderContext<'_>,
) -> Result<Vec<BackupFile>, RenderError> {
    let id = section.id.to_string();
    let mut w = XmlWriter::new();
    w.start("section", &[("id", &id)])
        .element("number", section.number)
        .element("name", &section.name)
        .empty("summary")
        .element("summaryformat", 1)
        .element("sequence", section.sequence_string())
        .element("visible", 1)
        .null("availabilityjson")
        .null("component")
        .null("itemid")
        .element("timemodified", ctx.timestamp)
        .end();

    let dir = section.directory();
    Ok(vec![
        BackupFile::new(format!("{}/section.xml", dir), w.finish()?),
        BackupFile::new(format!("{}/inforef.xml", dir), skeleton("inforef", &[])),
    ])
}

/// Everything under `course/`.
pub fn render_course(
    course: &CourseInfo,
    format: &str,
    section_count: usize,
    ctx: &RenderContext<'_>,
) -> Result<Vec<BackupFile>, RenderError> {
    let context_id = ctx.course_context_id.to_string();
    let summary = course
        .summary
        .clone()
        .unwrap_or_else(|| format!("Aus ILIAS importierter Kurs: {}", course.title));

    let mut w = XmlWriter::new();
    w.start("course", &[("id", "1"), ("contextid", &context_id)])
        .element("shortname", course.short_name())
        .element("fullname", &course.title)
        .empty("idnumber")
        .element("summary", &summary)
        .element("summaryformat", 1)
        .element("format", format)
        .element("showgrades", 1)
        .element("newsitems", 5)
        .element("startdate", ctx.timestamp)
        .element("enddate", 0)
        .element("marker", 0)
        .element("maxbytes", 0)
        .element("legacyfiles", 0)
        .element("showreports", 0)
        .element("visible", 1)
        .element("groupmode", 0)
        .element("groupmodeforce", 0)
        .element("defaultgroupingid", 0)
        .empty("lang")
        .empty("theme")
        .element("timecreated", ctx.timestamp)
        .element("timemodified", ctx.timestamp)
        .element("requested", 0)
        .element("showactivitydates", 1)
        .element("showcompletionconditions", 0)
        .element("enablecompletion", 0)
        .element("completionnotify", 0);
    w.start("course_format_options", &[]);
    // Section 0 is not counted by the course format
    w.element_with(
        "course_format_option",
        &[("name", "numsections")],
        &section_count.saturating_sub(1).to_string(),
    );
    w.end();
    w.start("category", &[("id", "1")])
        .element("name", "Miscellaneous")
        .null("description")
        .end();
    w.empty("tags");
    w.end();

    let mut files = vec![BackupFile::new("course/course.xml", w.finish()?)];
    let boilerplate = [
        ("inforef.xml", skeleton("inforef", &[])),
        ("roles.xml", skeleton("roles", &["role_overrides", "role_assignments"])),
        ("enrolments.xml", skeleton("enrolments", &["enrols"])),
        ("filters.xml", skeleton("filters", &["filter_actives", "filter_configs"])),
        ("comments.xml", skeleton("comments", &[])),
        ("calendar.xml", skeleton("events", &[])),
        ("completiondefaults.xml", skeleton("course_completion_defaults", &[])),
        ("contentbank.xml", skeleton("contents", &[])),
        (
            "competencies.xml",
            skeleton("course_competencies", &["competencies", "user_competencies"]),
        ),
        ("logs.xml", skeleton("logs", &[])),
        ("logstores.xml", skeleton("logstores", &[])),
    ];
    files.extend(
        boilerplate
            .into_iter()
            .map(|(name, body)| BackupFile::new(format!("course/{}", name), body)),
    );
    Ok(files)
}

/// The backup-wide documents next to `moodle_backup.xml`.
pub fn render_toplevel() -> Vec<BackupFile> {
    [
        ("files.xml", skeleton("files", &[])),
        ("users.xml", skeleton("users", &[])),
        ("roles.xml", skeleton("roles_definition", &[])),
        ("scales.xml", skeleton("scales_definition", &[])),
        ("outcomes.xml", skeleton("outcomes_definition", &[])),
        ("questions.xml", skeleton("question_categories", &[])),
        ("groups.xml", skeleton("groups", &["groupings"])),
        (
            "gradebook.xml",
            skeleton(
                "gradebook",
                &["attributes", "grade_categories", "grade_items", "grade_letters", "grade_settings"],
            ),
        ),
        ("grade_history.xml", skeleton("grade_history", &["grade_grades"])),
        ("completion.xml", skeleton("course_completion", &[])),
        ("badges.xml", skeleton("badges", &[])),
    ]
    .into_iter()
    .map(|(name, body)| BackupFile::new(name, body))
    .collect()
}
