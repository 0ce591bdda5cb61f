//! Per-activity documents under `activities/<module>_<id>/`.

use super::mapping::ActivityKind;
use super::plan::PlannedActivity;
use super::writer::{RenderError, XmlWriter, skeleton};
use super::BackupFile;
use crate::model::Timing;

/// Values shared by every document of one backup.
#[derive(Debug, Clone)]
pub struct RenderContext<'c> {
    pub timestamp: i64,
    pub moodle_version: &'c str,
    pub course_context_id: u32,
}

impl RenderContext<'_> {
    pub fn activity_context_id(&self, module_id: u32) -> u32 {
        self.course_context_id + module_id
    }
}

/// Render all documents of one activity.
///
/// Fails only when some text cannot be carried by XML 1.0; the caller then
/// retries with the activity degraded to a placeholder.
pub fn render_activity(
    activity: &PlannedActivity<'_>,
    ctx: &RenderContext<'_>,
) -> Result<Vec<BackupFile>, RenderError> {
    let dir = activity.directory();
    let module = activity.kind.module_name();

    let mut files = vec![
        BackupFile::new(format!("{}/module.xml", dir), render_module(activity, ctx)?),
        BackupFile::new(format!("{}/{}.xml", dir, module), render_instance(activity, ctx)?),
        BackupFile::new(format!("{}/ilias.xml", dir), render_source_metadata(activity)?),
    ];

    let grades = if activity.kind.is_graded() {
        skeleton("activity_gradebook", &["grade_items", "grade_letters"])
    } else {
        skeleton("activity_gradebook", &["grade_letters"])
    };
    let boilerplate = [
        ("inforef.xml", skeleton("inforef", &[])),
        ("grades.xml", grades),
        ("grade_history.xml", skeleton("grade_history", &["grade_grades"])),
        ("roles.xml", skeleton("roles", &["role_overrides", "role_assignments"])),
        ("filters.xml", skeleton("filters", &["filter_actives", "filter_configs"])),
        ("comments.xml", skeleton("comments", &[])),
        ("completion.xml", skeleton("completions", &[])),
        ("calendar.xml", skeleton("events", &[])),
        (
            "competencies.xml",
            skeleton("course_module_competencies", &["competencies"]),
        ),
        ("logs.xml", skeleton("logs", &[])),
        ("logstores.xml", skeleton("logstores", &[])),
    ];
    files.extend(
        boilerplate
            .into_iter()
            .map(|(name, body)| BackupFile::new(format!("{}/{}", dir, name), body)),
    );
    Ok(files)
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Placeholders must always render, so they strip what XML cannot carry.
fn writer_for(activity: &PlannedActivity<'_>) -> XmlWriter {
    if activity.placeholder {
        XmlWriter::lenient()
    } else {
        XmlWriter::new()
    }
}

fn render_module(activity: &PlannedActivity<'_>, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let id = activity.module_id.to_string();
    let visible = flag(activity.visible);
    let mut w = writer_for(activity);
    w.start("module", &[("id", &id), ("version", ctx.moodle_version)])
        .element("modulename", activity.kind.module_name())
        .element("sectionid", activity.section_id)
        .element("sectionnumber", activity.section_number)
        .element("idnumber", &activity.item.content_id)
        .element("added", ctx.timestamp)
        .element("score", 0)
        .element("indent", 0)
        .element("visible", visible)
        .element("visibleoncoursepage", 1)
        .element("visibleold", visible)
        .element("groupmode", 0)
        .element("groupingid", 0)
        .element("completion", 0)
        .null("completiongradeitemnumber")
        .element("completionpassgrade", 0)
        .element("completionview", 0)
        .element("completionexpected", 0)
        .null("availability")
        .element("showdescription", 0)
        .element("downloadcontent", 1)
        .empty("lang")
        .end();
    w.finish()
}

fn render_instance(activity: &PlannedActivity<'_>, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let id = activity.module_id.to_string();
    let context_id = ctx.activity_context_id(activity.module_id).to_string();
    let module = activity.kind.module_name();
    let intro = activity
        .item
        .metadata
        .get("description")
        .map(String::as_str)
        .unwrap_or_default();

    let mut w = writer_for(activity);
    w.start(
        "activity",
        &[
            ("id", &id),
            ("moduleid", &id),
            ("modulename", module),
            ("contextid", &context_id),
        ],
    );
    w.start(module, &[("id", &id)]);
    w.element("name", &activity.title);
    if activity.placeholder {
        w.element("intro", "");
    } else {
        w.element("intro", intro);
    }
    w.element("introformat", 1);
    write_module_fields(&mut w, activity, ctx);
    w.element("timemodified", ctx.timestamp);
    w.end().end();
    w.finish()
}

/// Module-specific columns; just enough for the restore to accept them.
fn write_module_fields(w: &mut XmlWriter, activity: &PlannedActivity<'_>, ctx: &RenderContext<'_>) {
    let meta = |key: &str| activity.item.metadata.get(key).map(String::as_str);
    match activity.kind {
        ActivityKind::Resource => {
            w.fields(&[
                ("tobemigrated", "0"),
                ("legacyfiles", "0"),
                ("legacyfileslast", super::writer::NULL),
                ("display", "0"),
                ("displayoptions", "a:1:{s:10:\"printintro\";i:1;}"),
                ("filterfiles", "0"),
                ("revision", "1"),
            ]);
        }
        ActivityKind::Folder => {
            w.fields(&[
                ("revision", "1"),
                ("display", "0"),
                ("showexpanded", "1"),
                ("showdownloadfolder", "1"),
                ("forcedownload", "1"),
            ]);
        }
        ActivityKind::Quiz => {
            w.fields(&[
                ("timeopen", "0"),
                ("timeclose", "0"),
                ("timelimit", "0"),
                ("overduehandling", "autosubmit"),
                ("graceperiod", "0"),
                ("preferredbehaviour", "deferredfeedback"),
                ("canredoquestions", "0"),
                ("attempts_number", "0"),
                ("attemptonlast", "0"),
                ("grademethod", "1"),
                ("decimalpoints", "2"),
                ("questiondecimalpoints", "-1"),
                ("questionsperpage", "1"),
                ("navmethod", "free"),
                ("shuffleanswers", "1"),
                ("sumgrades", "0.00000"),
                ("grade", "10.00000"),
                ("timecreated", &ctx.timestamp.to_string()),
                ("password", ""),
                ("subnet", ""),
                ("browsersecurity", "-"),
                ("delay1", "0"),
                ("delay2", "0"),
                ("showuserpicture", "0"),
                ("showblocks", "0"),
                ("completionattemptsexhausted", "0"),
                ("completionminattempts", "0"),
                ("allowofflineattempts", "0"),
            ]);
            w.start("sections", &[])
                .start("section", &[("id", "1")])
                .element("firstslot", 1)
                .empty("heading")
                .element("shufflequestions", 0)
                .end()
                .end();
            for container in ["question_instances", "feedbacks", "overrides", "grades", "attempts"] {
                w.empty(container);
            }
        }
        ActivityKind::Assign => {
            w.fields(&[
                ("alwaysshowdescription", "1"),
                ("submissiondrafts", "0"),
                ("sendnotifications", "0"),
                ("sendlatenotifications", "0"),
                ("sendstudentnotifications", "1"),
                ("duedate", "0"),
                ("cutoffdate", "0"),
                ("gradingduedate", "0"),
                ("allowsubmissionsfromdate", "0"),
                ("grade", "100"),
                ("completionsubmit", "0"),
                ("requiresubmissionstatement", "0"),
                ("teamsubmission", "0"),
                ("requireallteammemberssubmit", "0"),
                ("teamsubmissiongroupingid", "0"),
                ("blindmarking", "0"),
                ("hidegrader", "0"),
                ("revealidentities", "0"),
                ("attemptreopenmethod", "untilpass"),
                ("maxattempts", "-1"),
                ("markingworkflow", "0"),
                ("markingallocation", "0"),
                ("markinganonymous", "0"),
                ("preventsubmissionnotingroup", "0"),
            ]);
            for container in ["userflags", "submissions", "grades", "plugin_configs", "overrides"] {
                w.empty(container);
            }
        }
        ActivityKind::Forum => {
            w.fields(&[
                ("type", "general"),
                ("duedate", "0"),
                ("cutoffdate", "0"),
                ("assessed", "0"),
                ("assesstimestart", "0"),
                ("assesstimefinish", "0"),
                ("scale", "0"),
                ("maxbytes", "0"),
                ("maxattachments", "9"),
                ("forcesubscribe", "0"),
                ("trackingtype", "1"),
                ("rsstype", "0"),
                ("rssarticles", "0"),
                ("warnafter", "0"),
                ("blockafter", "0"),
                ("blockperiod", "0"),
                ("completiondiscussions", "0"),
                ("completionreplies", "0"),
                ("completionposts", "0"),
                ("displaywordcount", "0"),
                ("lockdiscussionafter", "0"),
                ("grade_forum", "0"),
            ]);
            for container in ["discussions", "subscriptions", "digests", "readposts", "trackedprefs", "poststags", "grades"] {
                w.empty(container);
            }
        }
        ActivityKind::Wiki => {
            let first_page = meta("start_page").unwrap_or(activity.title.as_str()).to_string();
            w.fields(&[
                ("timecreated", &ctx.timestamp.to_string()),
                ("firstpagetitle", &first_page),
                ("wikimode", "collaborative"),
                ("defaultformat", "html"),
                ("forceformat", "1"),
                ("editbegin", "0"),
                ("editend", "0"),
            ]);
            w.empty("subwikis");
        }
        ActivityKind::Url => {
            w.fields(&[
                ("externalurl", meta("url").unwrap_or_default()),
                ("display", "0"),
                ("displayoptions", "a:1:{s:10:\"printintro\";i:1;}"),
                ("parameters", "a:0:{}"),
            ]);
        }
        ActivityKind::Scorm => {
            w.fields(&[
                ("scormtype", "local"),
                ("reference", meta("file_name").unwrap_or_default()),
                ("version", "SCORM_1.2"),
                ("maxgrade", "100"),
                ("grademethod", "1"),
                ("whatgrade", "0"),
                ("maxattempt", "0"),
                ("forcecompleted", "0"),
                ("forcenewattempt", "0"),
                ("lastattemptlock", "0"),
                ("masteryoverride", "1"),
                ("displayattemptstatus", "1"),
                ("displaycoursestructure", "0"),
                ("updatefreq", "0"),
                ("sha1hash", ""),
                ("md5hash", ""),
                ("revision", "0"),
                ("launch", "0"),
                ("skipview", "1"),
                ("hidebrowse", "0"),
                ("hidetoc", "0"),
                ("nav", "1"),
                ("auto", "0"),
                ("popup", "0"),
                ("width", "100"),
                ("height", "500"),
                ("timeopen", "0"),
                ("timeclose", "0"),
            ]);
            w.empty("scoes");
        }
        ActivityKind::Book => {
            w.fields(&[
                ("numbering", "1"),
                ("navstyle", "1"),
                ("customtitles", "0"),
                ("revision", "0"),
                ("timecreated", &ctx.timestamp.to_string()),
            ]);
            w.empty("chapters");
        }
        ActivityKind::Page => {
            let content = meta("description").unwrap_or(activity.title.as_str()).to_string();
            w.fields(&[
                ("content", &content),
                ("contentformat", "1"),
                ("legacyfiles", "0"),
                ("legacyfileslast", super::writer::NULL),
                ("display", "5"),
                ("displayoptions", "a:2:{s:10:\"printintro\";s:1:\"0\";s:17:\"printlastmodified\";s:1:\"1\";}"),
                ("revision", "1"),
            ]);
        }
        ActivityKind::Glossary => {
            w.fields(&[
                ("allowduplicatedentries", "0"),
                ("displayformat", "dictionary"),
                ("mainglossary", "0"),
                ("showspecial", "1"),
                ("showalphabet", "1"),
                ("showall", "1"),
                ("allowcomments", "0"),
                ("allowprintview", "1"),
                ("usedynalink", "0"),
                ("defaultapproval", "1"),
                ("approvaldisplayformat", "default"),
                ("globalglossary", "0"),
                ("entbypage", "10"),
                ("editalways", "0"),
                ("rsstype", "0"),
                ("rssarticles", "0"),
                ("assessed", "0"),
                ("assesstimestart", "0"),
                ("assesstimefinish", "0"),
                ("scale", "0"),
                ("timecreated", &ctx.timestamp.to_string()),
                ("completionentries", "0"),
            ]);
            w.empty("entries");
            w.empty("entriestags");
            w.empty("categories");
        }
        ActivityKind::Feedback => {
            w.fields(&[
                ("anonymous", "1"),
                ("email_notification", "0"),
                ("multiple_submit", "0"),
                ("autonumbering", "1"),
                ("site_after_submit", ""),
                ("page_after_submit", ""),
                ("page_after_submitformat", "1"),
                ("publish_stats", "0"),
                ("timeopen", "0"),
                ("timeclose", "0"),
                ("completionsubmit", "0"),
            ]);
            w.empty("items");
            w.empty("completeds");
        }
        ActivityKind::Choice => {
            w.fields(&[
                ("publish", "0"),
                ("showresults", "0"),
                ("display", "0"),
                ("allowupdate", "0"),
                ("allowmultiple", "0"),
                ("showunanswered", "0"),
                ("includeinactive", "0"),
                ("limitanswers", "0"),
                ("timeopen", "0"),
                ("timeclose", "0"),
                ("showpreview", "0"),
                ("completionsubmit", "0"),
                ("showavailable", "0"),
            ]);
            w.empty("options");
            w.empty("answers");
        }
        ActivityKind::Label => {}
    }
}

/// `ilias.xml`: where the activity came from, carried for diagnostics.
fn render_source_metadata(activity: &PlannedActivity<'_>) -> Result<String, RenderError> {
    let item = activity.item;
    let mut w = writer_for(activity);
    w.start("ilias_source", &[])
        .element("content_id", &item.content_id)
        .element("ref_id", item.ref_id.as_deref().unwrap_or_default())
        .element("type", item.item_type.as_tag())
        .element("resolution_source", item.resolution_source.as_str())
        .element("offline", flag(item.offline))
        .element("placeholder", flag(activity.placeholder));
    if let Some(timing) = &item.timing {
        write_timing(&mut w, timing);
    }
    w.start("metadata", &[]);
    for (key, value) in &item.metadata {
        w.element_with("field", &[("name", key)], value);
    }
    w.end().end();
    w.finish()
}

fn write_timing(w: &mut XmlWriter, timing: &Timing) {
    let kind = timing.kind.as_attr();
    w.start(
        "timing",
        &[
            ("type", &kind),
            ("visible", flag(timing.visible)),
            ("changeable", flag(timing.changeable)),
        ],
    );
    for (name, value, stamp) in [
        ("start", &timing.start, timing.start_timestamp()),
        ("end", &timing.end, timing.end_timestamp()),
        ("suggestion_start", &timing.suggestion_start, None),
        ("suggestion_end", &timing.suggestion_end, None),
    ] {
        if let Some(value) = value {
            match stamp {
                Some(ts) => w.element_with(name, &[("timestamp", &ts.to_string())], value),
                None => w.element(name, value),
            };
        }
    }
    w.end();
}
