//! End-to-end conversion of the fixture export.
//!
//! `tests/fixtures/ilias_export` is an extracted ILIAS 8 group export with
//! both item group document forms, an offline wiki, a media object and one
//! item group member that exists nowhere in the export.

use ilias2moodle::inspect::read_backup;
use ilias2moodle::model::ResolutionSource;
use ilias2moodle::report::{Stage, WarningKind};
use ilias2moodle::{ConverterConfig, Converter, DirSource};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

fn fixed_config() -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.backup.timestamp = Some(1_744_020_005);
    config
}

fn rules_config() -> ConverterConfig {
    let mut config = ConverterConfig::from_toml_str(
        r#"
[[rules]]
section = "Wiederholung"
types = ["tst"]

[[rules]]
section = "Wissensinhalt"
types = ["file", "mcst"]

[[rules]]
section = "Kommunikation"
types = ["frm", "wiki"]
"#,
    )
    .expect("valid rules");
    config.backup.timestamp = Some(1_744_020_005);
    config
}

fn convert(config: ConverterConfig) -> (Vec<u8>, ilias2moodle::ConversionOutcome) {
    let source = DirSource::open(fixture_path("ilias_export")).expect("fixture exists");
    let mut out = Vec::new();
    let outcome = Converter::new(config)
        .convert(&source, &mut out)
        .expect("conversion succeeds");
    (out, outcome)
}

#[test]
fn test_fixture_default_rules() {
    let (bytes, outcome) = convert(fixed_config());
    assert!(!bytes.is_empty());

    let contents = &outcome.contents;
    assert_eq!(
        contents.file_name,
        "backup-moodle2-course-physik-grundlagen-20250407.mbz"
    );

    // No rules: general section plus one fallback section
    let names: Vec<_> = contents.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Allgemein", "Sonstiges"]);
    assert!(contents.sections[0].sequence.is_empty());
    assert_eq!(contents.sections[1].sequence, (1..=11).collect::<Vec<u32>>());

    let ids: Vec<_> = contents.activities.iter().map(|a| a.content_id.as_str()).collect();
    assert_eq!(
        ids,
        ["9101", "9102", "9110", "9120", "9180", "9170", "9999", "9130", "9140", "9150", "9190"]
    );

    let modules: Vec<_> = contents.activities.iter().map(|a| a.module_name.as_str()).collect();
    assert_eq!(
        modules,
        [
            "resource", "resource", "quiz", "resource", "quiz", "resource", "resource", "forum",
            "wiki", "assign", "quiz"
        ]
    );

    let wiki = &contents.activities[8];
    assert_eq!(wiki.title, "Formelsammlung");
    assert!(!wiki.visible);
}

#[test]
fn test_fixture_resolution_sources() {
    let (_, outcome) = convert(fixed_config());
    let source_of = |id: &str| {
        outcome
            .contents
            .activities
            .iter()
            .find(|a| a.content_id == id)
            .map(|a| a.resolution_source)
    };

    assert_eq!(source_of("9101"), Some(ResolutionSource::ContainerLookup));
    assert_eq!(source_of("9120"), Some(ResolutionSource::ContainerLookup));
    assert_eq!(source_of("9180"), Some(ResolutionSource::CatalogLookup));
    assert_eq!(source_of("9170"), Some(ResolutionSource::InlineMetadata));
    assert_eq!(source_of("9999"), Some(ResolutionSource::FallbackStub));

    let report = &outcome.report;
    assert_eq!(report.resolution[&ResolutionSource::ContainerLookup], 8);
    assert_eq!(report.resolution[&ResolutionSource::FallbackStub], 1);
    assert_eq!(report.activities["resource"], 5);
    assert_eq!(report.conversions["tst -> quiz"], 3);
}

#[test]
fn test_fixture_warnings() {
    let (_, outcome) = convert(fixed_config());
    let warnings = &outcome.warnings;

    let unresolved: Vec<_> = warnings.of_kind(WarningKind::UnresolvableReference).collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].subject, "9999");

    let skipped: Vec<_> = warnings.of_kind(WarningKind::SkippedItem).collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].message.contains("Versuchsaufbau"));

    // Changeable timing, suggestion window, offline wiki, custom wiki style
    assert_eq!(warnings.from_stage(Stage::Compatibility).count(), 4);
    assert_eq!(warnings.from_stage(Stage::Reader).count(), 0);
    assert_eq!(warnings.from_stage(Stage::Catalog).count(), 0);
    assert_eq!(warnings.from_stage(Stage::Emitter).count(), 0);
}

#[test]
fn test_fixture_with_rules() {
    let (_, outcome) = convert(rules_config());
    let sections: Vec<_> = outcome
        .contents
        .sections
        .iter()
        .map(|s| (s.number, s.name.as_str(), s.sequence.len()))
        .collect();
    assert_eq!(
        sections,
        [
            (0, "Allgemein", 0),
            (1, "Wissensinhalt", 2),
            (2, "Wiederholung", 1),
            (3, "Wissensinhalt", 1),
            (4, "Wiederholung", 1),
            (5, "Wissensinhalt", 1),
            (6, "Kommunikation", 2),
            (7, "Wiederholung", 1),
            (8, "Sonstiges", 2),
        ]
    );

    // Ids follow section order, so the fallback items come last
    let fallback = &outcome.contents.sections[8];
    assert_eq!(fallback.sequence, [10, 11]);
    let last: Vec<_> = outcome.contents.activities[9..]
        .iter()
        .map(|a| a.content_id.as_str())
        .collect();
    assert_eq!(last, ["9999", "9150"]);
}

#[test]
fn test_idempotent_output() {
    let (first, a) = convert(rules_config());
    let (second, b) = convert(rules_config());
    assert_eq!(a.contents, b.contents);
    assert_eq!(first, second, "identical input and timestamp give identical bytes");
}

#[test]
fn test_round_trip_through_inspect() {
    let (bytes, outcome) = convert(rules_config());
    let summary = read_backup(bytes.as_slice()).expect("backup is readable");

    assert_eq!(summary.course_title, "Physik Grundlagen");
    assert_eq!(summary.sections.len(), outcome.contents.sections.len());
    for (read, planned) in summary.sections.iter().zip(&outcome.contents.sections) {
        assert_eq!(read.number, planned.number);
        assert_eq!(read.title, planned.name);
        assert_eq!(read.sequence, planned.sequence);
    }
    assert_eq!(summary.activities.len(), 11);
    assert!(summary.validate().is_empty(), "{:?}", summary.validate());

    for activity in &outcome.contents.activities {
        let dir = format!("{}/ilias.xml", activity.directory);
        assert!(summary.files.contains(&dir), "missing {}", dir);
    }
}

#[test]
fn test_report_markdown_mentions_stub() {
    let (_, outcome) = convert(fixed_config());
    let md = outcome.report.to_markdown();
    assert!(md.contains("# Conversion report: Physik Grundlagen"));
    assert!(md.contains("- fallback-stub: 1"));
    assert!(md.contains("9999"));
}
