//! Benchmarks for the conversion pipeline.
//!
//! Run with: cargo bench

use std::fs;
use std::path::Path;

use criterion::{Criterion, criterion_group, criterion_main};

use ilias2moodle::categorize::{CategoryRule, RuleTable, categorize};
use ilias2moodle::io::MemorySource;
use ilias2moodle::model::ObjectType;
use ilias2moodle::{
    ComponentCatalog, ContainerStructure, Converter, ConverterConfig, ExportReader, Warnings,
    flatten_course,
};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ilias_export");

/// Load the fixture export into memory so disk access stays out of the numbers.
fn load_fixture() -> MemorySource {
    fn walk(root: &Path, dir: &Path, source: &mut MemorySource) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, source);
            } else {
                let name = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                source.insert(&name, fs::read(&path).unwrap());
            }
        }
    }

    let mut source = MemorySource::new("fixture");
    walk(Path::new(FIXTURE), Path::new(FIXTURE), &mut source);
    source
}

/// A flat course of `count` items below one root, cycling through common types.
fn synthetic_container(count: usize) -> String {
    const TYPES: &[&str] = &["file", "tst", "mcst", "frm", "wiki", "exc"];
    let mut xml = String::from(r#"<Items><Item RefId="1" Id="1" Type="crs" Title="Kurs">"#);
    for i in 0..count {
        let folder = i % 25 == 0;
        if folder {
            xml.push_str(&format!(
                r#"<Item RefId="f{i}" Id="f{i}" Type="fold" Title="Ordner {i}">"#
            ));
        }
        xml.push_str(&format!(
            r#"<Item RefId="{}" Id="{}" Type="{}" Title="Element {}"/>"#,
            i + 2,
            i + 1000,
            TYPES[i % TYPES.len()],
            i
        ));
        if folder {
            xml.push_str("</Item>");
        }
    }
    xml.push_str("</Item></Items>");
    xml
}

fn rules() -> RuleTable {
    RuleTable::new(vec![
        CategoryRule::new("Wiederholung").item_type(ObjectType::Test),
        CategoryRule::new("Wissensinhalt")
            .item_type(ObjectType::File)
            .item_type(ObjectType::MediaCast),
        CategoryRule::new("Kommunikation").keyword("forum"),
    ])
}

// ============================================================================
// Stage Benchmarks
// ============================================================================

fn bench_parse_container(c: &mut Criterion) {
    let xml = synthetic_container(2_000);

    c.bench_function("parse_container_2000", |b| {
        b.iter(|| {
            let mut warnings = Warnings::new();
            ContainerStructure::parse(&xml, "export.xml", &mut warnings).unwrap()
        });
    });
}

fn bench_flatten_and_categorize(c: &mut Criterion) {
    let xml = synthetic_container(2_000);
    let mut warnings = Warnings::new();
    let structure = ContainerStructure::parse(&xml, "export.xml", &mut warnings).unwrap();
    let catalog = ComponentCatalog::new();
    let rules = rules();

    c.bench_function("flatten_course_2000", |b| {
        b.iter(|| flatten_course(&structure, &catalog, &mut Warnings::new()));
    });

    let items = flatten_course(&structure, &catalog, &mut warnings);
    c.bench_function("categorize_2000", |b| {
        b.iter(|| categorize(&items, &rules));
    });
}

fn bench_build_catalog(c: &mut Criterion) {
    let source = load_fixture();

    c.bench_function("build_catalog_fixture", |b| {
        b.iter(|| {
            let mut warnings = Warnings::new();
            let reader = ExportReader::open(&source, &mut warnings).unwrap();
            ComponentCatalog::build(&reader, &mut warnings)
        });
    });
}

// ============================================================================
// Full Pipeline
// ============================================================================

fn bench_convert_fixture(c: &mut Criterion) {
    let source = load_fixture();
    let mut config = ConverterConfig::default();
    config.backup.timestamp = Some(1_744_020_005);
    let converter = Converter::new(config);

    c.bench_function("convert_fixture", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            converter.convert(&source, &mut output).unwrap();
            output
        });
    });
}

criterion_group!(
    benches,
    // Stages
    bench_parse_container,
    bench_flatten_and_categorize,
    bench_build_catalog,
    // Pipeline
    bench_convert_fixture,
);
criterion_main!(benches);
