//! File-level conversion: directories, zip uploads and TOML configuration.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use ilias2moodle::inspect::read_backup;
use ilias2moodle::{ConverterConfig, Error, convert_export};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

const CONFIG: &str = r#"
[[rules]]
section = "Wiederholung"
types = ["tst"]

[[rules]]
section = "Videos"
keywords = ["video", "aufzeichnung"]
types = ["mcst"]

[sections]
general = "Kursinfo"
fallback = "Weiteres Material"

[type_mapping]
wiki = "page"

[backup]
timestamp = 1744020005
wwwroot = "https://moodle.example.org"
"#;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("rules.toml");
    fs::write(&path, CONFIG).unwrap();
    path
}

/// Zip every file below `root`, keeping relative paths.
fn zip_dir(root: &Path) -> Vec<u8> {
    fn walk(dir: &Path, files: &mut Vec<std::path::PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, files);
            } else {
                files.push(path);
            }
        }
    }

    let mut files = Vec::new();
    walk(root, &mut files);
    files.sort();

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        for file in &files {
            let name = file.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(&fs::read(file).unwrap()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf.into_inner()
}

#[test]
fn test_config_file_drives_layout() {
    let dir = TempDir::new().unwrap();
    let config = ConverterConfig::from_path(write_config(dir.path())).unwrap();

    let (path, outcome) =
        convert_export(fixture_path("ilias_export"), Some(dir.path()), &config).unwrap();

    assert_eq!(
        path,
        dir.path().join("backup-moodle2-course-physik-grundlagen-20250407.mbz")
    );
    assert!(path.is_file());

    let names: Vec<_> = outcome.contents.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names[0], "Kursinfo");
    assert_eq!(names[1], "Videos");
    assert_eq!(names[2], "Wiederholung");
    assert_eq!(*names.last().unwrap(), "Weiteres Material");

    let wiki = outcome
        .contents
        .activities
        .iter()
        .find(|a| a.content_id == "9140")
        .unwrap();
    assert_eq!(wiki.module_name, "page");
}

#[test]
fn test_zip_and_directory_agree() {
    let dir = TempDir::new().unwrap();
    let config = ConverterConfig::from_path(write_config(dir.path())).unwrap();

    let zip_path = dir.path().join("export.zip");
    fs::write(&zip_path, zip_dir(Path::new(&fixture_path("ilias_export")))).unwrap();

    let from_zip = dir.path().join("from_zip.mbz");
    let from_dir = dir.path().join("from_dir.mbz");
    let (_, zipped) = convert_export(&zip_path, Some(&from_zip), &config).unwrap();
    let (_, plain) = convert_export(fixture_path("ilias_export"), Some(&from_dir), &config).unwrap();

    assert_eq!(zipped.contents, plain.contents);
    assert_eq!(fs::read(&from_zip).unwrap(), fs::read(&from_dir).unwrap());

    let summary = read_backup(fs::File::open(&from_zip).unwrap()).unwrap();
    assert_eq!(summary.course_title, "Physik Grundlagen");
    assert!(summary.validate().is_empty());
}

#[test]
fn test_default_output_next_to_zip() {
    let dir = TempDir::new().unwrap();
    let zip_path = dir.path().join("upload.zip");
    fs::write(&zip_path, zip_dir(Path::new(&fixture_path("ilias_export")))).unwrap();

    let mut config = ConverterConfig::default();
    config.backup.timestamp = Some(1_744_020_005);
    let (path, _) = convert_export(&zip_path, None, &config).unwrap();

    assert_eq!(path.parent(), Some(dir.path()));
    assert!(path.is_file());
}

#[test]
fn test_failed_conversion_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("manifest.xml"), r#"<Manifest MainEntity="crs"/>"#).unwrap();
    fs::create_dir_all(input.join("Services/Container/set_1")).unwrap();
    fs::write(
        input.join("Services/Container/set_1/export.xml"),
        r#"<Items><Item RefId="1" Id="1" Type="crs" Title="K"><Item RefId="1" Id="2" Type="tst" Title="T"/></Item></Items>"#,
    )
    .unwrap();

    let out = dir.path().join("out.mbz");
    let err = convert_export(&input, Some(&out), &ConverterConfig::default()).unwrap_err();

    assert!(matches!(err, Error::StructuralCorruption(_)));
    assert!(!out.exists());
}

#[test]
fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let err = convert_export(dir.path().join("nope"), None, &ConverterConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidExport(_)));
}
