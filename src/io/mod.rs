//! Read-only access to the files of an ILIAS export.
//!
//! An export arrives either as an extracted directory tree or as the
//! original `.zip` upload. Both are exposed through [`ExportSource`], which
//! addresses files by `/`-separated paths relative to the export root.

mod dir_source;
mod memory_source;
mod zip_source;

pub use dir_source::DirSource;
pub use memory_source::MemorySource;
pub use zip_source::ZipSource;

use std::path::Path;

use crate::error::{Error, Result};
use crate::util::{decode_text, strip_bom, xml_encoding_hint};

/// A read-only collection of export files.
pub trait ExportSource {
    /// Human-readable location for diagnostics.
    fn describe(&self) -> String;

    /// All file paths, sorted.
    fn files(&self) -> &[String];

    /// Raw bytes of one file.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn contains(&self, path: &str) -> bool {
        self.files().binary_search_by(|p| p.as_str().cmp(path)).is_ok()
    }

    /// Read a text document, stripping a BOM and decoding legacy encodings.
    fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        let bytes = strip_bom(&bytes);
        Ok(decode_text(bytes, xml_encoding_hint(bytes)).into_owned())
    }
}

/// Open an export from disk: a directory or a `.zip` file.
pub fn open_export(path: impl AsRef<Path>) -> Result<Box<dyn ExportSource>> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(Box::new(DirSource::open(path)?));
    }
    if path.is_file() {
        return Ok(Box::new(ZipSource::open(path)?));
    }
    Err(Error::InvalidExport(format!(
        "{} is neither a directory nor a file",
        path.display()
    )))
}

/// Normalize an archive-relative path: forward slashes, no leading `./` or `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Files that archivers add and that never belong to an export.
pub(crate) fn is_junk(path: &str) -> bool {
    path.split('/')
        .any(|part| part == "__MACOSX" || part == ".DS_Store" || part == "Thumbs.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./a/b/../c.xml"), "a/c.xml");
        assert_eq!(normalize_path("\\set\\export.xml"), "set/export.xml");
        assert_eq!(normalize_path("/manifest.xml"), "manifest.xml");
    }

    #[test]
    fn test_is_junk() {
        assert!(is_junk("__MACOSX/x/manifest.xml"));
        assert!(is_junk("a/.DS_Store"));
        assert!(!is_junk("a/manifest.xml"));
    }

    #[test]
    fn test_read_text_decodes_latin1() {
        let mut source = MemorySource::new("mem");
        source.insert(
            "t.xml",
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><T>\xdcbung</T>".to_vec(),
        );
        assert!(source.read_text("t.xml").unwrap().contains("Übung"));
        assert!(source.contains("t.xml"));
        assert!(!source.contains("u.xml"));
    }
}
