use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Mutex;

use zip::ZipArchive;

use super::{ExportSource, is_junk, normalize_path};
use crate::error::{Error, Result};

/// An export still packed in its `.zip` upload.
pub struct ZipSource<R: Read + Seek> {
    name: String,
    archive: Mutex<ZipArchive<R>>,
    /// Normalized path → name of the entry inside the archive.
    entries: Vec<(String, String)>,
    files: Vec<String>,
}

impl ZipSource<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(path.display().to_string(), file)
    }
}

impl ZipSource<Cursor<Vec<u8>>> {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(name, Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ZipSource<R> {
    pub fn from_reader(name: impl Into<String>, reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let mut entries: Vec<(String, String)> = archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(|n| (normalize_path(n), n.to_string()))
            .filter(|(p, _)| !p.is_empty() && !is_junk(p))
            .collect();
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);
        let files = entries.iter().map(|(p, _)| p.clone()).collect();
        Ok(Self {
            name: name.into(),
            archive: Mutex::new(archive),
            entries,
            files,
        })
    }
}

impl<R: Read + Seek> ExportSource for ZipSource<R> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn files(&self) -> &[String] {
        &self.files
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_path(path);
        let idx = self
            .entries
            .binary_search_by(|(p, _)| p.as_str().cmp(&path))
            .map_err(|_| Error::InvalidExport(format!("{} not found in {}", path, self.name)))?;
        let entry_name = &self.entries[idx].1;

        let mut archive = self
            .archive
            .lock()
            .map_err(|_| Error::InvalidExport(format!("{} is no longer readable", self.name)))?;
        let mut file = archive.by_name(entry_name)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }
}
