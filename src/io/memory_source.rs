use std::collections::BTreeMap;

use super::{ExportSource, normalize_path};
use crate::error::{Error, Result};

/// In-memory export, used for uploads already held in memory and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
    paths: Vec<String>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(normalize_path(path), bytes.into());
        self.paths = self.files.keys().cloned().collect();
    }

    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl ExportSource for MemorySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn files(&self) -> &[String] {
        &self.paths
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| Error::InvalidExport(format!("{} not found in {}", path, self.name)))
    }
}
