use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ExportSource, is_junk, normalize_path};
use crate::error::{Error, Result};

/// An export already extracted to a directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
    files: Vec<String>,
}

impl DirSource {
    /// Index every file below `root`.
    ///
    /// The walk is iterative; export trees nest several levels deep and
    /// there is no documented maximum.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();
        let mut pending = vec![root.clone()];

        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let Ok(relative) = path.strip_prefix(&root) else {
                        continue;
                    };
                    let relative = normalize_path(&relative.to_string_lossy());
                    if !is_junk(&relative) {
                        files.push(relative);
                    }
                }
            }
        }

        files.sort();
        debug!(root = %root.display(), files = files.len(), "indexed export directory");
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ExportSource for DirSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn files(&self) -> &[String] {
        &self.files
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_path(path);
        if !self.contains(&path) {
            return Err(Error::InvalidExport(format!(
                "{} not found in {}",
                path,
                self.root.display()
            )));
        }
        Ok(fs::read(self.root.join(&path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walks_nested_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("set_1/Services/Container");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("manifest.xml"), "<Manifest/>").unwrap();
        fs::write(nested.join("export.xml"), "<Export/>").unwrap();
        fs::create_dir_all(dir.path().join("__MACOSX")).unwrap();
        fs::write(dir.path().join("__MACOSX/manifest.xml"), "junk").unwrap();

        let source = DirSource::open(dir.path()).unwrap();
        assert_eq!(
            source.files(),
            ["manifest.xml", "set_1/Services/Container/export.xml"]
        );
        assert_eq!(source.read_text("manifest.xml").unwrap(), "<Manifest/>");
        assert!(source.read("missing.xml").is_err());
    }
}
