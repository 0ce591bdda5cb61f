//! Packaging backup documents into a gzip-compressed tar stream.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, Header};

use super::BackupFile;
use crate::error::{Error, Result};

/// Streaming `.mbz` writer. Every entry gets the same mode and mtime so
/// identical input produces identical bytes.
pub struct MbzArchive<W: Write> {
    builder: Builder<GzEncoder<W>>,
    mtime: u64,
    entries: usize,
}

impl<W: Write> MbzArchive<W> {
    pub fn new(writer: W, compression_level: u32, mtime: u64) -> Self {
        let encoder = GzEncoder::new(writer, Compression::new(compression_level.min(9)));
        Self {
            builder: Builder::new(encoder),
            mtime,
            entries: 0,
        }
    }

    pub fn append(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut header = Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(self.mtime);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, bytes)
            .map_err(Error::Packaging)?;
        self.entries += 1;
        Ok(())
    }

    pub fn append_file(&mut self, file: &BackupFile) -> Result<()> {
        self.append(&file.path, file.contents.as_bytes())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Write the tar trailer, flush the gzip stream and return the writer.
    pub fn finish(self) -> Result<W> {
        let encoder = self.builder.into_inner().map_err(Error::Packaging)?;
        encoder.finish().map_err(Error::Packaging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tar::Archive;

    #[test]
    fn test_entries_round_trip() {
        let mut archive = MbzArchive::new(Vec::new(), 6, 0);
        archive.append("moodle_backup.xml", b"<moodle_backup/>").unwrap();
        archive
            .append_file(&BackupFile::new("sections/section_1/section.xml", "<section/>".to_string()))
            .unwrap();
        assert_eq!(archive.entries(), 2);
        let bytes = archive.finish().unwrap();

        let mut tar = Archive::new(GzDecoder::new(bytes.as_slice()));
        let mut seen = Vec::new();
        for entry in tar.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().to_string();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            assert_eq!(entry.header().mode().unwrap(), 0o644);
            seen.push((path, body));
        }
        assert_eq!(seen[0], ("moodle_backup.xml".to_string(), "<moodle_backup/>".to_string()));
        assert_eq!(seen[1].0, "sections/section_1/section.xml");
    }

    #[test]
    fn test_deterministic_bytes() {
        let build = || {
            let mut archive = MbzArchive::new(Vec::new(), 6, 1_700_000_000);
            archive.append("a.xml", b"<a/>").unwrap();
            archive.finish().unwrap()
        };
        assert_eq!(build(), build());
    }
}
