//! Error types for ilias2moodle operations.
//!
//! Only conditions that leave no meaningful partial result are errors.
//! Recoverable damage is reported through [`crate::report::Warning`] instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a conversion job.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("structural corruption: {0}")]
    StructuralCorruption(#[from] StructuralCorruption),

    #[error("failed to render backup document: {0}")]
    Render(#[from] crate::export::RenderError),

    #[error("failed to package backup archive: {0}")]
    Packaging(#[source] std::io::Error),

    #[error("invalid export: {0}")]
    InvalidExport(String),
}

/// Damage to the export that makes the course structure unrecoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralCorruption {
    #[error("RefId {ref_id} occurs more than once in the container structure")]
    DuplicateRefId { ref_id: String },

    #[error("no manifest.xml found in {}", root.display())]
    MissingManifest { root: PathBuf },

    #[error("manifest {path} is unreadable: {reason}")]
    UnreadableManifest { path: String, reason: String },

    #[error("export contains no container structure document")]
    MissingContainer,

    #[error("container structure {path} has no root item")]
    EmptyContainer { path: String },
}

impl Error {
    /// Whether this error stems from a broken course structure rather than I/O.
    pub fn is_fatal_structure(&self) -> bool {
        matches!(self, Error::StructuralCorruption(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
