//! Conversion diagnostics.
//!
//! Recoverable problems are collected as [`Warning`]s while the pipeline
//! runs. [`check_compatibility`] adds findings about ILIAS features Moodle
//! cannot represent, and [`ConversionReport`] summarizes a finished run.

mod compat;
mod summary;
mod warning;

pub use compat::check_compatibility;
pub use summary::{ConversionReport, SectionSummary};
pub use warning::{Severity, Stage, Warning, WarningKind, Warnings};
