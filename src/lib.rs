//! # ilias2moodle
//!
//! Converts ILIAS course exports into Moodle backup archives (`.mbz`).
//!
//! ## Features
//!
//! - Reads extracted export directories and `.zip` uploads
//! - Parses the container structure and every component document
//! - Resolves item groups against the container tree, the component catalog
//!   and inline hints
//! - Groups the course into named sections with configurable rules
//! - Writes a Moodle 2 backup that restores as a new course
//!
//! ## Quick Start
//!
//! ```no_run
//! use ilias2moodle::{ConverterConfig, convert_export};
//!
//! let config = ConverterConfig::from_path("rules.toml")?;
//! let (path, outcome) = convert_export("export/", None, &config)?;
//! println!("{} ({} warnings)", path.display(), outcome.warnings.len());
//! # Ok::<(), ilias2moodle::Error>(())
//! ```
//!
//! ## Working with the stages
//!
//! Each stage can be driven on its own:
//!
//! ```
//! use ilias2moodle::categorize::{CategoryRule, RuleTable, categorize};
//! use ilias2moodle::model::{ObjectType, ResolvedItem};
//!
//! let mut quiz = ResolvedItem::stub("455");
//! quiz.item_type = ObjectType::Test;
//! let items = vec![quiz];
//!
//! let rules = RuleTable::new(vec![CategoryRule::new("Tests").item_type(ObjectType::Test)]);
//! let sections = categorize(&items, &rules);
//! assert_eq!(sections[1].name, "Tests");
//! ```

pub mod categorize;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod import;
pub mod inspect;
pub mod io;
pub mod model;
pub mod report;
pub mod resolve;
pub(crate) mod util;
pub mod xml;

pub use config::ConverterConfig;
pub use convert::{ConversionOutcome, Converter, convert_export};
pub use error::{Error, Result, StructuralCorruption};
pub use export::{BackupConfig, BackupContents, MbzExporter};
pub use import::{ComponentCatalog, ContainerStructure, ExportReader};
pub use io::{DirSource, ExportSource, ZipSource, open_export};
pub use model::{ObjectType, ResolvedItem, Section};
pub use report::{ConversionReport, Warning, Warnings};
pub use resolve::{ItemGroupResolver, flatten_course};
