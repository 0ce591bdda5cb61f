//! Converter configuration.
//!
//! A single TOML document with four optional tables:
//!
//! ```toml
//! [[rules]]
//! section = "Prüfungen"
//! keywords = ["klausur", "prüfung"]
//! types = ["tst"]
//!
//! [sections]
//! general = "Allgemein"
//! fallback = "Sonstiges"
//!
//! [type_mapping]
//! mcst = "url"
//!
//! [backup]
//! timestamp = 1700000000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categorize::{CategoryRule, RuleTable, SectionNames};
use crate::error::Result;
use crate::export::{BackupConfig, TypeMapping};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Categorization rules in priority order. Empty by default, which puts
    /// every item into the fallback section.
    pub rules: Vec<CategoryRule>,
    pub sections: SectionNames,
    pub type_mapping: TypeMapping,
    pub backup: BackupConfig,
}

impl ConverterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(
            path = %path.display(),
            rules = config.rules.len(),
            overrides = config.type_mapping.overrides().count(),
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn rule_table(&self) -> RuleTable {
        RuleTable::new(self.rules.clone()).with_names(self.sections.clone())
    }
}
