//! Categorization rule tables.

use serde::{Deserialize, Serialize};

use crate::model::{ObjectType, ResolvedItem};

/// One rule: items matching any keyword or any type go to `section`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub section: String,
    /// Case-insensitive substrings of the item title.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub types: Vec<ObjectType>,
}

impl CategoryRule {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            ..Self::default()
        }
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn item_type(mut self, item_type: ObjectType) -> Self {
        self.types.push(item_type);
        self
    }

    pub fn matches(&self, item: &ResolvedItem) -> bool {
        if self.types.contains(&item.item_type) {
            return true;
        }
        let title = item.title.to_lowercase();
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .any(|k| title.contains(&k.to_lowercase()))
    }
}

/// Names of the two sections every course gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionNames {
    /// Ordinal 0, always present and empty.
    pub general: String,
    /// Trailing bucket for items no rule matched.
    pub fallback: String,
}

impl Default for SectionNames {
    fn default() -> Self {
        Self {
            general: "Allgemein".to_string(),
            fallback: "Sonstiges".to_string(),
        }
    }
}

/// Ordered rules plus the section names; first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    pub rules: Vec<CategoryRule>,
    pub names: SectionNames,
}

impl RuleTable {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self {
            rules,
            names: SectionNames::default(),
        }
    }

    pub fn with_names(mut self, names: SectionNames) -> Self {
        self.names = names;
        self
    }

    /// Section name of the first rule that matches, if any.
    pub fn section_for(&self, item: &ResolvedItem) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(item))
            .map(|rule| rule.section.as_str())
    }
}
