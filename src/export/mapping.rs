//! ILIAS type → Moodle activity module mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ObjectType;

/// Moodle activity modules the emitter can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Resource,
    Folder,
    Quiz,
    Assign,
    Forum,
    Wiki,
    Url,
    Scorm,
    Book,
    Page,
    Glossary,
    Feedback,
    Choice,
    Label,
}

impl ActivityKind {
    /// The Moodle module name (`mod_<name>`), also used in directory names.
    pub fn module_name(&self) -> &'static str {
        match self {
            ActivityKind::Resource => "resource",
            ActivityKind::Folder => "folder",
            ActivityKind::Quiz => "quiz",
            ActivityKind::Assign => "assign",
            ActivityKind::Forum => "forum",
            ActivityKind::Wiki => "wiki",
            ActivityKind::Url => "url",
            ActivityKind::Scorm => "scorm",
            ActivityKind::Book => "book",
            ActivityKind::Page => "page",
            ActivityKind::Glossary => "glossary",
            ActivityKind::Feedback => "feedback",
            ActivityKind::Choice => "choice",
            ActivityKind::Label => "label",
        }
    }

    pub fn from_module_name(name: &str) -> Option<Self> {
        Some(match name {
            "resource" => ActivityKind::Resource,
            "folder" => ActivityKind::Folder,
            "quiz" => ActivityKind::Quiz,
            "assign" => ActivityKind::Assign,
            "forum" => ActivityKind::Forum,
            "wiki" => ActivityKind::Wiki,
            "url" => ActivityKind::Url,
            "scorm" => ActivityKind::Scorm,
            "book" => ActivityKind::Book,
            "page" => ActivityKind::Page,
            "glossary" => ActivityKind::Glossary,
            "feedback" => ActivityKind::Feedback,
            "choice" => ActivityKind::Choice,
            "label" => ActivityKind::Label,
            _ => return None,
        })
    }

    /// Whether the module contributes a gradebook item.
    pub fn is_graded(&self) -> bool {
        matches!(self, ActivityKind::Quiz | ActivityKind::Assign)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module_name())
    }
}

/// Built-in mapping; anything not listed becomes a resource.
pub fn default_kind(item_type: &ObjectType) -> ActivityKind {
    match item_type {
        ObjectType::File | ObjectType::MediaCast => ActivityKind::Resource,
        ObjectType::Folder => ActivityKind::Folder,
        ObjectType::Test => ActivityKind::Quiz,
        ObjectType::Exercise => ActivityKind::Assign,
        ObjectType::Forum => ActivityKind::Forum,
        ObjectType::Wiki => ActivityKind::Wiki,
        ObjectType::WebLink => ActivityKind::Url,
        ObjectType::Scorm => ActivityKind::Scorm,
        ObjectType::LearningModule => ActivityKind::Book,
        ObjectType::HtmlModule => ActivityKind::Page,
        ObjectType::Glossary => ActivityKind::Glossary,
        ObjectType::Survey => ActivityKind::Feedback,
        ObjectType::Poll => ActivityKind::Choice,
        ObjectType::Course
        | ObjectType::Group
        | ObjectType::ItemGroup
        | ObjectType::MediaPool
        | ObjectType::MediaObject
        | ObjectType::Unknown(_) => ActivityKind::Resource,
    }
}

/// Default mapping plus per-tag overrides from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeMapping {
    overrides: BTreeMap<String, ActivityKind>,
}

impl TypeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `tag` (case-insensitive) to `kind`, replacing the default.
    pub fn with_override(mut self, tag: &str, kind: ActivityKind) -> Self {
        self.overrides.insert(tag.trim().to_ascii_lowercase(), kind);
        self
    }

    pub fn map(&self, item_type: &ObjectType) -> ActivityKind {
        // Keys loaded from TOML keep the user's casing
        let tag = item_type.as_tag();
        self.overrides
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(tag))
            .map(|(_, kind)| *kind)
            .unwrap_or_else(|| default_kind(item_type))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, ActivityKind)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
