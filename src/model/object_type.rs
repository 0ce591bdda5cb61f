//! ILIAS object type tags.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type of an ILIAS repository object, keyed by its short type tag.
///
/// The set is closed; tags this crate does not know are kept verbatim in
/// [`ObjectType::Unknown`] so they can still be reported and mapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Course,
    Group,
    Folder,
    ItemGroup,
    Test,
    MediaCast,
    File,
    Forum,
    Wiki,
    Exercise,
    LearningModule,
    HtmlModule,
    Scorm,
    Glossary,
    Survey,
    Poll,
    WebLink,
    MediaPool,
    MediaObject,
    Unknown(String),
}

impl ObjectType {
    /// Parse a type tag (`"tst"`, `"fold"`, ...). Matching is case-insensitive.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        match tag.to_ascii_lowercase().as_str() {
            "crs" => ObjectType::Course,
            "grp" => ObjectType::Group,
            "fold" => ObjectType::Folder,
            "itgr" => ObjectType::ItemGroup,
            "tst" => ObjectType::Test,
            "mcst" => ObjectType::MediaCast,
            "file" => ObjectType::File,
            "frm" => ObjectType::Forum,
            "wiki" => ObjectType::Wiki,
            "exc" | "excex" => ObjectType::Exercise,
            "lm" => ObjectType::LearningModule,
            "htlm" => ObjectType::HtmlModule,
            "sahs" => ObjectType::Scorm,
            "glo" => ObjectType::Glossary,
            "svy" => ObjectType::Survey,
            "poll" => ObjectType::Poll,
            "webr" => ObjectType::WebLink,
            "mep" => ObjectType::MediaPool,
            "mob" => ObjectType::MediaObject,
            "" => ObjectType::Unknown("unknown".to_string()),
            other => ObjectType::Unknown(other.to_string()),
        }
    }

    /// The canonical short tag.
    pub fn as_tag(&self) -> &str {
        match self {
            ObjectType::Course => "crs",
            ObjectType::Group => "grp",
            ObjectType::Folder => "fold",
            ObjectType::ItemGroup => "itgr",
            ObjectType::Test => "tst",
            ObjectType::MediaCast => "mcst",
            ObjectType::File => "file",
            ObjectType::Forum => "frm",
            ObjectType::Wiki => "wiki",
            ObjectType::Exercise => "exc",
            ObjectType::LearningModule => "lm",
            ObjectType::HtmlModule => "htlm",
            ObjectType::Scorm => "sahs",
            ObjectType::Glossary => "glo",
            ObjectType::Survey => "svy",
            ObjectType::Poll => "poll",
            ObjectType::WebLink => "webr",
            ObjectType::MediaPool => "mep",
            ObjectType::MediaObject => "mob",
            ObjectType::Unknown(tag) => tag,
        }
    }

    /// The stub type used when nothing is known about an item.
    pub fn unknown() -> Self {
        ObjectType::Unknown("unknown".to_string())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ObjectType::Unknown(_))
    }

    /// Containers that organize the course tree and have no content of their own.
    pub fn is_structural(&self) -> bool {
        matches!(self, ObjectType::Course | ObjectType::Group | ObjectType::Folder)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(ObjectType::from_tag(&tag))
    }
}
