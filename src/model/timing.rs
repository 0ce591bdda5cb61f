//! Availability windows attached to container items.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

/// How ILIAS interprets a timing record (`Timing/@Type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingKind {
    /// Visible only inside the start/end window.
    Activation,
    /// Timing switched off.
    Deactivated,
    /// Suggested processing time (learning objectives view).
    Presetting,
    Other(u8),
}

impl TimingKind {
    pub fn from_attr(value: &str) -> Self {
        match value.trim() {
            "0" => TimingKind::Activation,
            "1" => TimingKind::Deactivated,
            "2" => TimingKind::Presetting,
            other => other.parse().map(TimingKind::Other).unwrap_or(TimingKind::Deactivated),
        }
    }

    pub fn as_attr(&self) -> String {
        match self {
            TimingKind::Activation => "0".to_string(),
            TimingKind::Deactivated => "1".to_string(),
            TimingKind::Presetting => "2".to_string(),
            TimingKind::Other(n) => n.to_string(),
        }
    }
}

/// Start/end visibility window of a container item.
///
/// Dates are kept as the strings ILIAS wrote; they are carried through to
/// the backup as opaque metadata and never influence placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timing {
    pub kind: TimingKind,
    pub visible: bool,
    pub changeable: bool,
    pub start: Option<String>,
    pub end: Option<String>,
    pub suggestion_start: Option<String>,
    pub suggestion_end: Option<String>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            kind: TimingKind::Deactivated,
            visible: true,
            changeable: false,
            start: None,
            end: None,
            suggestion_start: None,
            suggestion_end: None,
        }
    }
}

impl Timing {
    /// Whether a start or end date restricts availability.
    pub fn has_window(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn has_suggestion(&self) -> bool {
        self.suggestion_start.is_some() || self.suggestion_end.is_some()
    }

    /// Start of the window as a Unix timestamp, if it parses.
    pub fn start_timestamp(&self) -> Option<i64> {
        self.start.as_deref().and_then(parse_ilias_datetime)
    }

    pub fn end_timestamp(&self) -> Option<i64> {
        self.end.as_deref().and_then(parse_ilias_datetime)
    }
}

/// Parse an ILIAS timestamp: either Unix seconds or `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_ilias_datetime(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<i64>() {
        return (secs > 0).then_some(secs);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.timestamp())
}
