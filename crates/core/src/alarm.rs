use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-assigned alarm identity. Unique among pending entries.
pub type AlarmId = i32;

/// Opaque alarm kind tag.
///
/// The scheduler interprets exactly one value, [`AlarmKind::AUTOSILENCE`].
/// Every other tag is carried through to fire signals untouched, so callers
/// are free to introduce their own kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmKind(Cow<'static, str>);

impl AlarmKind {
    pub const NORMAL: AlarmKind = AlarmKind(Cow::Borrowed("NORMAL"));
    pub const PREALARM: AlarmKind = AlarmKind(Cow::Borrowed("PREALARM"));
    pub const SNOOZE: AlarmKind = AlarmKind(Cow::Borrowed("SNOOZE"));
    /// Scheduled and fired like any other entry, but never reported as the
    /// user-facing next alarm while a non-autosilence entry is pending.
    pub const AUTOSILENCE: AlarmKind = AlarmKind(Cow::Borrowed("AUTOSILENCE"));

    pub fn new(tag: impl Into<String>) -> Self {
        AlarmKind(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_autosilence(&self) -> bool {
        *self == Self::AUTOSILENCE
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlarmKind {
    fn from(tag: &str) -> Self {
        AlarmKind::new(tag)
    }
}

impl From<String> for AlarmKind {
    fn from(tag: String) -> Self {
        AlarmKind::new(tag)
    }
}

/// A pending alarm instant. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEntry {
    id: AlarmId,
    instant: DateTime<Utc>,
    kind: AlarmKind,
}

impl AlarmEntry {
    pub fn new(id: AlarmId, instant: DateTime<Utc>, kind: AlarmKind) -> Self {
        Self { id, instant, kind }
    }

    pub fn id(&self) -> AlarmId {
        self.id
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn kind(&self) -> &AlarmKind {
        &self.kind
    }

    /// Whether the entry is due at `now` (inclusive).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.instant <= now
    }
}

impl fmt::Display for AlarmEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {}",
            self.id,
            self.kind,
            self.instant.format("%d-%m-%y %H:%M:%S")
        )
    }
}
