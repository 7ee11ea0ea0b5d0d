//! Change events emitted for cached heroes.
//!
//! Events are constructed in exactly two places: the refresh scheduler's
//! diff step and the coordinator's first-fetch path. Everything else only
//! consumes them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::hero::Hero;

/// Kind of change observed for a hero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Hero was seen for the first time
    New,
    /// A previously cached hero changed
    Updated,
    /// A previously cached hero disappeared upstream
    Deleted,
}

impl ChangeKind {
    /// Returns the string representation of the change kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "new",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of one observed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Kind of change (new, updated, deleted)
    pub kind: ChangeKind,
    /// ID of the hero the change applies to
    pub hero_id: String,
    /// Snapshot of the hero at event time (None for deletions)
    pub hero: Option<Hero>,
    /// Timestamp of the event
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    fn build(kind: ChangeKind, hero_id: impl Into<String>, hero: Option<Hero>) -> Self {
        Self {
            kind,
            hero_id: hero_id.into(),
            hero,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Create a "new hero" event.
    pub fn new_hero(hero_id: impl Into<String>, hero: Hero) -> Self {
        Self::build(ChangeKind::New, hero_id, Some(hero))
    }

    /// Create an "updated hero" event.
    pub fn updated(hero_id: impl Into<String>, hero: Hero) -> Self {
        Self::build(ChangeKind::Updated, hero_id, Some(hero))
    }

    /// Create a "deleted hero" event.
    pub fn deleted(hero_id: impl Into<String>) -> Self {
        Self::build(ChangeKind::Deleted, hero_id, None)
    }
}
