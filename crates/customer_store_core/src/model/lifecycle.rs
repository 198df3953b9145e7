//! Audit timestamps and the pre-write hooks that stamp them.
//!
//! # Invariants
//! - `created_at` is written by `on_persist` only.
//! - `updated_at` stays `None` until the first dirty update.
//! - Every `on_update` stamp is strictly later than the previous stamps.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

/// UTC instant with microsecond resolution, matching the storage encoding.
pub type Timestamp = DateTime<Utc>;

/// Creation/modification stamps shared by every entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamps {
    created_at: Option<Timestamp>,
    updated_at: Option<Timestamp>,
}

impl AuditStamps {
    pub(crate) fn restored(created_at: Timestamp, updated_at: Option<Timestamp>) -> Self {
        Self {
            created_at: Some(created_at),
            updated_at,
        }
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Pre-insert hook.
    pub(crate) fn on_persist(&mut self) {
        self.created_at = Some(now());
        self.updated_at = None;
    }

    /// Pre-update hook; only called for entities whose columns changed.
    pub(crate) fn on_update(&mut self) {
        let floor = self.updated_at.max(self.created_at);
        self.updated_at = Some(stamp_after(floor));
    }
}

/// Current time truncated to whole microseconds.
pub(crate) fn now() -> Timestamp {
    let now = Utc::now();
    now.duration_trunc(Duration::microseconds(1)).unwrap_or(now)
}

/// Returns `now()`, bumped past `floor` when the clock has not advanced.
pub(crate) fn stamp_after(floor: Option<Timestamp>) -> Timestamp {
    let now = now();
    match floor {
        Some(floor) if now <= floor => floor + Duration::microseconds(1),
        _ => now,
    }
}

pub(crate) fn to_epoch_micros(value: Timestamp) -> i64 {
    value.timestamp_micros()
}

pub(crate) fn from_epoch_micros(value: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_micros(value)
}
