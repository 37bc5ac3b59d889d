//! Per-item live countdowns for the list view.
//!
//! A countdown is seeded once from the wall clock at mount and then ticked
//! down one second at a time by the caller's timer; it is never re-synced, so
//! a long-idle view may drift from true elapsed time. Label and severity are
//! both derived from the same counter and therefore can never disagree about
//! whether the item has expired.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Item, ItemId};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;
/// 30-day month used for the coarse `{N}m` label.
const SECS_PER_MONTH: i64 = 2_592_000;

/// Urgency color for a countdown badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Three or more days left.
    Green,
    /// At least one day left.
    Orange,
    /// Less than a day left, or already expired.
    Red,
}

/// Remaining-time counter for one displayed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: i64,
}

impl Countdown {
    /// Seed a countdown from the expiration timestamp and the current time.
    #[must_use]
    pub fn new(expired_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            remaining: expired_at.timestamp() - now.timestamp(),
        }
    }

    /// Current counter value in seconds; non-positive means expired.
    #[must_use]
    pub const fn remaining_seconds(self) -> i64 {
        self.remaining
    }

    /// Whether the counter is still ticking.
    #[must_use]
    pub const fn is_running(self) -> bool {
        self.remaining > 0
    }

    /// Whether the item should be flagged as expired.
    #[must_use]
    pub const fn is_expired(self) -> bool {
        self.remaining <= 0
    }

    /// Advance one second. Returns whether the counter keeps running; once
    /// it reaches zero the caller should cancel its tick source.
    pub fn tick(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        self.is_running()
    }

    /// Compact badge label, or `None` once expired.
    ///
    /// More than 30 days renders as whole months, a day or more as whole
    /// days, anything shorter as a zero-padded `HH:MM:SS` clock.
    #[must_use]
    pub fn label(self) -> Option<String> {
        if self.remaining <= 0 {
            return None;
        }
        if self.remaining > SECS_PER_MONTH {
            return Some(format!("{}m", self.remaining / SECS_PER_MONTH));
        }
        if self.remaining >= SECS_PER_DAY {
            return Some(format!("{}d", self.remaining / SECS_PER_DAY));
        }

        let hours = self.remaining / SECS_PER_HOUR;
        let minutes = (self.remaining % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let seconds = self.remaining % SECS_PER_MINUTE;
        Some(format!("{hours:02}:{minutes:02}:{seconds:02}"))
    }

    /// Badge color for the current counter value.
    #[must_use]
    pub const fn severity(self) -> Severity {
        if self.remaining >= 3 * SECS_PER_DAY {
            Severity::Green
        } else if self.remaining >= SECS_PER_DAY {
            Severity::Orange
        } else {
            Severity::Red
        }
    }
}

/// Shared ticker over every visible item's countdown.
///
/// One board per list view replaces one timer per row: the view drives a
/// single one-second tick and re-renders rows whose counters changed.
/// Counters for unmounted rows must be removed so they don't tick forever.
#[derive(Debug, Default)]
pub struct CountdownBoard {
    timers: HashMap<ItemId, Countdown>,
}

impl CountdownBoard {
    /// Empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or re-seed) a countdown for a visible item.
    ///
    /// Items without an expiration date get no countdown; returns whether
    /// one was mounted.
    pub fn mount(&mut self, item: &Item, now: DateTime<Utc>) -> bool {
        let Some(expired_at) = item.expired_at else {
            self.timers.remove(&item.id);
            return false;
        };
        self.timers.insert(item.id, Countdown::new(expired_at, now));
        true
    }

    /// Remove an item's countdown when its row leaves the view.
    pub fn unmount(&mut self, id: ItemId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Countdown for a mounted item.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Countdown> {
        self.timers.get(&id)
    }

    /// Advance every running countdown one second; returns how many are
    /// still running afterwards.
    pub fn tick(&mut self) -> usize {
        let mut running = 0;
        for countdown in self.timers.values_mut() {
            if countdown.tick() {
                running += 1;
            }
        }
        running
    }

    /// Drop all countdowns (view unmounted).
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Number of mounted countdowns, running or expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no countdowns are mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
