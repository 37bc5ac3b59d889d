//! Expiration bucket classification and day-boundary math.
//!
//! All boundary decisions in the crate go through this module so that the
//! classifier, the count queries, and the list ordering can never drift
//! apart. Timestamps with no expiration date belong to no bucket.

use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Days ahead of today that still count as `soon`.
pub const SOON_WINDOW_DAYS: i64 = 3;

/// Expiration-urgency class of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryBucket {
    Good,
    Soon,
    Today,
    Expired,
}

impl ExpiryBucket {
    /// All buckets, in summary-tag order.
    pub const ALL: [Self; 4] = [Self::Good, Self::Soon, Self::Today, Self::Expired];

    /// Stable string form used in queries and serialized state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Soon => "soon",
            Self::Today => "today",
            Self::Expired => "expired",
        }
    }

    /// Half-open `[lower, upper)` Unix-millisecond window this bucket covers,
    /// evaluated against the calendar day of `now`. `None` means unbounded on
    /// that side.
    ///
    /// The `soon` bucket's inclusive upper edge (`todayStart + 3 days`,
    /// exactly) is folded into the half-open form by extending the window one
    /// millisecond past it.
    #[must_use]
    pub fn window_ms(self, now: DateTime<Utc>) -> (Option<i64>, Option<i64>) {
        let today = day_start(now).timestamp_millis();
        let tomorrow = (day_start(now) + Duration::days(1)).timestamp_millis();
        let horizon = (day_start(now) + Duration::days(SOON_WINDOW_DAYS)).timestamp_millis();

        match self {
            Self::Expired => (None, Some(today)),
            Self::Today => (Some(today), Some(tomorrow)),
            Self::Soon => (Some(tomorrow), Some(horizon + 1)),
            Self::Good => (Some(horizon + 1), None),
        }
    }
}

impl fmt::Display for ExpiryBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiryBucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "good" => Ok(Self::Good),
            "soon" => Ok(Self::Soon),
            "today" => Ok(Self::Today),
            "expired" => Ok(Self::Expired),
            other => Err(Error::InvalidInput(format!("Unknown bucket: {other}"))),
        }
    }
}

/// Start of the calendar day containing `now` (00:00:00 UTC).
#[must_use]
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &now.date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid wall-clock time"),
    )
}

/// Normalize a chosen expiration timestamp to 23:59:59 of its calendar day.
///
/// This is the canonical `expired_at` contract: whatever time component the
/// user picked, the stored value sits at the end-of-day boundary.
#[must_use]
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &at.date_naive()
            .and_hms_opt(23, 59, 59)
            .expect("23:59:59 is a valid wall-clock time"),
    )
}

/// Classify an expiration timestamp into its bucket relative to `now`.
///
/// The four predicates partition the timeline: ties at exact day boundaries
/// resolve to the earlier bucket, so an item expiring exactly at
/// `todayStart + 1 day` is `soon`, not `today`.
#[must_use]
pub fn classify(expired_at: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryBucket {
    let today = day_start(now);
    let tomorrow = today + Duration::days(1);
    let horizon = today + Duration::days(SOON_WINDOW_DAYS);

    if expired_at < today {
        ExpiryBucket::Expired
    } else if expired_at < tomorrow {
        ExpiryBucket::Today
    } else if expired_at <= horizon {
        ExpiryBucket::Soon
    } else {
        ExpiryBucket::Good
    }
}

/// Quick expiration presets offered alongside the date picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuickDate {
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
}

impl QuickDate {
    /// All presets, in picker order.
    pub const ALL: [Self; 8] = [
        Self::OneDay,
        Self::ThreeDays,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
    ];

    /// Short picker label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::ThreeDays => "3d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
        }
    }

    /// Resolve the preset against `now` to a concrete expiration timestamp.
    ///
    /// Month-based presets use calendar months, clamping to the last day of
    /// the target month when needed.
    #[must_use]
    pub fn resolve(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::OneDay => now + Duration::days(1),
            Self::ThreeDays => now + Duration::days(3),
            Self::OneWeek => now + Duration::days(7),
            Self::OneMonth => now + Months::new(1),
            Self::ThreeMonths => now + Months::new(3),
            Self::SixMonths => now + Months::new(6),
            Self::OneYear => now + Months::new(12),
            Self::TwoYears => now + Months::new(24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    // Mid-afternoon "now"; todayStart = 2024-05-17 00:00:00.
    fn now() -> DateTime<Utc> {
        at(2024, 5, 17, 14, 30, 0)
    }

    #[test]
    fn test_classify_expired_before_today_start() {
        // One second before todayStart.
        assert_eq!(
            classify(at(2024, 5, 16, 23, 59, 59), now()),
            ExpiryBucket::Expired
        );
        assert_eq!(classify(at(2020, 1, 1, 0, 0, 0), now()), ExpiryBucket::Expired);
    }

    #[test]
    fn test_classify_today_within_current_day() {
        assert_eq!(classify(at(2024, 5, 17, 0, 0, 0), now()), ExpiryBucket::Today);
        assert_eq!(
            classify(at(2024, 5, 17, 23, 59, 59), now()),
            ExpiryBucket::Today
        );
    }

    #[test]
    fn test_classify_boundary_ties_resolve_to_earlier_bucket() {
        // Exactly todayStart + 1 day is soon, not today.
        assert_eq!(classify(at(2024, 5, 18, 0, 0, 0), now()), ExpiryBucket::Soon);
        // Exactly todayStart + 3 days is still soon.
        assert_eq!(classify(at(2024, 5, 20, 0, 0, 0), now()), ExpiryBucket::Soon);
        // One second past the horizon is good.
        assert_eq!(classify(at(2024, 5, 20, 0, 0, 1), now()), ExpiryBucket::Good);
    }

    #[test]
    fn test_classify_normalized_end_of_day_values() {
        // expired_at = todayStart + 2 days, 23:59:59 classifies as soon.
        assert_eq!(
            classify(at(2024, 5, 19, 23, 59, 59), now()),
            ExpiryBucket::Soon
        );
        // Three days out at end-of-day is past the horizon.
        assert_eq!(
            classify(at(2024, 5, 20, 23, 59, 59), now()),
            ExpiryBucket::Good
        );
    }

    #[test]
    fn test_partition_is_total_and_non_overlapping() {
        // Sweep a window around every boundary in one-second steps; each
        // timestamp must land in exactly one bucket window, and that window
        // must agree with classify.
        let start = at(2024, 5, 16, 23, 59, 50);
        for step in 0..(4 * 86_400 / 10) {
            let t = start + Duration::seconds(step * 10);
            let t_ms = t.timestamp_millis();

            let containing: Vec<ExpiryBucket> = ExpiryBucket::ALL
                .into_iter()
                .filter(|bucket| {
                    let (lower, upper) = bucket.window_ms(now());
                    lower.map_or(true, |lo| t_ms >= lo) && upper.map_or(true, |hi| t_ms < hi)
                })
                .collect();

            assert_eq!(containing.len(), 1, "timestamp {t} not in exactly one window");
            assert_eq!(containing[0], classify(t, now()));
        }
    }

    #[test]
    fn test_end_of_day_pins_to_boundary() {
        assert_eq!(end_of_day(at(2024, 5, 17, 9, 15, 4)), at(2024, 5, 17, 23, 59, 59));
        assert_eq!(
            end_of_day(at(2024, 5, 17, 23, 59, 59)),
            at(2024, 5, 17, 23, 59, 59)
        );
    }

    #[test]
    fn test_day_start_truncates() {
        assert_eq!(day_start(now()), at(2024, 5, 17, 0, 0, 0));
        assert_eq!(day_start(at(2024, 5, 17, 0, 0, 0)), at(2024, 5, 17, 0, 0, 0));
    }

    #[test]
    fn test_quick_date_presets() {
        let reference = at(2024, 1, 31, 10, 0, 0);

        assert_eq!(QuickDate::OneDay.resolve(reference), at(2024, 2, 1, 10, 0, 0));
        assert_eq!(QuickDate::OneWeek.resolve(reference), at(2024, 2, 7, 10, 0, 0));
        // Jan 31 + 1 month clamps to Feb 29 (2024 is a leap year).
        assert_eq!(
            QuickDate::OneMonth.resolve(reference),
            at(2024, 2, 29, 10, 0, 0)
        );
        assert_eq!(
            QuickDate::TwoYears.resolve(reference),
            at(2026, 1, 31, 10, 0, 0)
        );
        assert_eq!(QuickDate::OneMonth.label(), "1m");
    }
}
