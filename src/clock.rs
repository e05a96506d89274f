//! Simulated wall clock
//!
//! The generator never looks at the host clock. Every calendar field is derived
//! from a fixed origin plus a monotonically increasing count of elapsed seconds.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Meteorological bucket used by the season score.
///
/// Mapped from the month with the thresholds `<=3`, `<=6`, `<=9`, `<=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            1..=3 => Some(Season::Spring),
            4..=6 => Some(Season::Summer),
            7..=9 => Some(Season::Fall),
            10..=12 => Some(Season::Winter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default origin of a run: 2019-01-01T00:00:00.
pub fn default_origin() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

/// Virtual timestamp advanced one tick (second) at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedClock {
    origin: NaiveDateTime,
    elapsed_seconds: u64,
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(default_origin())
    }
}

impl SimulatedClock {
    pub fn new(origin: NaiveDateTime) -> Self {
        Self::at(origin, 0)
    }

    /// Clock positioned `elapsed_seconds` after `origin`.
    pub fn at(origin: NaiveDateTime, elapsed_seconds: u64) -> Self {
        Self {
            origin,
            elapsed_seconds,
        }
    }

    pub fn advance(&mut self, seconds: u64) {
        self.elapsed_seconds += seconds;
    }

    pub fn origin(&self) -> NaiveDateTime {
        self.origin
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Current simulated instant.
    pub fn now(&self) -> NaiveDateTime {
        self.origin + TimeDelta::seconds(self.elapsed_seconds as i64)
    }

    pub fn second(&self) -> u32 {
        self.now().second()
    }

    pub fn minute(&self) -> u32 {
        self.now().minute()
    }

    pub fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// 0 = Monday .. 6 = Sunday.
    pub fn weekday(&self) -> u32 {
        self.now().weekday().num_days_from_monday()
    }

    pub fn day_of_month(&self) -> u32 {
        self.now().day()
    }

    pub fn month(&self) -> u32 {
        self.now().month()
    }

    pub fn season(&self) -> Season {
        // month() is always 1..=12
        Season::from_month(self.month()).unwrap_or(Season::Winter)
    }

    pub fn year(&self) -> i32 {
        self.now().year()
    }

    /// 1-based: January 1st is day 1, December 31st is 365 or 366.
    pub fn day_of_year(&self) -> u32 {
        self.now().ordinal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_default_origin_fields() {
        let clock = SimulatedClock::default();
        assert_eq!(clock.elapsed_seconds(), 0);
        assert_eq!(clock.year(), 2019);
        assert_eq!(clock.month(), 1);
        assert_eq!(clock.day_of_month(), 1);
        // 2019-01-01 was a Tuesday
        assert_eq!(clock.weekday(), 1);
        assert_eq!(clock.day_of_year(), 1);
        assert_eq!(clock.season(), Season::Spring);
    }

    #[test]
    fn test_advance_rolls_calendar_fields() {
        let mut clock = SimulatedClock::default();
        clock.advance(59);
        assert_eq!((clock.hour(), clock.minute(), clock.second()), (0, 0, 59));
        clock.advance(1);
        assert_eq!((clock.hour(), clock.minute(), clock.second()), (0, 1, 0));
        clock.advance(86_400 - 60);
        assert_eq!(clock.day_of_month(), 2);
        assert_eq!(clock.weekday(), 2);
        assert_eq!(clock.day_of_year(), 2);
    }

    #[test]
    fn test_leap_year_is_honoured() {
        let clock = SimulatedClock::at(ymd_hms(2020, 2, 28, 23, 59, 59), 1);
        assert_eq!(clock.month(), 2);
        assert_eq!(clock.day_of_month(), 29);

        let end = SimulatedClock::at(ymd_hms(2020, 12, 31, 0, 0, 0), 0);
        assert_eq!(end.day_of_year(), 366);

        let non_leap = SimulatedClock::at(ymd_hms(2019, 2, 28, 23, 59, 59), 1);
        assert_eq!(non_leap.month(), 3);
        assert_eq!(non_leap.day_of_month(), 1);
    }

    #[test]
    fn test_day_of_year_resets_on_new_year() {
        let clock = SimulatedClock::at(ymd_hms(2019, 12, 31, 23, 59, 59), 1);
        assert_eq!(clock.year(), 2020);
        assert_eq!(clock.day_of_year(), 1);
    }

    #[test]
    fn test_season_thresholds() {
        let expected = [
            (1, Season::Spring),
            (3, Season::Spring),
            (4, Season::Summer),
            (6, Season::Summer),
            (7, Season::Fall),
            (9, Season::Fall),
            (10, Season::Winter),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), Some(season), "month {month}");
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    proptest! {
        #[test]
        fn test_advance_matches_direct_construction(steps in proptest::collection::vec(1u64..200_000, 0..20)) {
            let origin = default_origin();
            let mut advanced = SimulatedClock::new(origin);
            for s in &steps {
                advanced.advance(*s);
            }
            let total: u64 = steps.iter().sum();
            let direct = SimulatedClock::at(origin, total);

            prop_assert_eq!(advanced.now(), direct.now());
            prop_assert_eq!(advanced.weekday(), direct.weekday());
            prop_assert_eq!(advanced.day_of_year(), direct.day_of_year());
            prop_assert_eq!(advanced.season(), direct.season());
            prop_assert_eq!(advanced, direct);
        }
    }
}
