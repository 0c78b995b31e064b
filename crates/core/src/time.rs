use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

/// A simple clock abstraction for deterministic time in services and tests.
///
/// The engine never reads the wall clock itself; services resolve `now` here and pass it down.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Calendar day of `now()`.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

//
// ─── CALENDAR HELPERS ──────────────────────────────────────────────────────────
//

/// First instant of `day`.
#[must_use]
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable instant before `day` begins, i.e. the end of the previous day.
#[must_use]
pub fn end_of_previous_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) - Duration::nanoseconds(1)
}

/// First day of the calendar week containing `day`.
#[must_use]
pub fn week_start_of(day: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + day.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    day - Duration::days(i64::from(offset))
}

/// Whole calendar days from `from` to `to` (negative when `to` is earlier).
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z, a Tuesday).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        assert!(clock.is_fixed());
        clock.advance(Duration::days(1));
        assert_eq!(clock.today(), date(2023, 11, 15));
    }

    #[test]
    fn week_start_of_handles_each_weekday() {
        // 2023-11-14 is a Tuesday
        assert_eq!(week_start_of(date(2023, 11, 14), Weekday::Mon), date(2023, 11, 13));
        assert_eq!(week_start_of(date(2023, 11, 13), Weekday::Mon), date(2023, 11, 13));
        assert_eq!(week_start_of(date(2023, 11, 19), Weekday::Mon), date(2023, 11, 13));
        assert_eq!(week_start_of(date(2023, 11, 14), Weekday::Sun), date(2023, 11, 12));
        assert_eq!(week_start_of(date(2023, 11, 12), Weekday::Sun), date(2023, 11, 12));
    }

    #[test]
    fn day_boundaries_are_adjacent() {
        let day = date(2023, 11, 14);
        assert_eq!(start_of_day(day).date_naive(), day);
        assert_eq!(end_of_previous_day(day).date_naive(), date(2023, 11, 13));
        assert!(end_of_previous_day(day) < start_of_day(day));
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(date(2023, 11, 14), date(2023, 11, 24)), 10);
        assert_eq!(days_between(date(2023, 11, 14), date(2023, 11, 12)), -2);
    }
}
