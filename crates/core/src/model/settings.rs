use chrono::Weekday;
use serde::Serialize;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("impossible factor must be finite and > 1.0, got {0}")]
    InvalidImpossibleFactor(f64),

    #[error("urgent window must be at least 1 day")]
    InvalidUrgentWithinDays,

    #[error("pace window must be between 1 and 90 days, got {0}")]
    InvalidPaceWindowDays(u32),

    #[error("reliable pace needs between 1 and {window} active days, got {provided}")]
    InvalidReliableMinActiveDays { provided: u32, window: u32 },
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for urgency classification and pace estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaceSettings {
    impossible_factor: f64,
    urgent_within_days: u32,
    pace_window_days: u32,
    reliable_min_active_days: u32,
    week_start: Weekday,
}

impl PaceSettings {
    pub const DEFAULT_IMPOSSIBLE_FACTOR: f64 = 2.5;
    pub const DEFAULT_URGENT_WITHIN_DAYS: u32 = 3;
    pub const DEFAULT_PACE_WINDOW_DAYS: u32 = 14;
    pub const DEFAULT_RELIABLE_MIN_ACTIVE_DAYS: u32 = 3;
    const MAX_PACE_WINDOW_DAYS: u32 = 90;

    /// Creates custom settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any value is out of range.
    pub fn new(
        impossible_factor: f64,
        urgent_within_days: u32,
        pace_window_days: u32,
        reliable_min_active_days: u32,
        week_start: Weekday,
    ) -> Result<Self, SettingsError> {
        if !impossible_factor.is_finite() || impossible_factor <= 1.0 {
            return Err(SettingsError::InvalidImpossibleFactor(impossible_factor));
        }
        if urgent_within_days == 0 {
            return Err(SettingsError::InvalidUrgentWithinDays);
        }
        if !(1..=Self::MAX_PACE_WINDOW_DAYS).contains(&pace_window_days) {
            return Err(SettingsError::InvalidPaceWindowDays(pace_window_days));
        }
        if reliable_min_active_days == 0 || reliable_min_active_days > pace_window_days {
            return Err(SettingsError::InvalidReliableMinActiveDays {
                provided: reliable_min_active_days,
                window: pace_window_days,
            });
        }

        Ok(Self {
            impossible_factor,
            urgent_within_days,
            pace_window_days,
            reliable_min_active_days,
            week_start,
        })
    }

    /// Required pace above `impossible_factor` × best observed day marks a strict deadline impossible.
    #[must_use]
    pub fn impossible_factor(&self) -> f64 {
        self.impossible_factor
    }

    #[must_use]
    pub fn urgent_within_days(&self) -> u32 {
        self.urgent_within_days
    }

    #[must_use]
    pub fn pace_window_days(&self) -> u32 {
        self.pace_window_days
    }

    #[must_use]
    pub fn reliable_min_active_days(&self) -> u32 {
        self.reliable_min_active_days
    }

    /// First day of the calendar week; the current week is excluded from pace windows.
    #[must_use]
    pub fn week_start(&self) -> Weekday {
        self.week_start
    }
}

impl Default for PaceSettings {
    fn default() -> Self {
        Self {
            impossible_factor: Self::DEFAULT_IMPOSSIBLE_FACTOR,
            urgent_within_days: Self::DEFAULT_URGENT_WITHIN_DAYS,
            pace_window_days: Self::DEFAULT_PACE_WINDOW_DAYS,
            reliable_min_active_days: Self::DEFAULT_RELIABLE_MIN_ACTIVE_DAYS,
            week_start: Weekday::Mon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let settings = PaceSettings::default();
        assert!((settings.impossible_factor() - 2.5).abs() < f64::EPSILON);
        assert_eq!(settings.urgent_within_days(), 3);
        assert_eq!(settings.pace_window_days(), 14);
        assert_eq!(settings.reliable_min_active_days(), 3);
        assert_eq!(settings.week_start(), Weekday::Mon);
    }

    #[test]
    fn rejects_non_amplifying_factor() {
        for factor in [1.0, 0.5, f64::NAN, f64::INFINITY] {
            let err = PaceSettings::new(factor, 3, 14, 3, Weekday::Mon).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidImpossibleFactor(_)));
        }
    }

    #[test]
    fn rejects_out_of_range_windows() {
        assert_eq!(
            PaceSettings::new(2.5, 0, 14, 3, Weekday::Mon).unwrap_err(),
            SettingsError::InvalidUrgentWithinDays
        );
        assert_eq!(
            PaceSettings::new(2.5, 3, 0, 1, Weekday::Mon).unwrap_err(),
            SettingsError::InvalidPaceWindowDays(0)
        );
        assert_eq!(
            PaceSettings::new(2.5, 3, 7, 8, Weekday::Mon).unwrap_err(),
            SettingsError::InvalidReliableMinActiveDays {
                provided: 8,
                window: 7
            }
        );
    }

    #[test]
    fn accepts_custom_week_start() {
        let settings = PaceSettings::new(3.0, 2, 21, 4, Weekday::Sun).unwrap();
        assert_eq!(settings.week_start(), Weekday::Sun);
        assert_eq!(settings.pace_window_days(), 21);
    }
}
