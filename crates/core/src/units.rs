//! Conversion between a deadline's base unit and the quantities users type and read.
//!
//! Page formats display as-is. Audio is stored in minutes and shown as hours + minutes.

use serde::Serialize;
use thiserror::Error;

use crate::model::{Format, Unit};

const MINUTES_PER_HOUR: u32 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnitError {
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} is too large: {value}")]
    Overflow { field: &'static str, value: i64 },

    #[error("{format} has no secondary unit, got {value}")]
    UnexpectedSecondary { format: &'static str, value: i64 },
}

/// A quantity split the way it is shown to the user.
///
/// For audio, `primary` is hours and `secondary` is minutes (< 60).
/// For page formats, `primary` is pages and `secondary` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayQuantity {
    pub primary: u32,
    pub secondary: u32,
}

fn non_negative(field: &'static str, value: i64) -> Result<u32, UnitError> {
    if value < 0 {
        return Err(UnitError::Negative { field, value });
    }
    u32::try_from(value).map_err(|_| UnitError::Overflow { field, value })
}

/// Format-aware conversion between base units and display quantities.
pub struct UnitConverter;

impl UnitConverter {
    /// Split `total_units` into its display representation.
    ///
    /// # Errors
    ///
    /// Returns `UnitError::Negative` for negative input.
    pub fn to_display(format: Format, total_units: i64) -> Result<DisplayQuantity, UnitError> {
        let units = non_negative("total units", total_units)?;
        Ok(Self::display_units(format, units))
    }

    /// Infallible variant for already-validated base quantities.
    #[must_use]
    pub fn display_units(format: Format, units: u32) -> DisplayQuantity {
        match format.unit() {
            Unit::Minutes => DisplayQuantity {
                primary: units / MINUTES_PER_HOUR,
                secondary: units % MINUTES_PER_HOUR,
            },
            Unit::Pages => DisplayQuantity {
                primary: units,
                secondary: 0,
            },
        }
    }

    /// Combine display fields back into the base unit.
    ///
    /// Minutes above 59 are accepted and carried into the total.
    ///
    /// # Errors
    ///
    /// Returns `UnitError` for negative input, overflow, or a non-zero secondary on page formats.
    pub fn to_base_unit(format: Format, primary: i64, secondary: i64) -> Result<u32, UnitError> {
        match format.unit() {
            Unit::Minutes => {
                let hours = non_negative("hours", primary)?;
                let minutes = non_negative("minutes", secondary)?;
                hours
                    .checked_mul(MINUTES_PER_HOUR)
                    .and_then(|total| total.checked_add(minutes))
                    .ok_or(UnitError::Overflow {
                        field: "total minutes",
                        value: primary,
                    })
            }
            Unit::Pages => {
                let pages = non_negative("pages", primary)?;
                if secondary != 0 {
                    return Err(UnitError::UnexpectedSecondary {
                        format: format.as_str(),
                        value: secondary,
                    });
                }
                Ok(pages)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_splits_into_hours_and_minutes() {
        let display = UnitConverter::to_display(Format::AudioMinutes, 605).unwrap();
        assert_eq!(
            display,
            DisplayQuantity {
                primary: 10,
                secondary: 5
            }
        );
    }

    #[test]
    fn pages_display_unchanged() {
        let display = UnitConverter::to_display(Format::EbookPages, 412).unwrap();
        assert_eq!(display.primary, 412);
        assert_eq!(display.secondary, 0);
    }

    #[test]
    fn round_trip_is_exact_for_every_format() {
        for format in Format::ALL {
            for n in (0..2_000).chain([59, 60, 61, 3_599, 3_600, 1_000_000]) {
                let display = UnitConverter::to_display(format, n).unwrap();
                let back = UnitConverter::to_base_unit(
                    format,
                    i64::from(display.primary),
                    i64::from(display.secondary),
                )
                .unwrap();
                assert_eq!(i64::from(back), n, "format {format:?}, n {n}");
            }
        }
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(matches!(
            UnitConverter::to_display(Format::Pages, -1),
            Err(UnitError::Negative { .. })
        ));
        assert!(matches!(
            UnitConverter::to_base_unit(Format::AudioMinutes, 1, -5),
            Err(UnitError::Negative {
                field: "minutes",
                ..
            })
        ));
        assert!(matches!(
            UnitConverter::to_base_unit(Format::Pages, -3, 0),
            Err(UnitError::Negative { field: "pages", .. })
        ));
    }

    #[test]
    fn minutes_overflow_carries_into_total() {
        assert_eq!(
            UnitConverter::to_base_unit(Format::AudioMinutes, 1, 75).unwrap(),
            135
        );
    }

    #[test]
    fn pages_reject_secondary_component() {
        let err = UnitConverter::to_base_unit(Format::Pages, 10, 3).unwrap_err();
        assert_eq!(
            err,
            UnitError::UnexpectedSecondary {
                format: "pages",
                value: 3
            }
        );
    }
}
