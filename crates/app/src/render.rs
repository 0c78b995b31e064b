use std::fmt::Write as _;

use pace_core::daily_target::DailyTargets;
use pace_core::model::{Format, Unit};
use pace_core::units::UnitConverter;
use services::DeadlineOverview;

/// `120 pages` or `5h 07m`.
pub fn quantity(format: Format, units: u32) -> String {
    let display = UnitConverter::display_units(format, units);
    match format.unit() {
        Unit::Pages => format!("{} pages", display.primary),
        Unit::Minutes => format!("{}h {:02}m", display.primary, display.secondary),
    }
}

/// Per-day rate, rounded up to whole units.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rate(format: Format, per_day: f64) -> String {
    let units = per_day.max(0.0).ceil().min(f64::from(u32::MAX)) as u32;
    format!("{}/day", quantity(format, units))
}

pub fn overview_table(rows: &[DeadlineOverview]) -> String {
    if rows.is_empty() {
        return "No active deadlines.\n".to_owned();
    }

    let mut out = String::new();
    for row in rows {
        let format = row.deadline.format();
        let pace = if row.pace.has_data() {
            let reliability = if row.pace.is_reliable { "" } else { " (few days)" };
            format!("{}{reliability}", rate(format, row.pace.average_per_day))
        } else {
            "no recent pace".to_owned()
        };
        let _ = writeln!(
            out,
            "#{id} {title} [{format}] {level}",
            id = row.deadline.id(),
            title = row.deadline.title(),
            format = format.as_str(),
            level = row.urgency.level.as_str(),
        );
        let _ = writeln!(
            out,
            "    {left} left ({pct}% done), due {due} ({days} days), need {need}, pace {pace}",
            left = quantity(format, row.remaining.remaining),
            pct = row.remaining.percentage,
            due = row.deadline.deadline_date(),
            days = row.urgency.days_left,
            need = rate(format, row.urgency.required_pace_today),
        );
    }
    out
}

pub fn daily_targets(targets: &DailyTargets) -> String {
    if targets.by_format.is_empty() {
        return format!("{}: nothing due today.\n", targets.day);
    }

    let mut out = format!("{}\n", targets.day);
    for snapshot in targets.by_format.values() {
        let state = if snapshot.is_met() {
            "met".to_owned()
        } else {
            format!("{} to go", quantity(snapshot.format, snapshot.remaining_today()))
        };
        let _ = writeln!(
            out,
            "  {format}: {achieved} of {required} ({state})",
            format = snapshot.format.as_str(),
            achieved = quantity(snapshot.format, snapshot.current_achieved),
            required = quantity(snapshot.format, snapshot.total_required),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_render_in_display_units() {
        assert_eq!(quantity(Format::Pages, 120), "120 pages");
        assert_eq!(quantity(Format::EbookPages, 0), "0 pages");
        assert_eq!(quantity(Format::AudioMinutes, 307), "5h 07m");
    }

    #[test]
    fn rates_round_up() {
        assert_eq!(rate(Format::Pages, 21.2), "22 pages/day");
        assert_eq!(rate(Format::AudioMinutes, 90.0), "1h 30m/day");
        assert_eq!(rate(Format::Pages, 0.0), "0 pages/day");
    }

    #[test]
    fn empty_views_have_a_message() {
        assert_eq!(overview_table(&[]), "No active deadlines.\n");
    }
}
