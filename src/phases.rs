//! Pure date arithmetic for cycle predictions and phase classification.
//! No I/O; callers parse and validate dates before reaching this module.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{CycleEntry, CycleStatus};

/// Default period length used when a user has no logged history yet.
pub const DEFAULT_PERIOD_LENGTH: i64 = 5;

/// A newly logged cycle only moves the stored average when it deviates by
/// more than this many days.
pub const AVG_RECALC_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl From<Phase> for CycleStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Menstrual => CycleStatus::Menstrual,
            Phase::Follicular => CycleStatus::Follicular,
            Phase::Ovulation => CycleStatus::Ovulation,
            Phase::Luteal => CycleStatus::Luteal,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhaseInfo {
    pub phase: Phase,
    pub days_into_phase: i64,
    pub total_days_in_cycle: i64,
}

/// Absolute whole-day difference between two dates. Order-independent.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs()
}

/// Next expected cycle start: `last_start` advanced by the average cycle
/// length, carrying over month and year boundaries.
pub fn predict_next_start(last_start: NaiveDate, avg_cycle_length: i64) -> NaiveDate {
    last_start + Duration::days(avg_cycle_length)
}

/// Classify `today` into a cycle phase given the last cycle start.
///
/// The bands are checked in order (menstrual, follicular, ovulation,
/// luteal) and are not normalized into a total partition: for short cycle
/// lengths they can overlap or leave gaps, and whichever check matches
/// first wins. That matches what the app has always shown, so the quirk is
/// kept on purpose.
pub fn determine_phase(
    last_start: NaiveDate,
    avg_cycle_length: i64,
    period_length: i64,
    today: NaiveDate,
) -> PhaseInfo {
    let days_since_start = days_between(last_start, today);

    let follicular_end = period_length + 7;
    let ovulation_start = avg_cycle_length - 16;
    let ovulation_end = avg_cycle_length - 12;
    let luteal_start = ovulation_end + 1;

    let (phase, days_into_phase) = if days_since_start <= period_length {
        (Phase::Menstrual, days_since_start)
    } else if days_since_start <= follicular_end {
        (Phase::Follicular, days_since_start - period_length)
    } else if days_since_start >= ovulation_start && days_since_start <= ovulation_end {
        (Phase::Ovulation, days_since_start - ovulation_start)
    } else {
        (Phase::Luteal, days_since_start - luteal_start)
    };

    PhaseInfo {
        phase,
        days_into_phase,
        total_days_in_cycle: days_since_start,
    }
}

/// Mean period duration over the logged history, rounded to whole days.
/// Falls back to [`DEFAULT_PERIOD_LENGTH`] when there is no history.
pub fn average_period_length(entries: &[CycleEntry]) -> i64 {
    if entries.is_empty() {
        return DEFAULT_PERIOD_LENGTH;
    }
    let total: i64 = entries.iter().map(|e| e.duration_days()).sum();
    (total as f64 / entries.len() as f64).round() as i64
}

/// Recompute the stored average cycle length after a new entry was
/// appended. Returns `Some(new_average)` only when the new entry's
/// duration deviates from the current average by more than
/// [`AVG_RECALC_THRESHOLD`] days; the new average is the rounded mean of
/// the last three entries (the new one included).
pub fn recalc_avg_cycle_length(
    entries_after_append: &[CycleEntry],
    new_duration: i64,
    current_avg: i64,
) -> Option<i64> {
    if (new_duration - current_avg).abs() <= AVG_RECALC_THRESHOLD {
        return None;
    }
    let recent = &entries_after_append[entries_after_append.len().saturating_sub(3)..];
    if recent.is_empty() {
        return None;
    }
    let total: i64 = recent.iter().map(|e| e.duration_days()).sum();
    Some((total as f64 / recent.len() as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(start: NaiveDate, len: i64) -> CycleEntry {
        CycleEntry {
            id: Uuid::new_v4(),
            start_date: start,
            end_date: start + Duration::days(len),
            symptoms: vec![],
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn days_between_is_symmetric() {
        let a = date(2024, 1, 20);
        let b = date(2024, 3, 3);
        assert_eq!(days_between(a, b), days_between(b, a));
        assert_eq!(days_between(a, b), 43);
        assert_eq!(days_between(a, a), 0);
    }

    #[test]
    fn predict_crosses_month_boundary() {
        assert_eq!(
            predict_next_start(date(2024, 1, 20), 28),
            date(2024, 2, 17)
        );
    }

    #[test]
    fn predict_crosses_year_boundary() {
        assert_eq!(
            predict_next_start(date(2023, 12, 20), 28),
            date(2024, 1, 17)
        );
    }

    #[test]
    fn day_ten_of_standard_cycle_is_follicular() {
        let today = date(2024, 6, 11);
        let info = determine_phase(date(2024, 6, 1), 28, 5, today);
        assert_eq!(info.phase, Phase::Follicular);
        assert_eq!(info.total_days_in_cycle, 10);
        assert_eq!(info.days_into_phase, 5);
    }

    #[test]
    fn phase_band_edges() {
        let start = date(2024, 6, 1);
        // Day 5 is still menstrual, day 6 flips to follicular.
        assert_eq!(
            determine_phase(start, 28, 5, date(2024, 6, 6)).phase,
            Phase::Menstrual
        );
        assert_eq!(
            determine_phase(start, 28, 5, date(2024, 6, 7)).phase,
            Phase::Follicular
        );
        // Ovulation window for a 28-day cycle is day 12..=16.
        assert_eq!(
            determine_phase(start, 28, 5, date(2024, 6, 14)).phase,
            Phase::Ovulation
        );
        assert_eq!(
            determine_phase(start, 28, 5, date(2024, 6, 20)).phase,
            Phase::Luteal
        );
    }

    #[test]
    fn overlapping_bands_resolve_by_check_order() {
        // With a 21-day cycle the ovulation band (5..=9) overlaps the
        // follicular band (6..=12); follicular is checked first and wins.
        let info = determine_phase(date(2024, 6, 1), 21, 5, date(2024, 6, 9));
        assert_eq!(info.phase, Phase::Follicular);
    }

    #[test]
    fn average_period_length_defaults_to_five() {
        assert_eq!(average_period_length(&[]), 5);
    }

    #[test]
    fn average_period_length_rounds_mean() {
        let entries = vec![
            entry(date(2024, 1, 1), 4),
            entry(date(2024, 2, 1), 5),
            entry(date(2024, 3, 1), 7),
        ];
        // mean(4, 5, 7) = 5.33 -> 5
        assert_eq!(average_period_length(&entries), 5);
    }

    #[test]
    fn small_deviation_keeps_stored_average() {
        let entries = vec![entry(date(2024, 1, 1), 30)];
        assert_eq!(recalc_avg_cycle_length(&entries, 30, 28), None);
    }

    #[test]
    fn large_deviation_recomputes_from_last_three() {
        // Prior cycles of 28, 27, 29 days plus a new 35-day one; the
        // stored average was 28, the deviation is 7 > 5, and the new
        // average is round(mean(27, 29, 35)) = 30.
        let entries = vec![
            entry(date(2024, 1, 1), 28),
            entry(date(2024, 2, 1), 27),
            entry(date(2024, 3, 1), 29),
            entry(date(2024, 4, 1), 35),
        ];
        assert_eq!(recalc_avg_cycle_length(&entries, 35, 28), Some(30));
    }

    #[test]
    fn recompute_with_short_history_uses_what_exists() {
        let entries = vec![entry(date(2024, 1, 1), 35)];
        assert_eq!(recalc_avg_cycle_length(&entries, 35, 28), Some(35));
    }
}
