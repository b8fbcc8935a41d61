//! Water-consumption arithmetic.
//!
//! A school submits one meter reading per day. The day's consumption is
//! the difference to the previous reading of the same calendar month;
//! the first reading of a month establishes a baseline and counts as
//! zero consumption. The allowed daily volume is proportional to the
//! school's population.

use chrono::{Datelike, NaiveDate};

/// Allowed daily volume per person, in cubic meters.
pub const PER_CAPITA_COEFFICIENT: f64 = 0.008;

/// Returns true when both dates fall in the same calendar month.
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Allowed daily consumption for a school of the given population.
pub fn allowed_daily_limit(population: i32) -> f64 {
    population as f64 * PER_CAPITA_COEFFICIENT
}

/// Daily consumption derived from the current meter value and the
/// previous same-month reading, if any. The first reading of a month
/// has no baseline and is reported as zero regardless of meter value.
pub fn daily_consumption(previous_meter: Option<f64>, current_meter: f64) -> f64 {
    match previous_meter {
        Some(prev) => current_meter - prev,
        None => 0.0,
    }
}

/// Derived values stored on a water reading row.
#[derive(Debug, PartialEq)]
pub struct DerivedReading {
    pub consumption: f64,
    pub daily_limit: f64,
    pub over_limit: bool,
}

/// Computes the stored consumption figures for a new reading.
///
/// `previous` is the most recent earlier reading of the same school,
/// as a (date, meter value) pair; it only acts as a baseline when it
/// belongs to the same calendar month as `reading_date`. The over-limit
/// flag is meaningful only once a baseline exists.
pub fn derive_reading(
    previous: Option<(NaiveDate, f64)>,
    reading_date: NaiveDate,
    meter_value: f64,
    population: i32,
) -> DerivedReading {
    let baseline = previous
        .filter(|(prev_date, _)| same_month(*prev_date, reading_date))
        .map(|(_, prev_meter)| prev_meter);

    let consumption = daily_consumption(baseline, meter_value);
    let daily_limit = allowed_daily_limit(population);
    let over_limit = baseline.is_some() && consumption > daily_limit;

    DerivedReading {
        consumption,
        daily_limit,
        over_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_month() {
        assert!(same_month(date(2025, 3, 1), date(2025, 3, 31)));
        assert!(!same_month(date(2025, 3, 31), date(2025, 4, 1)));
        assert!(!same_month(date(2024, 3, 10), date(2025, 3, 10)));
    }

    #[test]
    fn test_consumption_within_month() {
        let derived = derive_reading(Some((date(2025, 3, 10), 500.0)), date(2025, 3, 11), 520.0, 1000);
        assert_eq!(derived.consumption, 20.0);
        assert_eq!(derived.daily_limit, 8.0);
        assert!(derived.over_limit);
    }

    #[test]
    fn test_first_reading_of_month_is_zero() {
        // A March baseline must not carry into April, whatever the meter says.
        let derived = derive_reading(Some((date(2025, 3, 31), 500.0)), date(2025, 4, 1), 900.0, 100);
        assert_eq!(derived.consumption, 0.0);
        assert!(!derived.over_limit);
    }

    #[test]
    fn test_first_reading_ever_is_zero() {
        let derived = derive_reading(None, date(2025, 4, 1), 12345.0, 100);
        assert_eq!(derived.consumption, 0.0);
        assert!(!derived.over_limit);
    }

    #[test]
    fn test_over_limit_boundary() {
        // Consumption exactly at the limit is not over it.
        let derived = derive_reading(Some((date(2025, 5, 2), 100.0)), date(2025, 5, 3), 108.0, 1000);
        assert_eq!(derived.consumption, 8.0);
        assert_eq!(derived.daily_limit, 8.0);
        assert!(!derived.over_limit);

        let derived = derive_reading(Some((date(2025, 5, 2), 100.0)), date(2025, 5, 3), 108.1, 1000);
        assert!(derived.over_limit);
    }

    #[test]
    fn test_meter_swap_yields_negative_consumption() {
        // A replaced meter can run below the old baseline; the raw
        // difference is kept and never flags over-limit.
        let derived = derive_reading(Some((date(2025, 5, 2), 900.0)), date(2025, 5, 3), 10.0, 50);
        assert_eq!(derived.consumption, -890.0);
        assert!(!derived.over_limit);
    }
}
