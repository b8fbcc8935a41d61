//! Occupancy-permit validity window.
//!
//! Completing stage 6 of a zeladoria process grants the custodian a
//! two-year occupancy permit. The frontend shows a traffic-light band
//! for how much of the window remains.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Length of the permit validity window, counted from stage-6 completion.
pub const VALIDITY_MONTHS: u32 = 24;

/// Days of remaining validity at or above which the permit is not yet
/// flagged for renewal.
pub const WARNING_THRESHOLD_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PermitBand {
    Ok,
    Warning,
    Expired,
}

/// Permit validity summary attached to a process detail response.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PermitStatus {
    #[ts(type = "string")]
    pub granted_on: NaiveDate,
    #[ts(type = "string")]
    pub expires_on: NaiveDate,
    pub remaining_days: i64,
    pub band: PermitBand,
}

/// End of the validity window for a permit granted on `granted_on`.
pub fn expiry_date(granted_on: NaiveDate) -> NaiveDate {
    // Months::new never fails for the fixed window; checked_add_months
    // only returns None on out-of-range dates far beyond any SEI record.
    granted_on
        .checked_add_months(Months::new(VALIDITY_MONTHS))
        .unwrap_or(granted_on)
}

/// Remaining whole days of validity; negative once expired.
pub fn remaining_days(expires_on: NaiveDate, today: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

/// Bands the remaining validity: >= 90 days ok, 0-89 warning, negative expired.
pub fn band(remaining: i64) -> PermitBand {
    if remaining >= WARNING_THRESHOLD_DAYS {
        PermitBand::Ok
    } else if remaining >= 0 {
        PermitBand::Warning
    } else {
        PermitBand::Expired
    }
}

/// Full permit status for a permit granted on `granted_on`, as of `today`.
pub fn status(granted_on: NaiveDate, today: NaiveDate) -> PermitStatus {
    let expires_on = expiry_date(granted_on);
    let remaining = remaining_days(expires_on, today);
    PermitStatus {
        granted_on,
        expires_on,
        remaining_days: remaining,
        band: band(remaining),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_is_two_years_out() {
        assert_eq!(expiry_date(date(2024, 2, 5)), date(2026, 2, 5));
        // Feb 29 lands on Feb 28 of the non-leap target year.
        assert_eq!(expiry_date(date(2024, 2, 29)), date(2026, 2, 28));
    }

    #[test]
    fn test_banding_boundaries() {
        assert_eq!(band(90), PermitBand::Ok);
        assert_eq!(band(89), PermitBand::Warning);
        assert_eq!(band(0), PermitBand::Warning);
        assert_eq!(band(-1), PermitBand::Expired);
    }

    #[test]
    fn test_status_counts_days_to_expiry() {
        let st = status(date(2024, 1, 1), date(2024, 1, 1));
        assert_eq!(st.expires_on, date(2026, 1, 1));
        assert_eq!(st.remaining_days, 731); // 2024 is a leap year
        assert_eq!(st.band, PermitBand::Ok);

        let st = status(date(2024, 1, 1), date(2026, 1, 2));
        assert_eq!(st.remaining_days, -1);
        assert_eq!(st.band, PermitBand::Expired);
    }
}
