//! Weekday numbering and names used by the scheduling rules.
//!
//! Weekdays are numbered Monday = 0 through Sunday = 6. Sunday is the only
//! non-working day.

use chrono::{Datelike, NaiveDate};

/// Sunday.
pub const NON_WORKING_WEEKDAY: u8 = 6;

const DAY_NAMES: [&str; 7] = [
    "Pazartesi",
    "Salı",
    "Çarşamba",
    "Perşembe",
    "Cuma",
    "Cumartesi",
    "Pazar",
];

pub fn weekday_of(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Display name for a weekday index, `None` outside 0-6.
pub fn day_name(weekday: u8) -> Option<&'static str> {
    DAY_NAMES.get(weekday as usize).copied()
}

/// Reverse of [`day_name`].
pub fn weekday_from_name(name: &str) -> Option<u8> {
    DAY_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .map(|idx| idx as u8)
}

pub fn is_non_working(date: NaiveDate) -> bool {
    weekday_of(date) == NON_WORKING_WEEKDAY
}

pub(crate) fn date_day_name(date: NaiveDate) -> String {
    day_name(weekday_of(date)).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_is_zero_and_sunday_is_six() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
        assert_eq!(weekday_of(monday), 0);
        assert_eq!(weekday_of(sunday), NON_WORKING_WEEKDAY);
        assert!(is_non_working(sunday));
        assert!(!is_non_working(monday));
    }

    #[test]
    fn names_round_trip() {
        for weekday in 0..7u8 {
            let name = day_name(weekday).unwrap();
            assert_eq!(weekday_from_name(name), Some(weekday));
        }
        assert_eq!(day_name(7), None);
        assert_eq!(day_name(2), Some("Çarşamba"));
    }
}
