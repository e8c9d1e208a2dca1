//! Static Istanbul delivery calendar.
//!
//! Each side of the city has its own weekday -> district plan. Sunday has no
//! entry in either plan.

use crate::calendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Anadolu,
    Avrupa,
}

const ANADOLU: [&[&str]; 6] = [
    &["Maltepe", "Kartal", "Pendik", "Tuzla"],
    &["Üsküdar", "Kadıköy", "Ataşehir", "Ümraniye"],
    &["Üsküdar", "Kadıköy", "Ataşehir", "Ümraniye"],
    &["Üsküdar", "Kadıköy", "Ataşehir", "Ümraniye"],
    &["Maltepe", "Kartal", "Pendik", "Sultanbeyli"],
    &["Sancaktepe", "Çekmeköy", "Beykoz", "Şile"],
];

const AVRUPA: [&[&str]; 6] = [
    &["Beyoğlu", "Şişli", "Beşiktaş", "Kağıthane"],
    &[
        "Sarıyer",
        "Bakırköy",
        "Bahçelievler",
        "Güngören",
        "Esenler",
        "Bağcılar",
    ],
    &["Beyoğlu", "Şişli", "Beşiktaş", "Kağıthane"],
    &[
        "Eyüpsultan",
        "Gaziosmanpaşa",
        "Küçükçekmece",
        "Avcılar",
        "Başakşehir",
        "Sultangazi",
        "Arnavutköy",
    ],
    &["Fatih", "Zeytinburnu", "Bayrampaşa"],
    &["Esenyurt", "Beylikdüzü", "Silivri", "Çatalca"],
];

/// District -> allowed day names, as shown to users. Mirrors the regional plans.
const ALLOWED_DAYS: &[(&str, &[&str])] = &[
    ("Maltepe", &["Pazartesi", "Cuma"]),
    ("Kartal", &["Pazartesi", "Cuma"]),
    ("Pendik", &["Pazartesi", "Cuma"]),
    ("Tuzla", &["Pazartesi"]),
    ("Sultanbeyli", &["Cuma"]),
    ("Üsküdar", &["Salı", "Çarşamba", "Perşembe"]),
    ("Kadıköy", &["Salı", "Çarşamba", "Perşembe"]),
    ("Ataşehir", &["Salı", "Çarşamba", "Perşembe"]),
    ("Ümraniye", &["Salı", "Çarşamba", "Perşembe"]),
    ("Sancaktepe", &["Cumartesi"]),
    ("Çekmeköy", &["Cumartesi"]),
    ("Beykoz", &["Cumartesi"]),
    ("Şile", &["Cumartesi"]),
    ("Beyoğlu", &["Pazartesi", "Çarşamba"]),
    ("Şişli", &["Pazartesi", "Çarşamba"]),
    ("Beşiktaş", &["Pazartesi", "Çarşamba"]),
    ("Kağıthane", &["Pazartesi", "Çarşamba"]),
    ("Sarıyer", &["Salı"]),
    ("Bakırköy", &["Salı"]),
    ("Bahçelievler", &["Salı"]),
    ("Güngören", &["Salı"]),
    ("Esenler", &["Salı"]),
    ("Bağcılar", &["Salı"]),
    ("Eyüpsultan", &["Perşembe"]),
    ("Gaziosmanpaşa", &["Perşembe"]),
    ("Küçükçekmece", &["Perşembe"]),
    ("Avcılar", &["Perşembe"]),
    ("Başakşehir", &["Perşembe"]),
    ("Sultangazi", &["Perşembe"]),
    ("Arnavutköy", &["Perşembe"]),
    ("Fatih", &["Cuma"]),
    ("Zeytinburnu", &["Cuma"]),
    ("Bayrampaşa", &["Cuma"]),
    ("Esenyurt", &["Cumartesi"]),
    ("Beylikdüzü", &["Cumartesi"]),
    ("Silivri", &["Cumartesi"]),
    ("Çatalca", &["Cumartesi"]),
];

fn plan(region: Region) -> &'static [&'static [&'static str]; 6] {
    match region {
        Region::Anadolu => &ANADOLU,
        Region::Avrupa => &AVRUPA,
    }
}

/// Districts a region serves on `weekday`; empty on Sunday or out of range.
pub fn districts_for(region: Region, weekday: u8) -> &'static [&'static str] {
    plan(region)
        .get(weekday as usize)
        .copied()
        .unwrap_or_default()
}

/// Whether either region delivers to `district` on `weekday`.
pub fn is_compatible(district: &str, weekday: u8) -> bool {
    [Region::Anadolu, Region::Avrupa]
        .iter()
        .any(|region| districts_for(*region, weekday).contains(&district))
}

/// Allowed day names for a district; unknown districts get none.
pub fn allowed_days_for(district: &str) -> &'static [&'static str] {
    ALLOWED_DAYS
        .iter()
        .find(|(name, _)| *name == district)
        .map(|(_, days)| *days)
        .unwrap_or_default()
}

pub fn allowed_weekdays_for(district: &str) -> Vec<u8> {
    allowed_days_for(district)
        .iter()
        .filter_map(|day| calendar::weekday_from_name(day))
        .collect()
}
