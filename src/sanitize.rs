use chrono::{Datelike, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 100, day % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    }
}

/// Formats a `YYYY-MM-DD` key for display, e.g. `Saturday, Mar 4th 2023`.
///
/// Keys that don't parse as a calendar date are passed through unchanged.
pub fn sanitize_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map(|d| {
            format!(
                "{} {}{} {}",
                d.format("%A, %b"),
                d.day(),
                ordinal_suffix(d.day()),
                d.format("%Y")
            )
        })
        .unwrap_or_else(|_| date.to_string())
}

/// Topic names can't contain `+`, which shows up in URL-escaped squadron ids.
pub fn sanitize_squadron(squadron: &str) -> String {
    squadron.replace('+', "-")
}

/// True when `haystack` contains `needle`, ignoring case. Order matters.
pub fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
