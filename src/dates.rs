// Provider and front-end date/time formats

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

// Formats the provider uses for leg and calendar dates
const PROVIDER_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%a-%d%b%Y", "%d-%b-%Y", "%d%b%Y", "%d/%m/%Y"];

// Formats accepted for the listing page's dd/mm/YYYY dates
const LISTING_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d-%b-%Y", "%d%b%Y"];

pub fn parse_provider_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    PROVIDER_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

// ISO date for a provider date. Empty input gives the fallback; unparseable input gives
// the fallback when there is one, otherwise the raw text.
pub fn to_iso_date(raw: &str, fallback: Option<&str>) -> String {
    if raw.trim().is_empty() {
        return fallback.unwrap_or_default().to_string();
    }
    match parse_provider_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => fallback.unwrap_or(raw).to_string(),
    }
}

// dd/mm/YYYY, or the trimmed input when no format matches
pub fn to_listing_date(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }
    LISTING_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| text.to_string())
}

pub fn is_iso_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok()
}

// "06:10" -> "0610"
pub fn clean_time(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

// Combine a provider date with an HHMM-ish clock time. Needs at least four digits.
pub fn provider_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = parse_provider_date(date)?;
    let digits = clean_time(time);
    if digits.len() < 4 {
        return None;
    }
    let hour = digits[..2].parse::<u32>().ok()?;
    let minute = digits[2..4].parse::<u32>().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(date.and_time(time))
}
