// Alternate-destination hints shown when a search comes back empty

use crate::dates::to_iso_date;
use crate::model::CalendarSuggestion;
use crate::provider::{decode_record, RawCalendarFare};
use serde_json::Value;
use std::cmp::Ordering;

pub const MAX_CALENDAR_SUGGESTIONS: usize = 3;

// Nearest (then cheapest) alternates first; entries without a destination code are dropped
pub fn build_calendar_suggestions(raw: &[Value]) -> Vec<CalendarSuggestion> {
    let mut suggestions: Vec<CalendarSuggestion> = raw
        .iter()
        .filter_map(|item| decode_record::<RawCalendarFare>(item, "calendar fare"))
        .filter_map(|fare| {
            Some(CalendarSuggestion {
                destination: fare.destination?,
                destination_name: fare.destination_name,
                distance: fare.distance,
                total_fare: fare.total_fare,
                departure_date: fare.departure_date.map(|date| to_iso_date(&date, None)),
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        missing_last(a.distance, b.distance).then_with(|| missing_last(a.total_fare, b.total_fare))
    });
    suggestions.truncate(MAX_CALENDAR_SUGGESTIONS);
    suggestions
}

fn missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    let key = |v: Option<f64>| v.unwrap_or(f64::INFINITY);
    key(a).total_cmp(&key(b))
}
