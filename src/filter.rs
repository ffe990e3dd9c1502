// Filtering and "fastest" ordering of built itineraries and combos

use crate::model::{Combo, Itinerary, Leg};
use crate::time_window::TimeWindow;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterCriteria {
    pub stops: Option<u32>,
    pub fastest: bool,
    // Some(true) keeps refundable only, Some(false) non-refundable only, None keeps all
    pub refundable: Option<bool>,
    pub departure_window: TimeWindow,
    pub arrival_window: TimeWindow,
    pub airline_names: Vec<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.stops.is_none()
            && !self.fastest
            && self.refundable.is_none()
            && self.departure_window.is_unrestricted()
            && self.arrival_window.is_unrestricted()
            && self.airline_names.iter().all(|name| name.trim().is_empty())
    }

    pub fn matches_stops(&self, itinerary: &Itinerary) -> bool {
        self.stops.map_or(true, |stops| itinerary.total_stops == stops)
    }

    // First leg departs inside the departure window and last leg arrives inside the
    // arrival window. An itinerary without legs has nothing to reject.
    pub fn matches_time_windows(&self, itinerary: &Itinerary) -> bool {
        let (Some(first), Some(last)) = (itinerary.first_leg(), itinerary.last_leg()) else {
            return true;
        };
        self.departure_window.contains(&first.departure_time)
            && self.arrival_window.contains(&last.arrival_time)
    }

    // Case-insensitive substring match of any requested name against the first leg's
    // airline name or code
    pub fn matches_airline(&self, itinerary: &Itinerary) -> bool {
        let names: Vec<String> = self
            .airline_names
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return true;
        }
        let Some(first) = itinerary.first_leg() else {
            return false;
        };
        let airline = first.airline_name.to_lowercase();
        let code = first.airline_code.to_lowercase();
        names
            .iter()
            .any(|name| airline.contains(name.as_str()) || code.contains(name.as_str()))
    }

    pub fn matches_refundable(&self, itinerary: &Itinerary) -> bool {
        self.refundable
            .map_or(true, |wanted| itinerary.is_refundable == wanted)
    }

    pub fn matches(&self, itinerary: &Itinerary) -> bool {
        self.matches_stops(itinerary)
            && self.matches_time_windows(itinerary)
            && self.matches_airline(itinerary)
            && self.matches_refundable(itinerary)
    }

    // Time windows describe the onward journey only; the other filters must hold on
    // both sides.
    pub fn matches_combo(&self, combo: &Combo) -> bool {
        self.matches_time_windows(&combo.onward)
            && [&combo.onward, &combo.inbound].into_iter().all(|side| {
                self.matches_stops(side)
                    && self.matches_airline(side)
                    && self.matches_refundable(side)
            })
    }
}

pub struct FilterSortPipeline<'a> {
    criteria: &'a FilterCriteria,
}

impl<'a> FilterSortPipeline<'a> {
    pub fn new(criteria: &'a FilterCriteria) -> Self {
        Self { criteria }
    }

    pub fn apply(&self, itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
        let mut filtered: Vec<Itinerary> = itineraries
            .into_iter()
            .filter(|itinerary| self.criteria.matches(itinerary))
            .collect();
        if self.criteria.fastest {
            sort_by_duration(&mut filtered, itinerary_duration_minutes);
        }
        filtered
    }

    pub fn apply_combos(&self, combos: Vec<Combo>) -> Vec<Combo> {
        let mut filtered: Vec<Combo> = combos
            .into_iter()
            .filter(|combo| self.criteria.matches_combo(combo))
            .collect();
        if self.criteria.fastest {
            sort_by_duration(&mut filtered, combo_duration_minutes);
        }
        filtered
    }
}

// Stable ascending sort; unknown durations go last
fn sort_by_duration<T>(items: &mut [T], duration: impl Fn(&T) -> Option<u32>) {
    items.sort_by_key(|item| duration(item).map_or(u64::MAX, u64::from));
}

pub fn itinerary_duration_minutes(itinerary: &Itinerary) -> Option<u32> {
    itinerary
        .journey_time
        .as_deref()
        .and_then(duration_to_minutes)
        .or_else(|| sum_leg_durations(&itinerary.legs))
}

pub fn combo_duration_minutes(combo: &Combo) -> Option<u32> {
    itinerary_duration_minutes(&combo.onward)?.checked_add(itinerary_duration_minutes(&combo.inbound)?)
}

// Sum of the readable leg durations; None when none is readable or the sum overflows
fn sum_leg_durations(legs: &[Leg]) -> Option<u32> {
    let mut durations = legs
        .iter()
        .filter_map(|leg| duration_to_minutes(&leg.duration))
        .peekable();
    durations.peek()?;
    durations.try_fold(0u32, u32::checked_add)
}

fn hours_and_minutes(hours: u32, minutes: u32) -> Option<u32> {
    hours.checked_mul(60)?.checked_add(minutes)
}

fn hours_minutes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:(\d+)\s*h)?\s*(\d+)\s*m").expect("static regex compiles"))
}

fn hours_then_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)h(\d+)").expect("static regex compiles"))
}

// "09h 50m", "4h05m", "50m", "09:50", "0950", "2" (hours). Values too large for a
// minute count read as unknown.
pub fn duration_to_minutes(raw: &str) -> Option<u32> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let capture = |caps: &regex::Captures<'_>, index: usize| -> Option<u32> {
        caps.get(index).map_or(Some(0), |m| m.as_str().parse().ok())
    };

    if let Some(caps) = hours_minutes_re().captures(&text) {
        return hours_and_minutes(capture(&caps, 1)?, capture(&caps, 2)?);
    }
    if let Some(caps) = hours_then_digits_re().captures(&text) {
        return hours_and_minutes(capture(&caps, 1)?, capture(&caps, 2)?);
    }

    if let Some((hours, minutes)) = text.split_once(':') {
        let minutes: String = minutes.chars().take(2).collect();
        if let (Ok(h), Ok(m)) = (hours.parse::<u32>(), minutes.parse::<u32>()) {
            return hours_and_minutes(h, m);
        }
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        0 => None,
        1 | 2 => hours_and_minutes(digits.parse().ok()?, 0),
        n => {
            let (hours, minutes) = digits.split_at(n - 2);
            hours_and_minutes(hours.parse().ok()?, minutes.parse().ok()?)
        }
    }
}
