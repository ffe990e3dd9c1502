// Normalized flight-search entities. Everything here is built fresh for one search and
// never mutated after construction.

use crate::filter::FilterCriteria;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CabinClass {
    #[default]
    Economy = 0,
    First = 1,
    Business = 2,
    PremiumEconomy = 4,
}

impl CabinClass {
    // Resolve free text like "biz", "premium economy" or "coach"
    pub fn resolve(text: Option<&str>) -> Self {
        let Some(text) = text.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) else {
            return CabinClass::Economy;
        };
        let contains_any = |keys: &[&str]| keys.iter().any(|k| text.contains(k));

        if contains_any(&["business", "biz", "buss"]) {
            CabinClass::Business
        } else if contains_any(&["first"]) {
            CabinClass::First
        } else if contains_any(&["premium", "prem"]) {
            CabinClass::PremiumEconomy
        } else {
            CabinClass::Economy
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CabinClass::Economy => "Economy",
            CabinClass::First => "First Class",
            CabinClass::Business => "Business",
            CabinClass::PremiumEconomy => "Premium Economy",
        }
    }
}

// Map a leg's single-letter cabin code to the label the booking front end expects
pub fn cabin_label(cabin: &str) -> String {
    let trimmed = cabin.trim();
    match trimmed.to_uppercase().as_str() {
        "" => String::new(),
        "E" | "Y" => "Economy".to_string(),
        "W" | "S" => "Premium Economy".to_string(),
        "C" | "J" => "Business".to_string(),
        "F" | "P" => "First".to_string(),
        _ => title_case(trimmed),
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Passenger counts as requested. Counts are signed because callers may hand over
// unchecked input; `normalized` replaces negatives with the defaults (1 adult, 0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passengers {
    pub adults: i32,
    pub children: i32,
    pub infants: i32,
}

impl Default for Passengers {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
            infants: 0,
        }
    }
}

impl Passengers {
    pub fn normalized(&self) -> Self {
        let or_default = |value: i32, default: i32| if value >= 0 { value } else { default };
        Self {
            adults: or_default(self.adults, 1),
            children: or_default(self.children, 0),
            infants: or_default(self.infants, 0),
        }
    }

    // "A-C-I" form used by the listing page
    pub fn listing_token(&self) -> String {
        let p = self.normalized();
        format!("{}-{}-{}", p.adults, p.children, p.infants)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityInfo {
    pub code: String,
    pub country: String,
    pub display_name: String,
}

impl CityInfo {
    // What a failed lookup degrades to: the raw input everywhere, no country
    pub fn echo(raw: &str) -> Self {
        Self {
            code: raw.to_string(),
            country: String::new(),
            display_name: raw.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchContext {
    pub origin: CityInfo,
    pub destination: CityInfo,
    pub outbound_date: String,
    pub return_date: Option<String>,
    pub passengers: Passengers,
    pub cabin: CabinClass,
    pub fare_type: u8,
    pub is_international: bool,
    pub filters: FilterCriteria,
}

impl SearchContext {
    pub fn is_roundtrip(&self) -> bool {
        self.return_date
            .as_deref()
            .map_or(false, |date| !date.trim().is_empty())
    }

    // The calendar date a leg in the given direction defaults to
    pub fn default_departure(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Outbound => Some(self.outbound_date.as_str()),
            Direction::Return => self.return_date.as_deref(),
        }
        .filter(|date| !date.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Return,
}

impl Direction {
    pub fn from_journey_index(index: usize) -> Self {
        if index == 0 {
            Direction::Outbound
        } else {
            Direction::Return
        }
    }
}

// One physical flight
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Leg {
    pub airline_code: String,
    pub airline_name: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub departure_time: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub cabin: String,
    pub fare_class: String,
    pub booking_code: String,
    pub duration: String,
    pub baggage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FareOption {
    pub fare_id: Option<String>,
    pub fare_name: Option<String>,
    pub base_fare: f64,
    pub total_fare: f64,
    pub total_tax: f64,
    pub discount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub segment_id: Option<String>,
    // provider key needed later for price locking
    pub segment_key: Option<String>,
    pub direction: Direction,
    pub origin: String,
    pub destination: String,
    pub journey_time: Option<String>,
    pub legs: Vec<Leg>,
    pub total_stops: u32,
    pub is_refundable: bool,
    pub fare_options: Vec<FareOption>,
    pub deep_link: String,
}

impl Itinerary {
    pub fn first_leg(&self) -> Option<&Leg> {
        self.legs.first()
    }

    pub fn last_leg(&self) -> Option<&Leg> {
        self.legs.last()
    }

    // Index 0 is the selected fare unless the caller picks another
    pub fn selected_fare(&self) -> Option<&FareOption> {
        self.fare_options.first()
    }

    pub fn cheapest_fare(&self) -> Option<f64> {
        self.fare_options
            .iter()
            .map(|fare| fare.total_fare)
            .filter(|total| total.is_finite())
            .reduce(f64::min)
    }

    pub fn summary(&self) -> ItinerarySummary {
        ItinerarySummary::from(self)
    }
}

// International round trip priced as one unit
#[derive(Debug, Clone, Serialize)]
pub struct Combo {
    pub id: String,
    #[serde(rename = "onward_flight")]
    pub onward: Itinerary,
    #[serde(rename = "return_flight")]
    pub inbound: Itinerary,
    pub combo_fare: f64,
    pub deep_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarSuggestion {
    pub destination: String,
    pub destination_name: Option<String>,
    pub distance: Option<f64>,
    pub total_fare: Option<f64>,
    pub departure_date: Option<String>,
}

// Flattened view of an itinerary for chat/web renderers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItinerarySummary {
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub departure_date: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_date: Option<String>,
    pub arrival_time: Option<String>,
    pub duration: Option<String>,
    pub stops: u32,
    pub stop_airports: Vec<String>,
}

impl From<&Itinerary> for ItinerarySummary {
    fn from(itinerary: &Itinerary) -> Self {
        let (Some(first), Some(last)) = (itinerary.first_leg(), itinerary.last_leg()) else {
            return ItinerarySummary {
                duration: itinerary.journey_time.clone(),
                stops: itinerary.total_stops,
                ..Default::default()
            };
        };

        let flight_numbers = itinerary
            .legs
            .iter()
            .filter(|leg| !leg.flight_number.is_empty())
            .map(|leg| format!("{}{}", leg.airline_code, leg.flight_number))
            .collect::<Vec<_>>()
            .join(" / ");

        let stop_airports = itinerary.legs[..itinerary.legs.len() - 1]
            .iter()
            .map(|leg| leg.destination.clone())
            .collect();

        ItinerarySummary {
            airline: Some(first.airline_name.clone()),
            flight_number: Some(flight_numbers),
            departure_city: Some(first.origin.clone()),
            arrival_city: Some(last.destination.clone()),
            departure_date: Some(first.departure_date.clone()),
            departure_time: Some(first.departure_time.clone()),
            arrival_date: Some(last.arrival_date.clone()),
            arrival_time: Some(last.arrival_time.clone()),
            duration: itinerary.journey_time.clone(),
            stops: itinerary.total_stops,
            stop_airports,
        }
    }
}

// Structured result handed to the renderer/chat layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub origin: String,
    pub destination: String,
    pub outbound_date: String,
    pub return_date: Option<String>,
    pub cabin: String,
    pub outbound_itineraries: Vec<Itinerary>,
    // empty for international round trips
    pub return_itineraries: Vec<Itinerary>,
    // empty unless international round trip
    pub international_combos: Vec<Combo>,
    // (outbound index, return index) pairs when domestic round-trip pairing ran
    pub domestic_pairs: Vec<(usize, usize)>,
    pub is_roundtrip: bool,
    pub is_international: bool,
    pub view_all_link: Option<String>,
    pub calendar_suggestions: Vec<CalendarSuggestion>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.outbound_itineraries.is_empty()
            && self.return_itineraries.is_empty()
            && self.international_combos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, CabinClass::Economy; "missing text")]
    #[test_case(Some("Biz"), CabinClass::Business; "business shorthand")]
    #[test_case(Some("first class"), CabinClass::First; "first")]
    #[test_case(Some("Premium Economy"), CabinClass::PremiumEconomy; "premium")]
    #[test_case(Some("coach"), CabinClass::Economy; "coach")]
    #[test_case(Some("luxury"), CabinClass::Economy; "unknown falls back")]
    fn test_cabin_resolution(text: Option<&str>, expected: CabinClass) {
        assert_eq!(CabinClass::resolve(text), expected);
    }

    #[test]
    fn test_cabin_codes_and_names() {
        assert_eq!(CabinClass::PremiumEconomy.code(), 4);
        assert_eq!(CabinClass::Business.code(), 2);
        assert_eq!(CabinClass::First.display_name(), "First Class");
    }

    #[test]
    fn test_cabin_label() {
        assert_eq!(cabin_label("Y"), "Economy");
        assert_eq!(cabin_label(" j "), "Business");
        assert_eq!(cabin_label("W"), "Premium Economy");
        assert_eq!(cabin_label("premium plus"), "Premium Plus");
        assert_eq!(cabin_label(""), "");
    }

    #[test]
    fn test_passenger_normalization() {
        let raw = Passengers {
            adults: -2,
            children: -1,
            infants: -3,
        };
        assert_eq!(raw.normalized(), Passengers::default());
        assert_eq!(raw.listing_token(), "1-0-0");

        let family = Passengers {
            adults: 2,
            children: 1,
            infants: 0,
        };
        assert_eq!(family.listing_token(), "2-1-0");
    }

    fn leg(origin: &str, destination: &str, number: &str) -> Leg {
        Leg {
            airline_code: "AI".to_string(),
            airline_name: "Air India".to_string(),
            flight_number: number.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_time: "0610".to_string(),
            arrival_time: "1130".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_lists_stop_airports() {
        let itinerary = Itinerary {
            segment_id: None,
            segment_key: None,
            direction: Direction::Outbound,
            origin: "DEL".to_string(),
            destination: "LHR".to_string(),
            journey_time: Some("12h 05m".to_string()),
            legs: vec![leg("DEL", "BOM", "101"), leg("BOM", "LHR", "131")],
            total_stops: 1,
            is_refundable: false,
            fare_options: vec![],
            deep_link: String::new(),
        };

        let summary = itinerary.summary();
        assert_eq!(summary.flight_number.as_deref(), Some("AI101 / AI131"));
        assert_eq!(summary.stop_airports, vec!["BOM".to_string()]);
        assert_eq!(summary.departure_city.as_deref(), Some("DEL"));
        assert_eq!(summary.arrival_city.as_deref(), Some("LHR"));
        assert_eq!(summary.stops, 1);
    }

    #[test]
    fn test_roundtrip_detection() {
        let mut context = SearchContext {
            outbound_date: "2026-01-19".to_string(),
            ..Default::default()
        };
        assert!(!context.is_roundtrip());
        context.return_date = Some(" ".to_string());
        assert!(!context.is_roundtrip());
        context.return_date = Some("2026-01-24".to_string());
        assert!(context.is_roundtrip());
        assert_eq!(context.default_departure(Direction::Return), Some("2026-01-24"));
    }
}
