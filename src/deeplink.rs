// Booking deep links.
//
// A link carries the passenger mix, locale/currency constants, the displayed price, one
// block of per-slice parameters and a `SegmentN` micro-format per leg:
//   Origin=DEL,BookingCode=R,Destination=BOM,FlightNumber=2134,Carrier=6E,
//   DepartureDate=2026-01-19T0610,id=1,Cabin=Economy,ArrivalDate=2026-01-19T0825

use crate::config::EngineConfig;
use crate::dates::{clean_time, to_iso_date};
use crate::model::{cabin_label, Itinerary, Leg, Passengers};
use serde::Serialize;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl TripType {
    pub fn as_str(self) -> &'static str {
        match self {
            TripType::OneWay => "OneWay",
            TripType::RoundTrip => "RoundTrip",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeepLinkComposer {
    base_url: String,
    currency: String,
    language: String,
    point_of_sale_country: String,
    passengers: Passengers,
}

impl DeepLinkComposer {
    pub fn new(config: &EngineConfig, passengers: Passengers) -> Self {
        Self {
            base_url: config.endpoints.deep_link_base_url.clone(),
            currency: config.locale.currency.clone(),
            language: config.locale.user_language.clone(),
            point_of_sale_country: config.locale.point_of_sale_country.clone(),
            passengers: passengers.normalized(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Link for one single-direction itinerary. Domestic round trips are booked as two
    // independent one-way links, so the round-trip type only survives internationally.
    pub fn compose(
        &self,
        itinerary: &Itinerary,
        trip_type: TripType,
        is_international: bool,
        default_departure: Option<&str>,
    ) -> String {
        let (Some(first), Some(last)) = (itinerary.first_leg(), itinerary.last_leg()) else {
            return self.base_url.clone();
        };
        let trip_type = if is_international { trip_type } else { TripType::OneWay };

        let price = itinerary
            .selected_fare()
            .map(|fare| if fare.total_fare != 0.0 { fare.total_fare } else { fare.base_fare })
            .map(|value| format!("{:.2}", value))
            .unwrap_or_default();
        let departure = to_iso_date(&first.departure_date, default_departure);

        let mut params = self.header_params(price, trip_type);
        params.extend(slice_params(1, first, last, &departure, false));
        params.push(("cc".to_string(), String::new()));
        params.push(("Slice1".to_string(), slice_ids(1, itinerary.legs.len())));
        params.extend(segment_params(&itinerary.legs, Some(&departure)));

        self.finish(params)
    }

    // True round-trip link for an international pair priced as one unit
    pub fn compose_roundtrip(&self, onward: &Itinerary, inbound: &Itinerary, combo_fare: f64) -> String {
        let (Some(out_first), Some(out_last)) = (onward.first_leg(), onward.last_leg()) else {
            return self.base_url.clone();
        };
        let (Some(in_first), Some(in_last)) = (inbound.first_leg(), inbound.last_leg()) else {
            return self.base_url.clone();
        };

        let onward_departure = to_iso_date(&out_first.departure_date, None);
        let inbound_departure = to_iso_date(&in_first.departure_date, None);

        let mut params = self.header_params(format!("{:.2}", combo_fare), TripType::RoundTrip);
        params.extend(slice_params(1, out_first, out_last, &onward_departure, true));
        params.extend(slice_params(2, in_first, in_last, &inbound_departure, true));
        params.push(("cc".to_string(), String::new()));
        params.push(("Slice1".to_string(), slice_ids(1, onward.legs.len())));
        params.push((
            "Slice2".to_string(),
            slice_ids(onward.legs.len() + 1, inbound.legs.len()),
        ));

        let all_legs: Vec<Leg> = onward.legs.iter().chain(inbound.legs.iter()).cloned().collect();
        params.extend(segment_params(&all_legs, Some(&onward_departure)));

        self.finish(params)
    }

    fn header_params(&self, displayed_price: String, trip_type: TripType) -> Vec<(String, String)> {
        let p = self.passengers;
        vec![
            ("Adult".to_string(), p.adults.to_string()),
            ("Child".to_string(), p.children.to_string()),
            ("Infant".to_string(), p.infants.to_string()),
            ("ReferralId".to_string(), String::new()),
            ("UserLanguage".to_string(), self.language.clone()),
            ("DisplayedPriceCurrency".to_string(), self.currency.clone()),
            ("UserCurrency".to_string(), self.currency.clone()),
            ("DisplayedPrice".to_string(), displayed_price),
            ("PointOfSaleCountry".to_string(), self.point_of_sale_country.clone()),
            ("TripType".to_string(), trip_type.as_str().to_string()),
        ]
    }

    fn finish(&self, params: Vec<(String, String)>) -> String {
        let mut url = match Url::parse(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(base_url = %self.base_url, error = %e, "deep-link base URL does not parse");
                return self.base_url.clone();
            }
        };
        url.query_pairs_mut().extend_pairs(params.iter());
        url.into()
    }
}

// OriginN/DestinationN/DepartureDateN, then cabin, booking code and flight number of the
// slice's first leg. Single-slice links leave those three out when empty.
fn slice_params(
    slice: usize,
    first: &Leg,
    last: &Leg,
    departure: &str,
    keep_empty: bool,
) -> Vec<(String, String)> {
    let mut params = vec![
        (format!("Origin{slice}"), first.origin.clone()),
        (format!("Destination{slice}"), last.destination.clone()),
        (format!("DepartureDate{slice}"), departure.to_string()),
    ];
    let optional = [
        (format!("Cabin{slice}"), cabin_label(&first.cabin)),
        (format!("BookingCode{slice}"), booking_code(first)),
        (format!("FlightNumber{slice}"), first.flight_number.clone()),
    ];
    params.extend(
        optional
            .into_iter()
            .filter(|(_, value)| keep_empty || !value.is_empty()),
    );
    params
}

fn booking_code(leg: &Leg) -> String {
    [&leg.booking_code, &leg.fare_class, &leg.cabin]
        .into_iter()
        .find(|code| !code.is_empty())
        .cloned()
        .unwrap_or_default()
}

// "1,2" for the first slice of a two-leg trip, "3,4" for the next
fn slice_ids(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn segment_params(legs: &[Leg], default_departure: Option<&str>) -> Vec<(String, String)> {
    legs.iter()
        .enumerate()
        .map(|(index, leg)| {
            let id = index + 1;
            (format!("Segment{id}"), segment_value(leg, id, default_departure))
        })
        .collect()
}

pub fn segment_value(leg: &Leg, id: usize, default_departure: Option<&str>) -> String {
    let departure_date = to_iso_date(&leg.departure_date, default_departure);
    let arrival_fallback = Some(departure_date.as_str())
        .filter(|date| !date.is_empty())
        .or(default_departure);
    let arrival_date = to_iso_date(&leg.arrival_date, arrival_fallback);

    let mut parts = vec![
        format!("Origin={}", leg.origin),
        format!("BookingCode={}", booking_code(leg)),
        format!("Destination={}", leg.destination),
        format!("FlightNumber={}", leg.flight_number),
        format!("Carrier={}", leg.airline_code),
    ];

    let departure_base = Some(departure_date.as_str())
        .filter(|date| !date.is_empty())
        .or(default_departure);
    if let Some(date) = departure_base {
        parts.push(format!("DepartureDate={}", timestamp(date, &leg.departure_time)));
    }

    parts.push(format!("id={id}"));

    let cabin = cabin_label(&leg.cabin);
    if !cabin.is_empty() {
        parts.push(format!("Cabin={cabin}"));
    }
    if !arrival_date.is_empty() {
        parts.push(format!("ArrivalDate={}", timestamp(&arrival_date, &leg.arrival_time)));
    }

    parts.join(",")
}

fn timestamp(date: &str, time: &str) -> String {
    let time = clean_time(time);
    if time.is_empty() {
        date.to_string()
    } else {
        format!("{date}T{time}")
    }
}
