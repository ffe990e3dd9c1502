// Leg construction from provider flight-detail records

use crate::model::Leg;
use crate::provider::{decode_record, value_to_string, RawFlightDetail, RawProviderPayload};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

// Read-only view over the provider's airline code -> display name table.
// Values look like "IndiGo|1|0"; only the part before the first pipe is the name.
#[derive(Debug, Clone, Copy)]
pub struct AirlineDirectory<'a> {
    airlines: &'a HashMap<String, Value>,
}

impl<'a> AirlineDirectory<'a> {
    pub fn new(airlines: &'a HashMap<String, Value>) -> Self {
        Self { airlines }
    }

    // Unknown codes display as the code itself
    pub fn display_name(&self, code: &str) -> String {
        self.airlines
            .get(code)
            .and_then(value_to_string)
            .map(|full| full.split('|').next().unwrap_or_default().trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| code.to_string())
    }
}

// Shared, immutable lookup tables for one payload
#[derive(Debug, Clone, Copy)]
pub struct ProviderIndex<'a> {
    pub airlines: AirlineDirectory<'a>,
    pub flight_details: &'a HashMap<String, Value>,
}

impl<'a> ProviderIndex<'a> {
    pub fn new(payload: &'a RawProviderPayload) -> Self {
        Self {
            airlines: AirlineDirectory::new(&payload.airlines),
            flight_details: &payload.flight_details,
        }
    }

    // Resolve every referenced id, silently dropping the ones that do not resolve
    pub fn resolve_legs(&self, flight_ids: &[String]) -> Vec<Leg> {
        flight_ids
            .iter()
            .filter_map(|id| {
                let leg = self
                    .flight_details
                    .get(id)
                    .and_then(|detail| build_leg(detail, &self.airlines));
                if leg.is_none() {
                    debug!(flight_id = %id, "flight reference did not resolve to a leg");
                }
                leg
            })
            .collect()
    }
}

// Build one leg. A record that is not an object, fails to decode, or lacks the airline
// code, origin, destination or departure time yields None.
pub fn build_leg(detail: &Value, airlines: &AirlineDirectory<'_>) -> Option<Leg> {
    let raw: RawFlightDetail = decode_record(detail, "flight detail")?;

    let airline_code = raw.airline_code?;
    let origin = raw.origin?;
    let destination = raw.destination?;
    let departure_time = raw.departure_time?;

    let fare_class = raw.fare_class.unwrap_or_default();
    let baggage = format!(
        "{} {}",
        raw.baggage_weight.unwrap_or_default(),
        raw.baggage_unit.unwrap_or_default()
    )
    .trim()
    .to_string();

    Some(Leg {
        airline_name: airlines.display_name(&airline_code),
        airline_code,
        flight_number: raw.flight_number.unwrap_or_default(),
        origin,
        destination,
        departure_date: raw.departure_date.unwrap_or_default(),
        departure_time,
        arrival_date: raw.arrival_date.unwrap_or_default(),
        arrival_time: raw.arrival_time.unwrap_or_default(),
        cabin: raw.cabin.unwrap_or_default(),
        booking_code: fare_class.clone(),
        fare_class,
        duration: raw.duration.unwrap_or_default(),
        baggage,
    })
}
