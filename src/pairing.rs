// Domestic round-trip pairing: keep only the outbound/return itineraries that can be
// combined, leaving enough time on the ground between them.

use crate::dates::provider_datetime;
use crate::model::Itinerary;
use chrono::Duration;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DomesticPairing {
    pub outbound: Vec<Itinerary>,
    pub inbound: Vec<Itinerary>,
    // indices into `outbound` / `inbound` above
    pub pairs: Vec<(usize, usize)>,
}

// The return must leave strictly more than `min_turnaround_hours` after the outbound
// lands. Missing or unreadable dates never pair.
pub fn is_valid_domestic_pair(outbound: &Itinerary, inbound: &Itinerary, min_turnaround_hours: i64) -> bool {
    let (Some(landing), Some(takeoff)) = (outbound.last_leg(), inbound.first_leg()) else {
        return false;
    };
    let arrival = provider_datetime(&landing.arrival_date, &landing.arrival_time);
    let departure = provider_datetime(&takeoff.departure_date, &takeoff.departure_time);
    match (arrival, departure) {
        (Some(arrival), Some(departure)) => departure - arrival > Duration::hours(min_turnaround_hours),
        _ => false,
    }
}

// Reorder both lists so that itineraries taking part in a valid pair come first, in pair
// order, and drop the rest. No valid pair empties both lists.
pub fn pair_domestic_roundtrips(
    outbound: Vec<Itinerary>,
    inbound: Vec<Itinerary>,
    min_turnaround_hours: i64,
) -> DomesticPairing {
    let raw_pairs: Vec<(usize, usize)> = outbound
        .iter()
        .enumerate()
        .flat_map(|(o, out)| {
            inbound
                .iter()
                .enumerate()
                .filter(move |(_, inb)| is_valid_domestic_pair(out, inb, min_turnaround_hours))
                .map(move |(r, _)| (o, r))
        })
        .collect();

    if raw_pairs.is_empty() {
        return DomesticPairing::default();
    }

    let mut outbound_slots: Vec<Option<Itinerary>> = outbound.into_iter().map(Some).collect();
    let mut inbound_slots: Vec<Option<Itinerary>> = inbound.into_iter().map(Some).collect();
    let mut outbound_position = HashMap::new();
    let mut inbound_position = HashMap::new();
    let mut result = DomesticPairing::default();

    for (o, r) in raw_pairs {
        let out_at = *outbound_position.entry(o).or_insert_with(|| {
            if let Some(itinerary) = outbound_slots[o].take() {
                result.outbound.push(itinerary);
            }
            result.outbound.len() - 1
        });
        let in_at = *inbound_position.entry(r).or_insert_with(|| {
            if let Some(itinerary) = inbound_slots[r].take() {
                result.inbound.push(itinerary);
            }
            result.inbound.len() - 1
        });
        result.pairs.push((out_at, in_at));
    }

    result
}
