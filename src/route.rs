// Route shape of a search, chosen once per payload. Each shape knows where its bonds
// live, how it encodes stop counts and where its fares come from.

use crate::deeplink::TripType;
use crate::fare::{build_fare_options, segment_total_fare_option};
use crate::model::FareOption;
use crate::provider::{RawBond, RawSegment};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteShape {
    // Any domestic search, one-way or round trip
    Domestic,
    InternationalOneway,
    // Itineraries come from `b`; the priced pairs come from the outbound/inbound blocks
    InternationalRoundtrip,
}

impl RouteShape {
    pub fn select(is_international: bool, is_roundtrip: bool) -> Self {
        match (is_international, is_roundtrip) {
            (false, _) => RouteShape::Domestic,
            (true, false) => RouteShape::InternationalOneway,
            (true, true) => RouteShape::InternationalRoundtrip,
        }
    }

    pub fn is_international(self) -> bool {
        !matches!(self, RouteShape::Domestic)
    }

    pub fn bonds(self, segment: &RawSegment) -> Vec<RawBond> {
        match self {
            RouteShape::InternationalOneway => segment.outbound_block_list(),
            RouteShape::Domestic | RouteShape::InternationalRoundtrip => segment.bond_list(),
        }
    }

    // None when the provider value cannot be read; callers fall back to legs - 1
    pub fn stops(self, bond: &RawBond) -> Option<u32> {
        match self {
            RouteShape::InternationalOneway => bond.stops_label.as_deref().and_then(parse_stops_label),
            RouteShape::Domestic | RouteShape::InternationalRoundtrip => bond
                .stops
                .as_deref()
                .and_then(|raw| raw.trim().parse::<u32>().ok()),
        }
    }

    pub fn fare_options(self, segment: &RawSegment) -> Vec<FareOption> {
        match self {
            RouteShape::InternationalOneway => vec![segment_total_fare_option(
                segment.total_fare.as_ref(),
                segment.discount_flag.as_ref(),
                segment.discount_amount.as_ref(),
            )],
            RouteShape::Domestic | RouteShape::InternationalRoundtrip => build_fare_options(
                &segment.raw_fares(),
                segment.discount_flag.as_ref(),
                segment.discount_amount.as_ref(),
            ),
        }
    }

    // International round trips surface their return side through combos only
    pub fn builds_return_itineraries(self) -> bool {
        !matches!(self, RouteShape::InternationalRoundtrip)
    }

    pub fn pairs_combos(self) -> bool {
        matches!(self, RouteShape::InternationalRoundtrip)
    }

    // Domestic round trips are booked as two independent one-way links
    pub fn itinerary_trip_type(self, is_roundtrip: bool) -> TripType {
        match self {
            RouteShape::Domestic => TripType::OneWay,
            _ if is_roundtrip => TripType::RoundTrip,
            _ => TripType::OneWay,
        }
    }
}

// "Non-Stop" -> 0, "1-Stop" -> 1, "|2+Stops" -> 2
pub fn parse_stops_label(label: &str) -> Option<u32> {
    let head = label.split(|c| c == '-' || c == '+').next().unwrap_or_default();
    let head = head.replace('|', "");
    let head = head.trim();
    if head.eq_ignore_ascii_case("non") {
        return Some(0);
    }
    head.parse::<u32>().ok()
}
