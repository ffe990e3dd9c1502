// Single-direction itineraries from provider segments

use crate::deeplink::DeepLinkComposer;
use crate::leg::ProviderIndex;
use crate::model::{Direction, Itinerary, SearchContext};
use crate::provider::{decode_record, RawProviderPayload, RawSegment};
use crate::route::RouteShape;
use serde_json::Value;
use tracing::debug;

pub struct ItineraryBuilder<'a> {
    index: ProviderIndex<'a>,
    shape: RouteShape,
    context: &'a SearchContext,
    links: &'a DeepLinkComposer,
}

impl<'a> ItineraryBuilder<'a> {
    pub fn new(
        index: ProviderIndex<'a>,
        shape: RouteShape,
        context: &'a SearchContext,
        links: &'a DeepLinkComposer,
    ) -> Self {
        Self {
            index,
            shape,
            context,
            links,
        }
    }

    // Outbound and return itineraries of the whole payload, in provider order.
    // Journeys past the first are read only for round trips.
    pub fn build_all(&self, payload: &RawProviderPayload) -> (Vec<Itinerary>, Vec<Itinerary>) {
        let mut outbound = Vec::new();
        let mut inbound = Vec::new();

        for (journey_index, segments) in payload.journey_segments().enumerate() {
            let wanted = match journey_index {
                0 => true,
                1 => self.context.is_roundtrip() && self.shape.builds_return_itineraries(),
                _ => false,
            };
            if !wanted {
                continue;
            }

            for segment in &segments {
                let Some(itinerary) = self.build(segment, journey_index) else {
                    continue;
                };
                match itinerary.direction {
                    Direction::Outbound => outbound.push(itinerary),
                    Direction::Return => inbound.push(itinerary),
                }
            }
        }

        (outbound, inbound)
    }

    // One itinerary from the segment's first bond. A segment without bonds or without a
    // single resolvable leg yields nothing.
    pub fn build(&self, segment: &Value, journey_index: usize) -> Option<Itinerary> {
        let segment: RawSegment = decode_record(segment, "segment")?;
        let direction = Direction::from_journey_index(journey_index);

        let Some(bond) = self.shape.bonds(&segment).into_iter().next() else {
            debug!(segment_id = ?segment.id, "segment has no bonds");
            return None;
        };

        let legs = self.index.resolve_legs(&bond.flight_ids());
        let (Some(first), Some(last)) = (legs.first(), legs.last()) else {
            debug!(segment_id = ?segment.id, "segment resolved to zero legs");
            return None;
        };
        let origin = first.origin.clone();
        let destination = last.destination.clone();

        let total_stops = self
            .shape
            .stops(&bond)
            .unwrap_or_else(|| legs.len().saturating_sub(1) as u32);
        let is_refundable = bond
            .refundable_flag()
            .or_else(|| segment.refundable_flag())
            .unwrap_or(false);

        let mut itinerary = Itinerary {
            segment_id: segment.id.clone(),
            segment_key: segment.segment_key.clone(),
            direction,
            origin,
            destination,
            journey_time: bond.journey_time.clone(),
            legs,
            total_stops,
            is_refundable,
            fare_options: self.shape.fare_options(&segment),
            deep_link: String::new(),
        };

        itinerary.deep_link = self.links.compose(
            &itinerary,
            self.shape.itinerary_trip_type(self.context.is_roundtrip()),
            self.shape.is_international(),
            self.context.default_departure(direction),
        );
        Some(itinerary)
    }
}
