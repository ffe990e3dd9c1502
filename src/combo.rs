// International round-trip combos: an outbound block and an inbound block of the same
// provider segment, priced together.

use crate::deeplink::DeepLinkComposer;
use crate::fare::{apply_discount_override, build_fare_options, resolve_effective_fare};
use crate::leg::ProviderIndex;
use crate::model::{Combo, Direction, FareOption, Itinerary};
use crate::provider::{decode_record, is_truthy_flag, value_to_f64, RawBond, RawFare, RawProviderPayload, RawSegment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

// Which block pairs of a segment become combos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboPairing {
    // First usable outbound block with the first usable inbound block
    #[default]
    #[serde(alias = "first", alias = "first-usable")]
    FirstUsable,
    // Every usable outbound block with every usable inbound block
    #[serde(alias = "cross", alias = "cross-product")]
    CrossProduct,
}

pub struct ComboMatcher<'a> {
    index: ProviderIndex<'a>,
    pairing: ComboPairing,
    links: &'a DeepLinkComposer,
}

impl<'a> ComboMatcher<'a> {
    pub fn new(index: ProviderIndex<'a>, pairing: ComboPairing, links: &'a DeepLinkComposer) -> Self {
        Self {
            index,
            pairing,
            links,
        }
    }

    pub fn match_all(&self, payload: &RawProviderPayload) -> Vec<Combo> {
        let combos: Vec<Combo> = payload
            .journey_segments()
            .enumerate()
            .flat_map(|(journey_index, segments)| {
                segments
                    .iter()
                    .enumerate()
                    .flat_map(|(segment_index, segment)| self.match_segment(journey_index, segment_index, segment))
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!(count = combos.len(), pairing = ?self.pairing, "matched international combos");
        combos
    }

    pub fn match_segment(&self, journey_index: usize, segment_index: usize, segment: &Value) -> Vec<Combo> {
        let Some(segment) = decode_record::<RawSegment>(segment, "combo segment") else {
            return Vec::new();
        };

        let outbound_blocks = usable_blocks(segment.outbound_block_list());
        let inbound_blocks = usable_blocks(segment.inbound_block_list());
        if outbound_blocks.is_empty() || inbound_blocks.is_empty() {
            return Vec::new();
        }

        let pairs: Vec<(&RawBond, &RawBond)> = match self.pairing {
            ComboPairing::FirstUsable => vec![(&outbound_blocks[0], &inbound_blocks[0])],
            ComboPairing::CrossProduct => outbound_blocks
                .iter()
                .flat_map(|out| inbound_blocks.iter().map(move |inb| (out, inb)))
                .collect(),
        };

        let segment_fare = segment_combo_fare(&segment);
        let mut seen = HashSet::new();
        let mut combos = Vec::new();

        for (outbound_block, inbound_block) in pairs {
            let Some(combo) = self.build_combo(
                journey_index,
                segment_index,
                &segment,
                segment_fare,
                outbound_block,
                inbound_block,
            ) else {
                continue;
            };
            if seen.insert(dedup_key(&combo)) {
                combos.push(combo);
            }
        }
        combos
    }

    fn build_combo(
        &self,
        journey_index: usize,
        segment_index: usize,
        segment: &RawSegment,
        segment_fare: Option<f64>,
        outbound_block: &RawBond,
        inbound_block: &RawBond,
    ) -> Option<Combo> {
        let outbound_ids = outbound_block.flight_ids();
        let inbound_ids = inbound_block.flight_ids();

        let side_fares = match segment_fare {
            Some(fare) => vec![FareOption {
                base_fare: fare / 2.0,
                total_fare: fare / 2.0,
                ..Default::default()
            }],
            None => build_fare_options(
                &segment.raw_fares(),
                segment.discount_flag.as_ref(),
                segment.discount_amount.as_ref(),
            ),
        };

        let onward = self.build_side(segment, outbound_block, &outbound_ids, Direction::Outbound, &side_fares);
        let inbound = self.build_side(segment, inbound_block, &inbound_ids, Direction::Return, &side_fares);
        let (Some(onward), Some(inbound)) = (onward, inbound) else {
            debug!(
                journey_index,
                segment_index,
                "combo side resolved to zero legs, skipping segment"
            );
            return None;
        };

        let combo_fare = segment_fare.unwrap_or_else(|| {
            onward.cheapest_fare().unwrap_or(0.0) + inbound.cheapest_fare().unwrap_or(0.0)
        });
        let deep_link = self.links.compose_roundtrip(&onward, &inbound, combo_fare);

        Some(Combo {
            id: format!(
                "{}-{}-{}-{}",
                journey_index,
                segment_index,
                outbound_ids.join("-"),
                inbound_ids.join("-")
            ),
            onward,
            inbound,
            combo_fare,
            deep_link,
        })
    }

    fn build_side(
        &self,
        segment: &RawSegment,
        block: &RawBond,
        flight_ids: &[String],
        direction: Direction,
        fare_options: &[FareOption],
    ) -> Option<Itinerary> {
        let legs = self.index.resolve_legs(flight_ids);
        let origin = legs.first()?.origin.clone();
        let destination = legs.last()?.destination.clone();
        let prefix = match direction {
            Direction::Outbound => "ob",
            Direction::Return => "ib",
        };

        Some(Itinerary {
            segment_id: Some(format!("{}-{}", prefix, flight_ids.join("-"))),
            segment_key: segment.segment_key.clone(),
            direction,
            origin,
            destination,
            journey_time: block.journey_time.clone(),
            total_stops: legs.len().saturating_sub(1) as u32,
            legs,
            is_refundable: block
                .refundable_flag()
                .or_else(|| segment.refundable_flag())
                .unwrap_or(false),
            fare_options: fare_options.to_vec(),
            // the combo carries the booking link for both sides
            deep_link: String::new(),
        })
    }
}

fn usable_blocks(blocks: Vec<RawBond>) -> Vec<RawBond> {
    blocks.into_iter().filter(RawBond::has_flight_refs).collect()
}

// Segment-level price for the pair: an explicit combo fare, else the resolved segment
// total, else the resolved total (or base fare) of the first listed fare.
pub fn segment_combo_fare(segment: &RawSegment) -> Option<f64> {
    let positive = |fare: f64| (fare > 0.0).then_some(fare);

    if let Some(fare) = segment.combo_fare.as_ref().and_then(value_to_f64).and_then(positive) {
        return Some(fare);
    }

    let resolved = resolve_effective_fare(
        segment.total_fare.as_ref(),
        segment.discount_flag.as_ref(),
        segment.discount_amount.as_ref(),
    );
    if let Some(fare) = positive(resolved) {
        return Some(fare);
    }

    let primary: RawFare = segment
        .raw_fares()
        .first()
        .and_then(|raw| decode_record(raw, "fare"))?;
    let flag = is_truthy_flag(segment.discount_flag.as_ref());
    let discount = segment.discount_amount.as_ref().and_then(value_to_f64);
    primary
        .total_fare
        .map(|total| apply_discount_override(total, flag, discount))
        .and_then(positive)
        .or_else(|| primary.base_fare.and_then(positive))
}

// Same flights on both sides at the same price count once
fn dedup_key(combo: &Combo) -> String {
    let signature = |itinerary: &Itinerary| {
        itinerary
            .legs
            .iter()
            .map(|leg| {
                format!(
                    "{}{}@{}T{}",
                    leg.airline_code, leg.flight_number, leg.departure_date, leg.departure_time
                )
            })
            .collect::<Vec<_>>()
            .join("+")
    };
    format!(
        "{}|{}|{:.2}",
        signature(&combo.onward),
        signature(&combo.inbound),
        combo.combo_fare
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::Passengers;
    use crate::provider::{load_sample, SAMPLE_INTERNATIONAL_ROUNDTRIP_PATH};
    use serde_json::json;
    use std::collections::HashMap;
    use test_case::test_case;

    fn payload() -> RawProviderPayload {
        RawProviderPayload {
            airlines: HashMap::from([
                ("EK".to_string(), json!("Emirates|1|0")),
                ("AI".to_string(), json!("Air India")),
            ]),
            flight_details: HashMap::from([
                (
                    "10".to_string(),
                    json!({"AC": "EK", "FN": "511", "OG": "DEL", "DT": "DXB", "DDT": "2026-01-19",
                           "DTM": "0415", "ADT": "2026-01-19", "ATM": "0640", "CB": "Y", "FCLS": "U"}),
                ),
                (
                    "11".to_string(),
                    json!({"AC": "EK", "FN": "1", "OG": "DXB", "DT": "LHR", "DDT": "2026-01-19",
                           "DTM": "0830", "ADT": "2026-01-19", "ATM": "1240", "CB": "Y", "FCLS": "U"}),
                ),
                (
                    "20".to_string(),
                    json!({"AC": "AI", "FN": "162", "OG": "LHR", "DT": "DEL", "DDT": "2026-01-26",
                           "DTM": "2100", "ADT": "2026-01-27", "ATM": "1030", "CB": "Y", "FCLS": "T"}),
                ),
                (
                    "21".to_string(),
                    json!({"AC": "AI", "FN": "170", "OG": "LHR", "DT": "DEL", "DDT": "2026-01-26",
                           "DTM": "1130", "ADT": "2026-01-27", "ATM": "0045", "CB": "Y", "FCLS": "T"}),
                ),
            ]),
            ..Default::default()
        }
    }

    fn links() -> DeepLinkComposer {
        DeepLinkComposer::new(&EngineConfig::default(), Passengers::default())
    }

    fn segment(extra: Value) -> Value {
        let mut base = json!({
            "SK": "SK-1",
            "RF": 0,
            "l_OB": [{"JyTm": "11h 55m", "RF": 1, "FL": ["10", "11"]}],
            "l_IB": [{"JyTm": "09h 00m", "FL": ["20"]}]
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        base
    }

    #[test]
    fn test_first_usable_pair() {
        let payload = payload();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::FirstUsable, &links);

        let combos = matcher.match_segment(0, 3, &segment(json!({"comboFare": "64000"})));
        assert_eq!(combos.len(), 1);

        let combo = &combos[0];
        assert_eq!(combo.id, "0-3-10-11-20");
        assert_eq!(combo.combo_fare, 64000.0);
        assert_eq!(combo.onward.legs.len(), 2);
        assert_eq!(combo.onward.total_stops, 1);
        assert_eq!(combo.onward.origin, "DEL");
        assert_eq!(combo.onward.destination, "LHR");
        assert_eq!(combo.onward.segment_id.as_deref(), Some("ob-10-11"));
        assert_eq!(combo.inbound.segment_id.as_deref(), Some("ib-20"));
        assert_eq!(combo.inbound.total_stops, 0);
        assert_eq!(combo.onward.fare_options[0].total_fare, 32000.0);
        assert!(combo.deep_link.contains("TripType=RoundTrip"));
        assert!(combo.deep_link.contains("DisplayedPrice=64000.00"));
    }

    #[test]
    fn test_refundability_falls_back_to_segment_then_false() {
        let payload = payload();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::FirstUsable, &links);

        let combo = &matcher.match_segment(0, 0, &segment(json!({"TF": 50000})))[0];
        assert!(combo.onward.is_refundable);
        assert!(!combo.inbound.is_refundable);

        let unknown = json!({
            "l_OB": [{"FL": ["10"]}],
            "l_IB": [{"RF": "maybe", "FL": ["20"]}],
            "TF": 1000
        });
        let combo = &matcher.match_segment(0, 0, &unknown)[0];
        assert!(!combo.onward.is_refundable);
        assert!(!combo.inbound.is_refundable);
    }

    #[test_case(json!({"comboFare": 70000, "TF": 60000}), 70000.0; "explicit combo fare wins")]
    #[test_case(json!({"TF": 60000, "ICPS": true, "TTDIS": 58000}), 58000.0; "segment total with discount")]
    #[test_case(json!({"lstFr": [{"TF": 61000}, {"TF": 1}]}), 61000.0; "first listed fare")]
    #[test_case(json!({"lstFr": [{"BF": 52000}]}), 52000.0; "first listed base fare")]
    #[test_case(json!({}), 0.0; "no price anywhere")]
    fn test_combo_fare_resolution_order(extra: Value, expected: f64) {
        let payload = payload();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::FirstUsable, &links);
        let combos = matcher.match_segment(0, 0, &segment(extra));
        assert_eq!(combos[0].combo_fare, expected);
    }

    #[test]
    fn test_combo_fare_sums_cheapest_sides_without_segment_price() {
        let raw: RawSegment = serde_json::from_value(json!({"lstFr": [{"TF": 0}]})).unwrap();
        assert_eq!(segment_combo_fare(&raw), None);

        let payload = payload();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::FirstUsable, &links);
        let combos = matcher.match_segment(0, 0, &segment(json!({"lstFr": [{"TF": 0}, {"TF": 0}]})));
        assert_eq!(combos[0].combo_fare, 0.0);
        assert_eq!(combos[0].onward.fare_options.len(), 2);
    }

    #[test_case(json!({"l_OB": [{"FL": ["404"]}], "l_IB": [{"FL": ["20"]}]}); "outbound unresolvable")]
    #[test_case(json!({"l_OB": [{"FL": ["10"]}], "l_IB": [{"FL": ["404", "405"]}]}); "inbound unresolvable")]
    #[test_case(json!({"l_OB": [{"FL": []}], "l_IB": [{"FL": ["20"]}]}); "outbound without refs")]
    #[test_case(json!({"l_OB": [{"FL": ["10"]}]}); "inbound list missing")]
    #[test_case(json!({"l_OB": "junk", "l_IB": [{"FL": ["20"]}]}); "outbound list malformed")]
    #[test_case(json!({"b": [{"FL": ["10"]}]}); "plain bonds only")]
    fn test_no_partial_combos(segment: Value) {
        let payload = payload();
        let links = links();
        for pairing in [ComboPairing::FirstUsable, ComboPairing::CrossProduct] {
            let matcher = ComboMatcher::new(ProviderIndex::new(&payload), pairing, &links);
            assert!(matcher.match_segment(0, 0, &segment).is_empty());
        }
    }

    #[test]
    fn test_first_usable_skips_blocks_without_refs() {
        let payload = payload();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::FirstUsable, &links);
        let raw = json!({
            "TF": 1000,
            "l_OB": [{"FL": []}, {"FL": "10"}],
            "l_IB": [{"FL": null}, {"FL": ["21"]}, {"FL": ["20"]}]
        });
        let combos = matcher.match_segment(1, 2, &raw);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].id, "1-2-10-21");
    }

    #[test]
    fn test_cross_product_pairs_every_block_and_dedups() {
        let payload = payload();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::CrossProduct, &links);
        let raw = json!({
            "TF": 1000,
            "l_OB": [{"FL": ["10"]}, {"FL": ["10", "11"]}, {"FL": ["10"]}],
            "l_IB": [{"FL": ["20"]}, {"FL": ["21"]}]
        });
        let combos = matcher.match_segment(0, 0, &raw);
        let ids: Vec<&str> = combos.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["0-0-10-20", "0-0-10-21", "0-0-10-11-20", "0-0-10-11-21"]);
    }

    #[test]
    fn test_pairing_mode_deserializes() {
        let mode = |raw: &str| serde_json::from_value::<ComboPairing>(json!(raw));
        assert_eq!(mode("cross-product").unwrap(), ComboPairing::CrossProduct);
        assert_eq!(mode("cross_product").unwrap(), ComboPairing::CrossProduct);
        assert_eq!(mode("first").unwrap(), ComboPairing::FirstUsable);
        assert!(mode("both").is_err());
    }

    #[test]
    fn test_international_sample_yields_combos() {
        let payload = load_sample(SAMPLE_INTERNATIONAL_ROUNDTRIP_PATH).unwrap();
        let links = links();
        let matcher = ComboMatcher::new(ProviderIndex::new(&payload), ComboPairing::FirstUsable, &links);
        let combos = matcher.match_all(&payload);
        assert!(!combos.is_empty());
        assert!(combos
            .iter()
            .all(|c| !c.onward.legs.is_empty() && !c.inbound.legs.is_empty()));
    }
}
