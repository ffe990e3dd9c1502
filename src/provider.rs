// Raw provider payload: the flight-search response exactly as the provider sends it.
// Scalars arrive as strings or numbers interchangeably and nulls mean "absent", so every
// record here decodes leniently. Nested records are kept as raw JSON and decoded one at a
// time by the builders, which lets a single malformed record be skipped without failing
// the whole payload.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

// Error types for payload decoding and request validation
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

// Top-level provider response
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawProviderPayload {
    // airline code -> "Display Name|x|y"
    #[serde(rename = "C", deserialize_with = "lenient_map")]
    pub airlines: HashMap<String, Value>,
    // opaque flight id -> flight detail record
    #[serde(rename = "dctFltDtl", deserialize_with = "lenient_map")]
    pub flight_details: HashMap<String, Value>,
    // one raw journey per direction, decoded on demand by `journey_segments`
    #[serde(rename = "j", deserialize_with = "lenient_list")]
    pub journeys: Vec<Value>,
    #[serde(rename = "lstCalendarFareData", deserialize_with = "lenient_list")]
    pub calendar_fares: Vec<Value>,
    #[serde(rename = "err", deserialize_with = "lenient_record")]
    pub error: Option<RawProviderError>,
}

impl RawProviderPayload {
    pub fn from_json(json_str: &str) -> Result<Self, ProcessingError> {
        serde_json::from_str(json_str).map_err(|e| ProcessingError::JsonParseError(e.to_string()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProcessingError> {
        serde_json::from_slice(bytes).map_err(|e| ProcessingError::JsonParseError(e.to_string()))
    }

    // Human-readable reason the provider attached to an empty response, if any
    pub fn error_description(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|err| err.description.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    pub fn flight_detail(&self, flight_id: &str) -> Option<&Value> {
        self.flight_details.get(flight_id)
    }

    // Raw segments of each journey, by journey position. A journey that does not decode
    // keeps its slot with no segments, so the second journey is always the return one.
    pub fn journey_segments(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        self.journeys.iter().map(|journey| {
            decode_record::<RawJourney>(journey, "journey")
                .map(|journey| journey.segments)
                .unwrap_or_default()
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawProviderError {
    #[serde(rename = "desp", deserialize_with = "loose_string")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawJourney {
    #[serde(rename = "s", deserialize_with = "lenient_list")]
    pub segments: Vec<Value>,
}

// One provider search segment: a leg-set with its fare bonds, or, for international
// round trips, two independent block lists that still have to be paired.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawSegment {
    #[serde(deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(rename = "SK", deserialize_with = "loose_string")]
    pub segment_key: Option<String>,
    #[serde(rename = "RF")]
    pub refundable: Option<Value>,
    #[serde(rename = "b")]
    pub bonds: Option<Value>,
    #[serde(rename = "l_OB", alias = "lOB", alias = "l_ob", alias = "LOB", alias = "lob")]
    pub outbound_blocks: Option<Value>,
    #[serde(rename = "l_IB", alias = "lIB", alias = "l_ib", alias = "LIB", alias = "lib")]
    pub inbound_blocks: Option<Value>,
    #[serde(rename = "lstFr")]
    pub fares: Option<Value>,
    #[serde(rename = "TF", alias = "totalFare", alias = "total_fare", alias = "total")]
    pub total_fare: Option<Value>,
    #[serde(rename = "comboFare", alias = "combo_fare")]
    pub combo_fare: Option<Value>,
    #[serde(rename = "TTDIS")]
    pub discount_amount: Option<Value>,
    #[serde(rename = "ICPS")]
    pub discount_flag: Option<Value>,
}

impl RawSegment {
    pub fn bond_list(&self) -> Vec<RawBond> {
        list_of(self.bonds.as_ref())
    }

    pub fn outbound_block_list(&self) -> Vec<RawBond> {
        list_of(self.outbound_blocks.as_ref())
    }

    pub fn inbound_block_list(&self) -> Vec<RawBond> {
        list_of(self.inbound_blocks.as_ref())
    }

    pub fn raw_fares(&self) -> Vec<Value> {
        match &self.fares {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn refundable_flag(&self) -> Option<bool> {
        self.refundable.as_ref().and_then(coerce_refundable_flag)
    }
}

// A fare bond (domestic / one-way) or an outbound/inbound block (international combos).
// Both reference flight details through the same `FL` list.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawBond {
    #[serde(rename = "JyTm", deserialize_with = "loose_string")]
    pub journey_time: Option<String>,
    #[serde(rename = "RF")]
    pub refundable: Option<Value>,
    // international encoding, e.g. "Non-Stop", "1-Stop", "|2+Stops"
    #[serde(rename = "STP", deserialize_with = "loose_string")]
    pub stops_label: Option<String>,
    // domestic encoding, a bare count
    #[serde(rename = "stp", deserialize_with = "loose_string")]
    pub stops: Option<String>,
    #[serde(rename = "FL", alias = "fl", alias = "flights")]
    pub flight_refs: Option<Value>,
}

impl RawBond {
    // Flight-detail ids this bond references, in leg order
    pub fn flight_ids(&self) -> Vec<String> {
        match &self.flight_refs {
            Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
            Some(other) => value_to_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn has_flight_refs(&self) -> bool {
        !self.flight_ids().is_empty()
    }

    pub fn refundable_flag(&self) -> Option<bool> {
        self.refundable.as_ref().and_then(coerce_refundable_flag)
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawFlightDetail {
    #[serde(rename = "AC", alias = "airline_code", deserialize_with = "loose_string")]
    pub airline_code: Option<String>,
    #[serde(rename = "FN", alias = "flight_number", deserialize_with = "loose_string")]
    pub flight_number: Option<String>,
    #[serde(rename = "OG", alias = "origin", deserialize_with = "loose_string")]
    pub origin: Option<String>,
    #[serde(rename = "DT", alias = "destination", deserialize_with = "loose_string")]
    pub destination: Option<String>,
    #[serde(rename = "DDT", alias = "departure_date", deserialize_with = "loose_string")]
    pub departure_date: Option<String>,
    #[serde(rename = "DTM", alias = "departure_time", deserialize_with = "loose_string")]
    pub departure_time: Option<String>,
    #[serde(rename = "ADT", alias = "arrival_date", deserialize_with = "loose_string")]
    pub arrival_date: Option<String>,
    #[serde(rename = "ATM", alias = "arrival_time", deserialize_with = "loose_string")]
    pub arrival_time: Option<String>,
    #[serde(rename = "CB", alias = "cabin", deserialize_with = "loose_string")]
    pub cabin: Option<String>,
    #[serde(rename = "FCLS", alias = "fare_class", deserialize_with = "loose_string")]
    pub fare_class: Option<String>,
    #[serde(rename = "DUR", alias = "duration", deserialize_with = "loose_string")]
    pub duration: Option<String>,
    #[serde(rename = "BW", deserialize_with = "loose_string")]
    pub baggage_weight: Option<String>,
    #[serde(rename = "BU", deserialize_with = "loose_string")]
    pub baggage_unit: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawFare {
    #[serde(rename = "SID", deserialize_with = "loose_string")]
    pub fare_id: Option<String>,
    #[serde(rename = "FN", deserialize_with = "loose_string")]
    pub fare_name: Option<String>,
    #[serde(rename = "BF", alias = "base_fare", deserialize_with = "loose_number")]
    pub base_fare: Option<f64>,
    #[serde(rename = "TF", alias = "total_fare", alias = "total", deserialize_with = "loose_number")]
    pub total_fare: Option<f64>,
    #[serde(rename = "TTXMP", deserialize_with = "loose_number")]
    pub total_tax: Option<f64>,
    #[serde(rename = "DA", deserialize_with = "loose_number")]
    pub discount: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawCalendarFare {
    #[serde(rename = "Destination", alias = "destination", deserialize_with = "loose_string")]
    pub destination: Option<String>,
    #[serde(
        rename = "destName",
        alias = "destinationName",
        alias = "dest_name",
        deserialize_with = "loose_string"
    )]
    pub destination_name: Option<String>,
    #[serde(rename = "DistanceArr", alias = "Distance", deserialize_with = "loose_number")]
    pub distance: Option<f64>,
    #[serde(rename = "TotalFare", deserialize_with = "loose_number")]
    pub total_fare: Option<f64>,
    #[serde(rename = "newDate", alias = "DepDate", deserialize_with = "loose_string")]
    pub departure_date: Option<String>,
}

// Decode one nested record, logging and dropping it when it does not fit
pub fn decode_record<T: DeserializeOwned>(value: &Value, kind: &str) -> Option<T> {
    if !value.is_object() {
        debug!(kind, "skipping non-object record");
        return None;
    }
    match T::deserialize(value) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!(kind, error = %e, "skipping malformed record");
            None
        }
    }
}

// A list field that may also arrive as a single object
fn list_of<T: DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| decode_record(item, "block"))
            .collect(),
        Some(item) if item.is_object() => decode_record(item, "block").into_iter().collect(),
        _ => Vec::new(),
    }
}

pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// Provider flags are "1", 1, true, "yes", ...
pub fn is_truthy_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "t" | "yes" | "y"
        ),
        _ => false,
    }
}

// Refund flags come as bools, 1/0 or words like "Refundable" / "NonRefundable".
// Anything else is treated as unknown.
pub fn coerce_refundable_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "refundable" => Some(true),
            "0" | "false" | "f" | "no" | "n" | "nonrefundable" | "non-refundable"
            | "non refundable" | "non-refund" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// Anything but an array (null, an object, a stray scalar) reads as an empty list
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

fn lenient_map<'de, D>(deserializer: D) -> Result<HashMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(entries)) => Ok(entries.into_iter().collect()),
        _ => Ok(HashMap::new()),
    }
}

fn lenient_record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|value| decode_record(value, "provider error")))
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

// Sample file paths (the actual files are stored in the samples directory)
pub const SAMPLE_DOMESTIC_ROUNDTRIP_PATH: &str = "samples/domestic_roundtrip.json";
pub const SAMPLE_INTERNATIONAL_ROUNDTRIP_PATH: &str = "samples/international_roundtrip.json";

pub fn load_sample(path: &str) -> Result<RawProviderPayload, ProcessingError> {
    let content = std::fs::read_to_string(path)?;
    RawProviderPayload::from_json(&content)
}

// A small sample for inline testing
pub const SMALL_SAMPLE_JSON: &str = r#"
{
  "C": { "6E": "IndiGo|1|0", "AI": "Air India|2|0" },
  "dctFltDtl": {
    "0": { "AC": "6E", "FN": "2134", "OG": "DEL", "DT": "BOM", "DDT": "Mon-19Jan2026",
           "DTM": "06:10", "ADT": "Mon-19Jan2026", "ATM": "08:25", "CB": "E", "FCLS": "R",
           "DUR": "02h 15m", "BW": "15", "BU": "KG" },
    "1": { "AC": "AI", "FN": 865, "OG": "DEL", "DT": "BOM", "DDT": "Mon-19Jan2026",
           "DTM": "19:00", "ADT": "Mon-19Jan2026", "ATM": "21:10", "CB": "Y", "FCLS": "T",
           "DUR": "02h 10m" }
  },
  "j": [
    { "s": [
        { "id": "s0", "SK": "KEY-0", "RF": 1, "TTDIS": "4500", "ICPS": true,
          "b": [ { "JyTm": "02h 15m", "stp": "0", "FL": ["0"] } ],
          "lstFr": [ { "SID": "F0", "FN": "Saver", "BF": 4200, "TF": "5000", "TTXMP": 800, "DA": 0 } ] },
        { "id": "s1", "SK": "KEY-1", "RF": "NonRefundable",
          "b": [ { "JyTm": "02h 10m", "stp": 0, "FL": [1] } ],
          "lstFr": [ { "SID": "F1", "FN": "Flexi", "BF": 5100, "TF": 6100, "TTXMP": 1000 } ] }
    ] }
  ]
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_sample_decodes() {
        let payload = RawProviderPayload::from_json(SMALL_SAMPLE_JSON).unwrap();
        assert_eq!(payload.airlines.len(), 2);
        assert_eq!(payload.flight_details.len(), 2);
        let journeys: Vec<Vec<Value>> = payload.journey_segments().collect();
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].len(), 2);
        assert!(payload.error_description().is_none());
    }

    #[test]
    fn test_nulls_are_treated_as_absent() {
        let payload =
            RawProviderPayload::from_json(r#"{"C": null, "dctFltDtl": null, "j": null, "err": {"desp": "No flights"}}"#)
                .unwrap();
        assert!(payload.journeys.is_empty());
        assert!(payload.flight_details.is_empty());
        assert_eq!(payload.error_description(), Some("No flights"));
    }

    #[test]
    fn test_malformed_journeys_do_not_sink_the_payload() {
        let good = json!({"s": [{"id": "s0", "b": [{"FL": ["0"]}]}, {"id": "s1"}]});
        let payload: RawProviderPayload = serde_json::from_value(json!({
            "C": [],
            "dctFltDtl": "unavailable",
            "j": [good, "junk", {"s": {}}, {"s": null}],
            "lstCalendarFareData": {},
            "err": "timeout"
        }))
        .unwrap();

        assert!(payload.airlines.is_empty());
        assert!(payload.flight_details.is_empty());
        assert!(payload.calendar_fares.is_empty());
        assert!(payload.error_description().is_none());

        let journeys: Vec<Vec<Value>> = payload.journey_segments().collect();
        assert_eq!(journeys.len(), 4);
        assert_eq!(journeys[0].len(), 2);
        assert!(journeys[1..].iter().all(Vec::is_empty));
    }

    #[test]
    fn test_non_list_journeys_read_as_empty() {
        let payload = RawProviderPayload::from_json(r#"{"j": {"s": []}, "C": {"6E": "IndiGo|1|0"}}"#).unwrap();
        assert!(payload.journeys.is_empty());
        assert_eq!(payload.airlines.len(), 1);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let result = RawProviderPayload::from_json("{not json");
        assert!(matches!(result, Err(ProcessingError::JsonParseError(_))));
    }

    #[test]
    fn test_flight_refs_accept_scalars_and_lists() {
        let list: RawBond = serde_json::from_value(json!({"FL": ["12", 13]})).unwrap();
        assert_eq!(list.flight_ids(), vec!["12".to_string(), "13".to_string()]);

        let scalar: RawBond = serde_json::from_value(json!({"fl": 7})).unwrap();
        assert_eq!(scalar.flight_ids(), vec!["7".to_string()]);

        let empty: RawBond = serde_json::from_value(json!({"FL": []})).unwrap();
        assert!(!empty.has_flight_refs());
    }

    #[test]
    fn test_block_lists_accept_single_objects_and_skip_garbage() {
        let segment: RawSegment = serde_json::from_value(json!({
            "l_OB": {"FL": ["1"]},
            "l_IB": ["garbage", {"FL": ["2"]}, 5]
        }))
        .unwrap();
        assert_eq!(segment.outbound_block_list().len(), 1);
        assert_eq!(segment.inbound_block_list().len(), 1);
    }

    #[test]
    fn test_refundable_coercion() {
        assert_eq!(coerce_refundable_flag(&json!(true)), Some(true));
        assert_eq!(coerce_refundable_flag(&json!(0)), Some(false));
        assert_eq!(coerce_refundable_flag(&json!("Refundable")), Some(true));
        assert_eq!(coerce_refundable_flag(&json!("non-refundable")), Some(false));
        assert_eq!(coerce_refundable_flag(&json!("maybe")), None);
        assert_eq!(coerce_refundable_flag(&json!(null)), None);
    }

    #[test]
    fn test_truthy_flags() {
        assert!(is_truthy_flag(Some(&json!(true))));
        assert!(is_truthy_flag(Some(&json!("Yes"))));
        assert!(is_truthy_flag(Some(&json!(1))));
        assert!(!is_truthy_flag(Some(&json!(0))));
        assert!(!is_truthy_flag(Some(&json!("false"))));
        assert!(!is_truthy_flag(None));
    }

    #[test]
    fn test_load_sample_payloads() {
        let domestic = load_sample(SAMPLE_DOMESTIC_ROUNDTRIP_PATH);
        assert!(domestic.is_ok(), "Failed to load domestic sample: {:?}", domestic.err());
        assert_eq!(domestic.unwrap().journeys.len(), 2);

        let international = load_sample(SAMPLE_INTERNATIONAL_ROUNDTRIP_PATH);
        assert!(
            international.is_ok(),
            "Failed to load international sample: {:?}",
            international.err()
        );
    }

    #[test]
    fn test_missing_sample_is_io_error() {
        let result = load_sample("samples/does_not_exist.json");
        assert!(matches!(result, Err(ProcessingError::IoError(_))));
    }
}
