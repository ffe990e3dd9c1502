// Fare resolution with the provider's instant-discount override.
//
// The provider sometimes advertises a lower "instant coupon" price (TTDIS, enabled by the
// ICPS flag) separately from the nominal total. The override only applies when it is a
// positive amount strictly below the nominal total.

use crate::model::FareOption;
use crate::provider::{decode_record, is_truthy_flag, value_to_f64, RawFare};
use serde_json::Value;
use tracing::debug;

// Pay the discount amount when the flag is set and the amount is a real reduction,
// otherwise the nominal total (0 when the total itself is unparseable).
pub fn resolve_effective_fare(
    total_fare: Option<&Value>,
    discount_flag: Option<&Value>,
    discount_amount: Option<&Value>,
) -> f64 {
    let total = total_fare.and_then(value_to_f64).unwrap_or(0.0);
    let discount = discount_amount.and_then(value_to_f64);
    apply_discount_override(total, is_truthy_flag(discount_flag), discount)
}

pub fn apply_discount_override(total: f64, discount_flag: bool, discount: Option<f64>) -> f64 {
    match discount {
        Some(amount) if discount_flag && amount > 0.0 && amount < total => amount,
        _ => total,
    }
}

// Map raw fare entries to fare options, applying the override to each total.
// Entries that are not objects or carry neither a total nor a base fare are dropped.
pub fn build_fare_options(
    raw_fares: &[Value],
    discount_flag: Option<&Value>,
    discount_amount: Option<&Value>,
) -> Vec<FareOption> {
    let flag = is_truthy_flag(discount_flag);
    let discount = discount_amount.and_then(value_to_f64);

    raw_fares
        .iter()
        .filter_map(|raw| decode_record::<RawFare>(raw, "fare"))
        .filter(|fare| {
            let usable = fare.total_fare.is_some() || fare.base_fare.is_some();
            if !usable {
                debug!(fare_id = ?fare.fare_id, "skipping fare without amounts");
            }
            usable
        })
        .map(|fare| fare_option_from_raw(&fare, flag, discount))
        .collect()
}

pub fn fare_option_from_raw(fare: &RawFare, discount_flag: bool, discount: Option<f64>) -> FareOption {
    let base_fare = fare.base_fare.unwrap_or(0.0);
    let nominal = fare.total_fare.unwrap_or(base_fare);
    FareOption {
        fare_id: fare.fare_id.clone(),
        fare_name: fare.fare_name.clone(),
        base_fare,
        total_fare: apply_discount_override(nominal, discount_flag, discount),
        total_tax: fare.total_tax.unwrap_or(0.0),
        discount: fare.discount.unwrap_or(0.0),
    }
}

// Single fare option for segments that only carry a segment-level total
pub fn segment_total_fare_option(
    total_fare: Option<&Value>,
    discount_flag: Option<&Value>,
    discount_amount: Option<&Value>,
) -> FareOption {
    FareOption {
        base_fare: total_fare.and_then(value_to_f64).unwrap_or(0.0),
        total_fare: resolve_effective_fare(total_fare, discount_flag, discount_amount),
        ..Default::default()
    }
}
