//! Decides whether a live object already satisfies a desired one.
//!
//! The API server fills in defaults (`clusterIP`, `terminationMessagePath`,
//! `resourceVersion`, ...) that builders never set, so a live object matches
//! when every field the desired object sets is present with the same value.
//! Resource quantities under `limits` and `requests` are compared by amount,
//! since the server rewrites them to canonical form (`0.5` becomes `500m`).

use serde_json::Value;

/// `true` when `current` contains everything `desired` specifies.
///
/// Objects are compared key by key, ignoring keys that are unset (`null`) in
/// `desired`. Arrays must have the same length and match element-wise, since
/// list order is meaningful for ports, containers and rules.
pub fn is_subset(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Null, _) => true,
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            value.is_null()
                || have.get(key).is_some_and(|existing| {
                    if QUANTITY_MAPS.contains(&key.as_str()) {
                        quantities_subset(value, existing)
                    } else {
                        is_subset(value, existing)
                    }
                })
        }),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len() && want.iter().zip(have).all(|(w, h)| is_subset(w, h))
        }
        (Value::Number(want), Value::Number(have)) => match (want.as_f64(), have.as_f64()) {
            (Some(w), Some(h)) => w == h,
            _ => want == have,
        },
        _ => desired == current,
    }
}

/// Keys whose values map resource names to quantities
const QUANTITY_MAPS: &[&str] = &["limits", "requests"];

fn quantities_subset(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            value.is_null()
                || have.get(key).is_some_and(|existing| {
                    match (value.as_str(), existing.as_str()) {
                        (Some(w), Some(h)) => same_quantity(w, h),
                        _ => is_subset(value, existing),
                    }
                })
        }),
        _ => is_subset(desired, current),
    }
}

/// Whether two quantity strings denote the same amount. Strings that do not
/// parse only match themselves.
fn same_quantity(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse_quantity(a), parse_quantity(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Parse a Kubernetes quantity (`250m`, `1.5Gi`, `2e3`) into its amount.
fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    // `e`/`E` followed by a digit or sign is an exponent, not the exa suffix
    let split = raw
        .char_indices()
        .find(|&(i, c)| {
            c.is_ascii_alphabetic()
                && !(matches!(c, 'e' | 'E')
                    && bytes
                        .get(i + 1)
                        .is_some_and(|b| b.is_ascii_digit() || *b == b'+' || *b == b'-'))
        })
        .map_or(raw.len(), |(i, _)| i);
    let (number, suffix) = raw.split_at(split);
    let number: f64 = number.parse().ok()?;

    // dividing by an exact power of ten keeps `0.5` and `500m` equal
    let amount = match suffix {
        "" => number,
        "n" => number / 1e9,
        "u" => number / 1e6,
        "m" => number / 1e3,
        "k" => number * 1e3,
        "M" => number * 1e6,
        "G" => number * 1e9,
        "T" => number * 1e12,
        "P" => number * 1e15,
        "E" => number * 1e18,
        "Ki" => number * 1024f64,
        "Mi" => number * 1024f64.powi(2),
        "Gi" => number * 1024f64.powi(3),
        "Ti" => number * 1024f64.powi(4),
        "Pi" => number * 1024f64.powi(5),
        "Ei" => number * 1024f64.powi(6),
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}
