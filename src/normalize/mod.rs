//! Turns raw backend payloads into the crate's models.
//!
//! The backend is not consistent about field names, optionality or id
//! types, so every public function here is total: missing or malformed
//! fields fall back to documented defaults instead of failing. Where a
//! payload can arrive in more than one shape, the shapes are tried as an
//! ordered list of [`Detector`]s and the first match wins.

pub mod account;
pub mod listing;
pub mod open_house;
pub mod saved_search;

pub use account::{normalize_identity, normalize_saved_listing_ids, normalize_token};
pub use listing::{
    normalize_listing, normalize_listings, normalize_media, normalize_suggestions,
    PLACEHOLDER_IMAGE,
};
pub use open_house::{normalize_open_house, normalize_open_houses};
pub use saved_search::{normalize_saved_search, normalize_saved_searches};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Result of probing a payload for one particular shape
#[derive(Debug)]
pub(crate) enum Detection<T> {
    Match(T),
    /// Shape not present, try the next detector
    Skip,
    /// Shape present but unreadable; logged, then the next detector runs
    Malformed(String),
}

/// One named shape check. Detectors are pure; logging happens in
/// [`first_match`].
pub(crate) struct Detector<T> {
    pub name: &'static str,
    pub detect: fn(&Value) -> Detection<T>,
}

pub(crate) fn first_match<T>(raw: &Value, detectors: &[Detector<T>]) -> Option<T> {
    for detector in detectors {
        match (detector.detect)(raw) {
            Detection::Match(found) => {
                debug!("Payload matched shape '{}'", detector.name);
                return Some(found);
            }
            Detection::Skip => {}
            Detection::Malformed(reason) => {
                warn!("Ignoring malformed '{}': {}", detector.name, reason);
            }
        }
    }
    None
}

/// Records of a collection response: a bare list, or an envelope
/// `{ "count": n, "items": [...] }`.
pub(crate) fn collection_items(raw: &Value) -> &[Value] {
    match raw {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    }
}

/// First of `keys` that is present and not null
pub(crate) fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find(|value| !value.is_null())
}

/// First of `keys` holding a non-blank string (numbers are stringified)
pub(crate) fn text(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Numbers and numeric strings
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

pub(crate) fn number(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find_map(as_number)
}

pub(crate) fn whole(raw: &Value, keys: &[&str]) -> Option<i64> {
    number(raw, keys).map(|n| n.round() as i64)
}

pub(crate) fn count(raw: &Value, keys: &[&str]) -> Option<u32> {
    number(raw, keys)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round().min(u32::MAX as f64) as u32)
}

/// Canonical string form of an id that may arrive as a number or a string
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Some(i.to_string()),
            (_, Some(u), _) => Some(u.to_string()),
            (_, _, Some(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
            (_, _, Some(f)) => Some(f.to_string()),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn id_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find_map(id_string)
}

/// RFC 3339, or a naive ISO timestamp taken as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) fn timestamp(raw: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .filter_map(Value::as_str)
        .find_map(parse_timestamp)
}

/// Non-blank strings out of a list, or out of a comma-joined string
pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => None,
    }
}
