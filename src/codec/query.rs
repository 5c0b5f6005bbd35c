use crate::models::{FilterState, PriceRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Ordered key-value pairs, as they appear in a query string
pub type QueryPairs = Vec<(String, String)>;

/// Keys this codec owns in the browser URL. Anything else is left alone.
const URL_KEYS: [&str; 8] = [
    "free_text_search",
    "location",
    "min_price",
    "max_price",
    "min_rooms",
    "max_rooms",
    "property_types",
    "status",
];

/// URL value for "no status filter". Without it a missing `status` key
/// would fall back to the caller's default status on decode.
pub const ANY_STATUS: &str = "any";

/// Pagination for listing queries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }
}

fn push(pairs: &mut QueryPairs, key: &str, value: impl ToString) {
    pairs.push((key.to_string(), value.to_string()));
}

fn joined_types(types: &BTreeSet<String>) -> Option<String> {
    (!types.is_empty()).then(|| types.iter().cloned().collect::<Vec<_>>().join(","))
}

/// Query parameters for `GET /listings`.
///
/// Unset fields are omitted rather than sent empty.
pub fn encode_to_api_params(filters: &FilterState, page: Page) -> QueryPairs {
    let mut pairs = QueryPairs::new();
    if !filters.free_text.is_empty() {
        push(&mut pairs, "free_text_search", &filters.free_text);
    }
    if !filters.location.is_empty() {
        push(&mut pairs, "city", &filters.location);
    }
    push(&mut pairs, "min_price", filters.price.min());
    push(&mut pairs, "max_price", filters.price.max());
    if filters.min_rooms > 0 {
        push(&mut pairs, "min_rooms", filters.min_rooms);
    }
    if let Some(max) = filters.effective_max_rooms() {
        push(&mut pairs, "max_rooms", max);
    }
    if let Some(types) = joined_types(&filters.property_types) {
        push(&mut pairs, "property_type", types);
    }
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        push(&mut pairs, "status_name", status);
    }
    if let Some(limit) = page.limit {
        push(&mut pairs, "limit", limit);
    }
    if let Some(offset) = page.offset {
        push(&mut pairs, "offset", offset);
    }
    pairs
}

fn url_pairs(filters: &FilterState) -> QueryPairs {
    let mut pairs = QueryPairs::new();
    if !filters.free_text.is_empty() {
        push(&mut pairs, "free_text_search", &filters.free_text);
    }
    if !filters.location.is_empty() {
        push(&mut pairs, "location", &filters.location);
    }
    push(&mut pairs, "min_price", filters.price.min());
    push(&mut pairs, "max_price", filters.price.max());
    if filters.min_rooms > 0 {
        push(&mut pairs, "min_rooms", filters.min_rooms);
    }
    if let Some(max) = filters.effective_max_rooms() {
        push(&mut pairs, "max_rooms", max);
    }
    if let Some(types) = joined_types(&filters.property_types) {
        push(&mut pairs, "property_types", types);
    }
    let status = filters.status.as_deref().filter(|s| !s.is_empty());
    push(&mut pairs, "status", status.unwrap_or(ANY_STATUS));
    pairs
}

/// Merge `filters` into the current URL parameters.
///
/// Keys owned by the filter keep their position when they were already
/// present and are appended otherwise. Keys whose field is now unset are
/// dropped. Foreign keys are kept untouched and in order.
pub fn encode_to_url_params(filters: &FilterState, previous: &[(String, String)]) -> QueryPairs {
    let mut fresh = url_pairs(filters);
    let mut merged = QueryPairs::with_capacity(previous.len() + fresh.len());

    for (key, value) in previous {
        if !URL_KEYS.contains(&key.as_str()) {
            merged.push((key.clone(), value.clone()));
            continue;
        }
        if let Some(idx) = fresh.iter().position(|(k, _)| k == key) {
            merged.push(fresh.remove(idx));
        }
    }
    merged.extend(fresh);
    merged
}

fn last_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_number<T: std::str::FromStr>(params: &[(String, String)], key: &str) -> Option<T> {
    let raw = last_value(params, key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("Ignoring unparseable URL parameter {}={}", key, raw);
            None
        }
    }
}

/// Split a comma-joined type list into lower-cased tags
pub fn split_types(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Read a filter state out of URL parameters.
///
/// Only keys present in `params` override `defaults`.
pub fn decode_from_url_params(params: &[(String, String)], defaults: &FilterState) -> FilterState {
    let mut filters = defaults.clone();

    if let Some(text) = last_value(params, "free_text_search") {
        filters.free_text = text.to_string();
    }
    if let Some(location) = last_value(params, "location") {
        filters.location = location.to_string();
    }

    let min_price = parse_number::<i64>(params, "min_price");
    let max_price = parse_number::<i64>(params, "max_price");
    if min_price.is_some() || max_price.is_some() {
        filters.price = PriceRange::new(
            min_price.unwrap_or(defaults.price.min()),
            max_price.unwrap_or(defaults.price.max()),
        );
    }

    if let Some(min) = parse_number::<u32>(params, "min_rooms") {
        filters.min_rooms = min;
    }
    if let Some(max) = parse_number::<u32>(params, "max_rooms") {
        filters.max_rooms = (max > 0).then_some(max);
    }
    if let Some(types) = last_value(params, "property_types") {
        filters.property_types = split_types(types);
    }
    if let Some(status) = last_value(params, "status") {
        let status = status.trim();
        filters.status = (!status.is_empty() && !status.eq_ignore_ascii_case(ANY_STATUS))
            .then(|| status.to_string());
    }

    filters
}

/// Parse a raw query string, with or without the leading `?`
pub fn parse_query_string(query: &str) -> QueryPairs {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn to_query_string(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
