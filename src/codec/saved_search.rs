//! Mapping between [`FilterState`] and what the backend stores for a saved
//! search.
//!
//! Newer records carry a structured `filters` object (sometimes as a JSON
//! string). Older ones only have flat columns on the record itself
//! (`price_min`, `rooms_max`, ...). Decoding tries the shapes in that order.

use crate::models::{FilterState, PriceRange};
use crate::normalize::{
    as_number, count, field, first_match, string_list, text, whole, Detection, Detector,
};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Upper room bound as stored in a saved search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoomCap {
    /// The field was not stored at all
    #[default]
    Unspecified,
    /// Stored as `null` (or `0`): no upper bound
    Unbounded,
    AtMost(u32),
}

impl RoomCap {
    fn from_bound(bound: Option<u32>) -> Self {
        match bound {
            Some(n) if n > 0 => RoomCap::AtMost(n),
            _ => RoomCap::Unbounded,
        }
    }

    fn is_unspecified(&self) -> bool {
        matches!(self, RoomCap::Unspecified)
    }

    /// Both "no bound" flavours collapse to `None` at runtime
    pub fn bound(&self) -> Option<u32> {
        match self {
            RoomCap::AtMost(n) => Some(*n),
            RoomCap::Unbounded | RoomCap::Unspecified => None,
        }
    }
}

impl Serialize for RoomCap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RoomCap::AtMost(n) => serializer.serialize_u32(*n),
            RoomCap::Unbounded | RoomCap::Unspecified => serializer.serialize_none(),
        }
    }
}

/// The filter snapshot of a saved search. Every field is optional: a
/// missing field falls back to the session defaults when hydrated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedSearchFilters {
    pub free_text_search: Option<String>,
    pub location: Option<String>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub min_rooms: Option<u32>,
    pub max_rooms: RoomCap,
    pub property_types: Option<Vec<String>>,
    pub status: Option<String>,
}

/// Stored shape: `free_text_search`, `price: [min, max]`, the rest camel
/// case. A half-known price range falls back to `priceMin`/`priceMax`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredFilters<'a> {
    #[serde(rename = "free_text_search", skip_serializing_if = "Option::is_none")]
    free_text_search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<[i64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_rooms: Option<u32>,
    #[serde(skip_serializing_if = "RoomCap::is_unspecified")]
    max_rooms: RoomCap,
    #[serde(skip_serializing_if = "Option::is_none")]
    property_types: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

impl Serialize for SavedSearchFilters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let price = match (self.price_min, self.price_max) {
            (Some(min), Some(max)) => Some([min, max]),
            _ => None,
        };
        StoredFilters {
            free_text_search: self.free_text_search.as_deref(),
            location: self.location.as_deref(),
            price,
            price_min: price.is_none().then_some(self.price_min).flatten(),
            price_max: price.is_none().then_some(self.price_max).flatten(),
            min_rooms: self.min_rooms,
            max_rooms: self.max_rooms,
            property_types: self.property_types.as_deref(),
            status: self.status.as_deref(),
        }
        .serialize(serializer)
    }
}

impl SavedSearchFilters {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve into a full filter state. `query` is the saved search's
    /// display text, used when no free text was stored.
    pub fn hydrate(&self, query: &str, defaults: &FilterState) -> FilterState {
        let free_text = self
            .free_text_search
            .clone()
            .or_else(|| (!query.is_empty()).then(|| query.to_string()))
            .unwrap_or_else(|| defaults.free_text.clone());

        FilterState {
            free_text,
            location: self
                .location
                .clone()
                .unwrap_or_else(|| defaults.location.clone()),
            price: PriceRange::new(
                self.price_min.unwrap_or(defaults.price.min()),
                self.price_max.unwrap_or(defaults.price.max()),
            ),
            min_rooms: self.min_rooms.unwrap_or(defaults.min_rooms),
            max_rooms: self.max_rooms.bound(),
            property_types: match &self.property_types {
                Some(types) => types.iter().map(|t| t.to_lowercase()).collect(),
                None => defaults.property_types.clone(),
            },
            status: self.status.clone().or_else(|| defaults.status.clone()),
        }
    }
}

/// Snapshot of `filters` to persist alongside a new saved search
pub fn to_persisted_filters(filters: &FilterState) -> SavedSearchFilters {
    SavedSearchFilters {
        free_text_search: (!filters.free_text.is_empty()).then(|| filters.free_text.clone()),
        location: (!filters.location.is_empty()).then(|| filters.location.clone()),
        price_min: Some(filters.price.min()),
        price_max: Some(filters.price.max()),
        min_rooms: Some(filters.min_rooms),
        max_rooms: RoomCap::from_bound(filters.effective_max_rooms()),
        property_types: Some(filters.property_types.iter().cloned().collect()),
        status: filters.status.clone(),
    }
}

/// Body of `POST /users/{id}/searches`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewSavedSearch {
    pub query: String,
    pub location: String,
    pub price_min: i64,
    pub price_max: i64,
    pub rooms_min: u32,
    /// `0` when unbounded
    pub rooms_max: u32,
    pub property_types: Vec<String>,
    pub send_email: bool,
    pub filters: SavedSearchFilters,
}

impl NewSavedSearch {
    /// `None` when the filters have neither free text nor a location to
    /// name the search by.
    pub fn from_filters(filters: &FilterState, send_email: bool) -> Option<Self> {
        let query = filters.saved_search_query()?;
        Some(Self {
            query,
            location: filters.location.clone(),
            price_min: filters.price.min(),
            price_max: filters.price.max(),
            rooms_min: filters.min_rooms,
            rooms_max: filters.effective_max_rooms().unwrap_or(0),
            property_types: filters
                .property_types
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            send_email,
            filters: to_persisted_filters(filters),
        })
    }
}

fn room_cap(raw: &Value, keys: &[&str]) -> RoomCap {
    let Some(value) = keys.iter().find_map(|key| raw.get(key)) else {
        return RoomCap::Unspecified;
    };
    if value.is_null() {
        return RoomCap::Unbounded;
    }
    match count(raw, keys) {
        Some(n) => RoomCap::from_bound(Some(n)),
        None => RoomCap::Unspecified,
    }
}

fn lowercase_types(raw: &Value, keys: &[&str]) -> Option<Vec<String>> {
    field(raw, keys)
        .and_then(string_list)
        .map(|types| types.into_iter().map(|t| t.to_lowercase()).collect())
}

/// Read a structured filters object. Camel-case keys win over the
/// snake-case fallbacks.
fn decode_object(obj: &Value) -> SavedSearchFilters {
    let (mut price_min, mut price_max) = (None, None);
    if let Some(Value::Array(pair)) = obj.get("price") {
        if let [min, max] = pair.as_slice() {
            price_min = as_number(min).map(|n| n.round() as i64);
            price_max = as_number(max).map(|n| n.round() as i64);
        }
    }

    SavedSearchFilters {
        free_text_search: text(obj, &["freeTextSearch", "free_text_search", "query"]),
        location: text(obj, &["location"]),
        price_min: price_min.or_else(|| whole(obj, &["priceMin", "minPrice", "price_min"])),
        price_max: price_max.or_else(|| whole(obj, &["priceMax", "maxPrice", "price_max"])),
        min_rooms: count(obj, &["minRooms", "rooms_min"]),
        max_rooms: room_cap(obj, &["maxRooms", "rooms_max"]),
        property_types: lowercase_types(obj, &["propertyTypes", "property_types"]),
        status: text(obj, &["status", "status_name"]),
    }
}

fn structured_object(record: &Value) -> Detection<SavedSearchFilters> {
    match record.get("filters") {
        Some(obj @ Value::Object(_)) => {
            let decoded = decode_object(obj);
            if decoded.is_empty() {
                Detection::Skip
            } else {
                Detection::Match(decoded)
            }
        }
        _ => Detection::Skip,
    }
}

fn json_string(record: &Value) -> Detection<SavedSearchFilters> {
    let Some(Value::String(encoded)) = record.get("filters") else {
        return Detection::Skip;
    };
    if encoded.trim().is_empty() {
        return Detection::Skip;
    }
    match serde_json::from_str::<Value>(encoded) {
        Ok(obj @ Value::Object(_)) => {
            let decoded = decode_object(&obj);
            if decoded.is_empty() {
                Detection::Skip
            } else {
                Detection::Match(decoded)
            }
        }
        Ok(_) => Detection::Malformed("filters string is not a JSON object".to_string()),
        Err(e) => Detection::Malformed(format!("filters string is not valid JSON: {}", e)),
    }
}

const FLAT_FIELDS: [&str; 8] = [
    "price_min",
    "price_max",
    "rooms_min",
    "rooms_max",
    "property_types",
    "location",
    "status_name",
    "query",
];

fn flat_fields(record: &Value) -> Detection<SavedSearchFilters> {
    if field(record, &FLAT_FIELDS).is_none() {
        return Detection::Skip;
    }
    Detection::Match(SavedSearchFilters {
        free_text_search: text(record, &["query"]),
        location: text(record, &["location"]),
        price_min: whole(record, &["price_min"]),
        price_max: whole(record, &["price_max"]),
        min_rooms: count(record, &["rooms_min"]),
        max_rooms: match count(record, &["rooms_max"]) {
            Some(n) => RoomCap::from_bound(Some(n)),
            None => RoomCap::Unspecified,
        },
        property_types: lowercase_types(record, &["property_types"]),
        status: text(record, &["status_name"]),
    })
}

const FILTER_SHAPES: [Detector<SavedSearchFilters>; 3] = [
    Detector {
        name: "structured filters",
        detect: structured_object,
    },
    Detector {
        name: "JSON-encoded filters",
        detect: json_string,
    },
    Detector {
        name: "flat saved-search fields",
        detect: flat_fields,
    },
];

/// Filter snapshot of a raw saved-search record, or `None` when the record
/// has nothing to restore from.
pub fn decode_filters(record: &Value) -> Option<SavedSearchFilters> {
    first_match(record, &FILTER_SHAPES)
}

/// Decode and hydrate in one step
pub fn from_persisted(record: &Value, defaults: &FilterState) -> Option<FilterState> {
    let query = text(record, &["query"]).unwrap_or_default();
    decode_filters(record).map(|filters| filters.hydrate(&query, defaults))
}
