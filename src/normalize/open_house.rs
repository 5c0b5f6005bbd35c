use super::{collection_items, id_field, text, timestamp};
use crate::models::OpenHouse;
use serde_json::Value;

pub fn normalize_open_house(raw: &Value) -> OpenHouse {
    OpenHouse {
        id: id_field(raw, &["id"]).unwrap_or_else(|| "unknown".to_string()),
        listing_id: id_field(raw, &["listing_id", "listingId"]),
        starts_at: timestamp(raw, &["starts_at", "startsAt"]),
        ends_at: timestamp(raw, &["ends_at", "endsAt"]),
        kind: text(raw, &["type", "type_name"]).unwrap_or_else(|| "Visning".to_string()),
        note: text(raw, &["note"]),
    }
}

pub fn normalize_open_houses(raw: &Value) -> Vec<OpenHouse> {
    collection_items(raw).iter().map(normalize_open_house).collect()
}
