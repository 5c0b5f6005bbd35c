use super::{collection_items, field, id_field, text, timestamp};
use crate::codec::saved_search::decode_filters;
use crate::models::SavedSearch;
use serde_json::Value;

pub fn normalize_saved_search(raw: &Value) -> SavedSearch {
    SavedSearch {
        id: id_field(raw, &["id"]).unwrap_or_else(|| "unknown".to_string()),
        query: text(raw, &["query", "name"]).unwrap_or_default(),
        email_alerts_enabled: field(raw, &["send_email", "sendEmail", "emailAlertsEnabled"])
            .and_then(Value::as_bool)
            .unwrap_or(false),
        filters: decode_filters(raw),
        created_at: timestamp(raw, &["created_at", "createdAt"]),
        updated_at: timestamp(raw, &["updated_at", "updatedAt"]),
    }
}

pub fn normalize_saved_searches(raw: &Value) -> Vec<SavedSearch> {
    collection_items(raw)
        .iter()
        .map(normalize_saved_search)
        .collect()
}
