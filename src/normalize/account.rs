use super::{as_number, collection_items, field, id_field, id_string, text};
use crate::models::{Credential, Identity};
use serde_json::Value;

/// Bearer token out of a `POST /token` response
pub fn normalize_token(raw: &Value) -> Option<Credential> {
    text(raw, &["access_token", "token"]).map(Credential::new)
}

/// The `GET /users/me` payload as an identity. `user_id` may be a number
/// or a numeric string; anything else means there is no usable identity.
pub fn normalize_identity(raw: &Value, credential: Credential) -> Option<Identity> {
    let user_id = field(raw, &["user_id", "id"])
        .and_then(as_number)
        .and_then(|n| id_string(&Value::from(n)))?;
    Some(Identity {
        user_id,
        username: text(raw, &["username", "email"]),
        credential,
    })
}

/// Listing ids of the user's saved listings
pub fn normalize_saved_listing_ids(raw: &Value) -> Vec<String> {
    collection_items(raw)
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => id_field(item, &["listing_id", "listingId", "id"]),
            other => id_string(other),
        })
        .collect()
}
