use super::{
    collection_items, first_match, id_field, number, string_list, text, whole, Detection,
    Detector,
};
use crate::models::{Broker, Property};
use serde_json::Value;

/// Shown when a listing has no usable image at all
pub const PLACEHOLDER_IMAGE: &str =
    "https://images.unsplash.com/photo-1505691938895-1758d7feb511?auto=format&fit=crop&w=1200&q=80";

const IMAGE_SHAPES: [Detector<Vec<String>>; 2] = [
    Detector {
        name: "image list",
        detect: image_list,
    },
    Detector {
        name: "single image",
        detect: single_image,
    },
];

fn image_list(raw: &Value) -> Detection<Vec<String>> {
    match raw.get("images").and_then(string_list) {
        Some(images) if !images.is_empty() => Detection::Match(images),
        _ => Detection::Skip,
    }
}

fn single_image(raw: &Value) -> Detection<Vec<String>> {
    match text(raw, &["image", "image_url", "imageUrl"]) {
        Some(image) => Detection::Match(vec![image]),
        None => Detection::Skip,
    }
}

fn address(raw: &Value) -> Option<String> {
    if let Some(nested) = raw.get("address").filter(|a| a.is_object()) {
        if let Some(found) = text(nested, &["street_address", "streetAddress", "street", "city"]) {
            return Some(found);
        }
    }
    text(raw, &["street_address", "streetAddress", "address", "city"])
}

fn broker(raw: &Value) -> Broker {
    let nested = raw.get("broker").filter(|b| b.is_object());
    let name = text(raw, &["agent_name", "broker_name"])
        .or_else(|| nested.and_then(|b| text(b, &["name"])))
        .or_else(|| text(raw, &["agency"]))
        .unwrap_or_else(|| "Unknown broker".to_string());
    let phone = text(raw, &["agent_phone", "broker_phone"])
        .or_else(|| nested.and_then(|b| text(b, &["phone"])))
        .unwrap_or_else(|| "Not listed".to_string());
    Broker { name, phone }
}

/// Normalize one listing record, from either the list or the detail endpoint
pub fn normalize_listing(raw: &Value) -> Property {
    let images = first_match(raw, &IMAGE_SHAPES)
        .unwrap_or_else(|| vec![PLACEHOLDER_IMAGE.to_string()]);

    Property {
        id: id_field(raw, &["id", "listing_id", "listingId"])
            .unwrap_or_else(|| "unknown".to_string()),
        title: text(raw, &["title", "heading"]).unwrap_or_else(|| "Untitled home".to_string()),
        address: address(raw).unwrap_or_else(|| "Address unavailable".to_string()),
        price: whole(raw, &["list_price", "listPrice", "price"]).unwrap_or(0),
        rooms: number(raw, &["rooms"]).filter(|r| *r >= 0.0).unwrap_or(0.0) as f32,
        area: number(raw, &["living_area_sqm", "livingAreaSqm", "area", "sqm"])
            .unwrap_or(0.0) as f32,
        kind: text(raw, &["property_type", "propertyType", "type"])
            .unwrap_or_else(|| "Unknown".to_string()),
        image: images[0].clone(),
        images,
        description: text(raw, &["description"])
            .unwrap_or_else(|| "No description available.".to_string()),
        broker: broker(raw),
        tags: raw.get("tags").and_then(string_list),
        status: text(raw, &["status", "status_name"]),
    }
}

/// Normalize a listings response, bare list or `{count, items}` envelope
pub fn normalize_listings(raw: &Value) -> Vec<Property> {
    collection_items(raw).iter().map(normalize_listing).collect()
}

/// Image URLs of a media response, ordered by `position`.
///
/// Items without a position sort last; ties keep response order. Items
/// without a URL are dropped.
pub fn normalize_media(raw: &Value) -> Vec<String> {
    let mut items: Vec<(i64, usize, &Value)> = collection_items(raw)
        .iter()
        .enumerate()
        .map(|(idx, item)| (whole(item, &["position"]).unwrap_or(i64::MAX), idx, item))
        .collect();
    items.sort_by_key(|(position, idx, _)| (*position, *idx));

    items
        .into_iter()
        .filter_map(|(_, _, item)| match item {
            Value::String(url) => Some(url.trim().to_string()).filter(|u| !u.is_empty()),
            _ => text(item, &["url"]),
        })
        .collect()
}

/// Suggestion labels of an autocomplete response, capped at `limit`
pub fn normalize_suggestions(raw: &Value, limit: usize) -> Vec<String> {
    collection_items(raw)
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            _ => text(item, &["title", "name", "city"]),
        })
        .take(limit)
        .collect()
}
