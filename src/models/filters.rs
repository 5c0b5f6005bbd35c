use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Price window used when nothing else has been chosen
pub const DEFAULT_PRICE_RANGE: (i64, i64) = (2_000_000, 9_000_000);

/// Inclusive price window, always ordered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceRange {
    min: i64,
    max: i64,
}

impl PriceRange {
    /// Build a range from two bounds in any order
    pub fn new(a: i64, b: i64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_RANGE.0, DEFAULT_PRICE_RANGE.1)
    }
}

/// Canonical search criteria, independent of how they are encoded.
///
/// Each field has an "unset" marker: empty string for the text fields,
/// `0` for `min_rooms`, `None` (or `Some(0)`) for `max_rooms`, an empty set
/// for `property_types` and `None` for `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterState {
    pub free_text: String,
    pub location: String,
    pub price: PriceRange,
    pub min_rooms: u32,
    pub max_rooms: Option<u32>,
    /// Lower-cased category tags
    pub property_types: BTreeSet<String>,
    pub status: Option<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            status: Some("for_sale".to_string()),
            ..Self::unset()
        }
    }
}

impl FilterState {
    /// Every field at its "unset" marker, default price window
    pub fn unset() -> Self {
        Self {
            free_text: String::new(),
            location: String::new(),
            price: PriceRange::default(),
            min_rooms: 0,
            max_rooms: None,
            property_types: BTreeSet::new(),
            status: None,
        }
    }

    /// Upper room bound, with `0` folded into "no bound"
    pub fn effective_max_rooms(&self) -> Option<u32> {
        self.max_rooms.filter(|max| *max > 0)
    }

    pub fn with_free_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = text.into();
        self
    }

    /// Add the type if missing, remove it otherwise
    pub fn toggle_property_type(&mut self, kind: &str) {
        let kind = kind.trim().to_lowercase();
        if kind.is_empty() {
            return;
        }
        if !self.property_types.remove(&kind) {
            self.property_types.insert(kind);
        }
    }

    /// Text a saved search is stored under: free text, else location
    pub fn saved_search_query(&self) -> Option<String> {
        [&self.free_text, &self.location]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn rooms_summary(&self) -> String {
        let min = (self.min_rooms > 0).then(|| self.min_rooms.to_string());
        let max = self.effective_max_rooms().map(|m| m.to_string());
        match (min, max) {
            (None, None) => "Any rooms".to_string(),
            (min, max) => format!(
                "{}–{} rooms",
                min.as_deref().unwrap_or("Any"),
                max.as_deref().unwrap_or("Any")
            ),
        }
    }

    pub fn types_summary(&self) -> String {
        if self.property_types.is_empty() {
            "Any type".to_string()
        } else {
            self.property_types
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
