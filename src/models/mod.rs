pub mod filters;

use crate::codec::saved_search::SavedSearchFilters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use filters::{FilterState, PriceRange};

/// Listing agent contact details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Broker {
    pub name: String,
    pub phone: String,
}

/// Core property data model, one per listing record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub address: String,
    pub price: i64,
    pub rooms: f32,
    /// Living area in square meters
    pub area: f32,
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    /// Never empty
    pub images: Vec<String>,
    pub description: String,
    pub broker: Broker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Property {
    /// Images to show on the detail page: the media endpoint's list when it
    /// has anything, the listing's own images otherwise.
    pub fn gallery(&self, media: &[String]) -> Vec<String> {
        if media.is_empty() {
            self.images.clone()
        } else {
            media.to_vec()
        }
    }
}

/// A persisted search belonging to the current user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedSearch {
    pub id: String,
    /// Display text, also the fallback free text when `filters` is absent
    pub query: String,
    pub email_alerts_enabled: bool,
    pub filters: Option<SavedSearchFilters>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Scheduled viewing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenHouse {
    pub id: String,
    /// Absent when the viewing is not tied to a listing
    pub listing_id: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: String,
    pub note: Option<String>,
}

/// Bearer token issued by `POST /token`. Opaque to this crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The authenticated user together with the credential that proved it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: Option<String>,
    pub credential: Credential,
}

impl Identity {
    /// Two identities are the same user when ids and credentials match
    pub fn same_user(&self, other: &Identity) -> bool {
        self.user_id == other.user_id && self.credential == other.credential
    }
}
