pub mod query;
pub mod saved_search;

pub use query::{
    decode_from_url_params, encode_to_api_params, encode_to_url_params, parse_query_string,
    to_query_string, Page, QueryPairs,
};
pub use saved_search::{
    decode_filters, from_persisted, to_persisted_filters, NewSavedSearch, RoomCap,
    SavedSearchFilters,
};
