//! Client-side state for a home search: filters that round-trip through the
//! URL, a results session that only ever shows its latest response,
//! debounced suggestions, and favorites and saved searches that update
//! locally first and roll back when the backend refuses.

pub mod api;
pub mod app;
pub mod autocomplete;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod mutation;
pub mod normalize;
pub mod session;

pub use api::{HttpApi, ListingsApi};
pub use app::{HomeSearch, ListingDetail};
pub use autocomplete::{Autocomplete, SuggestOutcome};
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use models::{FilterState, Identity, Property, SavedSearch};
pub use mutation::MutationOutcome;
pub use session::{SearchOutcome, SearchSession, SearchStatus};
