pub mod engine;
pub mod favorites;
pub mod saved_searches;

pub use engine::{LocalChange, MutationOutcome, OptimisticStore};
pub use favorites::{Favorites, FAVORITES_FAILED};
pub use saved_searches::{SavedSearches, DELETE_SEARCH_FAILED, SAVE_SEARCH_FAILED};
