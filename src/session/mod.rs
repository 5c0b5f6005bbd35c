pub mod auth;
pub mod search;

pub use auth::{AuthSession, AuthState, LOGIN_FAILED, SESSION_EXPIRED};
pub use search::{SearchOutcome, SearchSession, SearchStatus, SearchView, LISTINGS_FAILED};
