//! Web server module
//!
//! Provides the JSON HTTP API in front of the search orchestrator.

mod handlers;
mod routes;
mod state;

pub use handlers::ApiError;
pub use routes::create_router;
pub use state::AppState;
