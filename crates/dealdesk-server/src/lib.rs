//! # dealdesk-server
//!
//! Axum REST surface over the deal-lifecycle engine: the response
//! envelope, bearer-token principal extraction, and thin HTTP adapters
//! around the entity services.

pub mod auth;
pub mod envelope;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
