//! HTTP API over the model cache

pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::{AppState, create_router};
