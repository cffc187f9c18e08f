//! HTTP API surface (axum).

pub mod routes;

pub use routes::router;
