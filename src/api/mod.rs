//! API Module
//!
//! HTTP handlers and routing for the cache inspection API.
//!
//! # Endpoints
//! - `GET /get/:key` - Read a key through the cache
//! - `PUT /set` - Write a key to the backing store
//! - `DELETE /cache/:key` - Invalidate a cached key
//! - `POST /cache/clear` - Clear the cache
//! - `POST /cache/maintenance` - Run an expiry sweep
//! - `GET /stats` - Get cache metrics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
