//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /entries` - Store a value
//! - `GET /entries/:id` - Retrieve a value by id or alias
//! - `DELETE /entries/:id` - Delete an entry
//! - `PUT /entries/:id/aliases` - Bind an alias
//! - `POST /verification/:token/resend` - Count a verification resend
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
