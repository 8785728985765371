//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value under a key
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `POST /warm` - Bulk-load entries
//! - `POST /clear-expired` - Sweep expired entries
//! - `GET /stats` - Get cache statistics
//! - `POST /sessions` - Create a session
//! - `GET|PATCH|DELETE /sessions/:id` - Read, update or delete a session
//! - `POST /sessions/cleanup` - Sweep expired sessions
//! - `GET /users/:user_id/sessions` - List a user's live sessions
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
