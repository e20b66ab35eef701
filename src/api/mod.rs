//! Screening HTTP API.
//!
//! Exposes the screening session to a browser front end as JSON
//! endpoints under `/api/`. `screening_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::screening_api_router;
pub use server::{start_api_server, ApiServer, ServerError};
pub use types::ApiContext;
