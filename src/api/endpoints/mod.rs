//! API endpoint handlers.
//!
//! Handlers are thin: they extract input, call into the session or runner
//! and map errors through `ApiError`.

pub mod analysis;
pub mod blob;
pub mod documents;
pub mod health;
pub mod screening;
