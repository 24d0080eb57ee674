//! Music search and on-demand audio extraction with bounded caches.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod server;
pub mod sources;
