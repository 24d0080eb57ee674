pub mod download;
pub mod files;
pub mod liveness;
pub mod search;
