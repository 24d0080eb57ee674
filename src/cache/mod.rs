//! # Cache Module
//!
//! Bounded caches for the search and download paths.
//!
//! ## Cache Types
//!
//! - **Search results** ([`SearchCache`]): in-memory LRU keyed by the
//!   normalized query string. Lost on restart.
//! - **Audio artifacts** ([`DiskArtifactStore`]): the download directory
//!   itself. Capped by file count and total bytes, evicted by access time.
//!
//! ## Configuration
//!
//! ```env
//! SEARCH_CACHE_SIZE=15           # Maximum number of cached queries
//! MAX_FILES=10                   # Maximum number of audio files on disk
//! MAX_TOTAL_BYTES=524288000      # 500 MiB across all audio files
//! ALLOWED_EXTENSIONS=mp3,webm,m4a
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use roombox_audio::cache::SearchCache;
//! use serde_json::json;
//!
//! # fn example() {
//! let cache = SearchCache::new(15);
//!
//! cache.put("daft punk".to_string(), vec![json!({"videoId": "abc123"})]);
//!
//! if let Some(results) = cache.get("daft punk") {
//!     println!("{} cached results", results.len());
//! }
//! # }
//! ```

pub mod disk_store;
pub mod lru_cache;

pub use disk_store::{DiskArtifactStore, StoreLimits, SweepReport};
use lru_cache::LRUCache;

/// One search result as returned by the catalog. Passed through untouched.
pub type SearchResult = serde_json::Value;

/// Cache of search results keyed by normalized query.
///
/// # Performance Characteristics
///
/// - **Get Operations**: O(log n) for the recency update
/// - **Put Operations**: O(log n) plus one removal per evicted key
/// - **Concurrency**: one mutex for the whole map and its recency order
pub type SearchCache = LRUCache<String, Vec<SearchResult>>;
