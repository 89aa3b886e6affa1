//! MTG collection manager core
//!
//! Offline-first card data layer: a multi-key card cache backed by a single
//! JSON document, a bulk ingestion pipeline for Scryfall bulk datasets, and a
//! deduplicating image cache. UI and collection CRUD layers sit on top and
//! only ever call into the cache types; the network is an implementation
//! detail behind them.

pub mod api;
pub mod bulk;
pub mod cache;
pub mod error;
pub mod models;

// Re-export commonly used items
pub use api::{ScryfallClient, SetInfo};
pub use bulk::{ingest_bulk_dataset, BulkProgress, IngestSummary};
pub use cache::{CacheKey, CardCache, ImageCache, SizePreset};
pub use error::{CollectionError, Result};
pub use models::CardRecord;
