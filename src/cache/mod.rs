//! Caching layer for card data and images

pub mod card_cache;
pub mod image_cache;

pub use card_cache::{CacheKey, CardCache};
pub use image_cache::{ImageCache, SizePreset};
