//! Persistent image cache with deduplicated background downloads
//!
//! Each (URL, size preset) pair maps to one re-encoded PNG at a deterministic
//! path derived from a hash of the URL. Downloads run on worker threads and
//! concurrent requests for the same pair share a single transfer.

use crate::error::{CollectionError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

const USER_AGENT: &str = "MTG-Collection/0.1";

/// Pause between transfers when preloading, so a batch of lazy-loaded card
/// images does not hammer the CDN
const PRELOAD_PAUSE: Duration = Duration::from_millis(100);

/// Named target dimensions for cached images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizePreset {
    Thumbnail,
    Medium,
    Large,
    Original,
}

impl SizePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizePreset::Thumbnail => "thumbnail",
            SizePreset::Medium => "medium",
            SizePreset::Large => "large",
            SizePreset::Original => "original",
        }
    }

    /// Target box in pixels; `None` means keep the source dimensions
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            SizePreset::Thumbnail => Some((146, 204)),
            SizePreset::Medium => Some((223, 311)),
            SizePreset::Large => Some((488, 680)),
            SizePreset::Original => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "thumbnail" => Some(SizePreset::Thumbnail),
            "medium" => Some(SizePreset::Medium),
            "large" => Some(SizePreset::Large),
            "original" => Some(SizePreset::Original),
            _ => None,
        }
    }
}

/// Completion callback for a background download: `(success, cached path)`.
/// Fires exactly once per `download` call, on the worker thread.
pub type DownloadCallback = Box<dyn FnOnce(bool, Option<PathBuf>) + Send + 'static>;

/// Progress callback for `preload`: `(completed, total)` after each URL
pub type PreloadProgress = Box<dyn FnMut(usize, usize) + Send + 'static>;

type ImageKey = (String, SizePreset);

struct Inner {
    cache_dir: PathBuf,
    http: reqwest::blocking::Client,
    /// Downloads currently running, with the callbacks waiting on each.
    /// Checked-and-inserted atomically; this set is what keeps two view
    /// refreshes from fetching the same image twice.
    in_flight: Mutex<HashMap<ImageKey, Vec<DownloadCallback>>>,
    /// Decoded images kept for immediate reuse
    memory: Mutex<HashMap<ImageKey, Arc<DynamicImage>>>,
}

/// Persistent cache for card images.
///
/// Cheap to clone; clones share the cache directory, the in-flight set and
/// the in-memory layer.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<Inner>,
}

impl ImageCache {
    /// Create an image cache rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            log::warn!("Failed to create image cache directory: {}", e);
        }
        log::info!("Image cache directory: {:?}", cache_dir);
        Self {
            inner: Arc::new(Inner {
                cache_dir,
                http: reqwest::blocking::Client::new(),
                in_flight: Mutex::new(HashMap::new()),
                memory: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Default cache directory location
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mtg_collection")
            .join("images")
    }

    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    /// Deterministic filename from the URL hash and the preset name
    fn filename(url: &str, size: SizePreset) -> String {
        let digest = Sha256::digest(url.as_bytes());
        format!("{}_{}.png", hex::encode(&digest[..8]), size.as_str())
    }

    fn path_for(&self, url: &str, size: SizePreset) -> PathBuf {
        self.inner.cache_dir.join(Self::filename(url, size))
    }

    /// Check if an image is cached on disk
    pub fn is_cached(&self, url: &str, size: SizePreset) -> bool {
        !url.is_empty() && self.path_for(url, size).exists()
    }

    /// Cached image path if present on disk; never triggers a download
    pub fn get_path(&self, url: &str, size: SizePreset) -> Option<PathBuf> {
        if url.is_empty() {
            return None;
        }
        let path = self.path_for(url, size);
        path.exists().then_some(path)
    }

    /// Download and cache an image off the caller's thread.
    ///
    /// If the file is already cached the callback fires immediately on the
    /// calling thread. If a download for the same (URL, size) pair is in
    /// flight, no second transfer starts; the callback is queued onto the
    /// running one. Every callback fires exactly once, success or not.
    pub fn download(&self, url: &str, size: SizePreset, on_complete: Option<DownloadCallback>) {
        if url.is_empty() {
            if let Some(cb) = on_complete {
                cb(false, None);
            }
            return;
        }

        let path = self.path_for(url, size);
        if path.exists() {
            if let Some(cb) = on_complete {
                cb(true, Some(path));
            }
            return;
        }

        let key = (url.to_string(), size);
        {
            let mut in_flight = self.inner.in_flight.lock().unwrap();
            if let Some(waiters) = in_flight.get_mut(&key) {
                log::debug!("Download already in flight for {}", url);
                if let Some(cb) = on_complete {
                    waiters.push(cb);
                }
                return;
            }
            in_flight.insert(key, on_complete.into_iter().collect());
        }

        let cache = self.clone();
        let url = url.to_string();
        std::thread::spawn(move || cache.perform_download(&url, size));
    }

    /// Worker body: fetch, store, then drain and fire the registered
    /// callbacks. Must only run for the thread that won the in-flight insert.
    fn perform_download(&self, url: &str, size: SizePreset) {
        let path = self.path_for(url, size);
        let result = if path.exists() {
            Ok(path)
        } else {
            self.fetch_and_store(url, size)
        };

        let (success, path) = match result {
            Ok(path) => (true, Some(path)),
            Err(e) => {
                log::warn!("Failed to download image {}: {}", url, e);
                (false, None)
            }
        };

        let key = (url.to_string(), size);
        let waiters = self
            .inner
            .in_flight
            .lock()
            .unwrap()
            .remove(&key)
            .unwrap_or_default();
        for cb in waiters {
            cb(success, path.clone());
        }
    }

    /// Blocking fetch + re-encode at the preset box + write to the
    /// deterministic path. Presets use their exact width and height; a
    /// source with a different aspect ratio is distorted rather than padded.
    fn fetch_and_store(&self, url: &str, size: SizePreset) -> Result<PathBuf> {
        log::debug!("Downloading image: {}", url);
        let response = self
            .inner
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()?;
        if !response.status().is_success() {
            return Err(CollectionError::HttpStatus(response.status()));
        }
        let bytes = response.bytes()?;

        let mut img = image::load_from_memory(&bytes)
            .map_err(|e| CollectionError::Image(e.to_string()))?;
        if let Some((w, h)) = size.dimensions() {
            img = img.resize_exact(w, h, FilterType::Lanczos3);
        }

        let path = self.path_for(url, size);
        img.save(&path)
            .map_err(|e| CollectionError::Image(e.to_string()))?;
        log::debug!("Image cached: {:?}", path);

        self.inner
            .memory
            .lock()
            .unwrap()
            .insert((url.to_string(), size), Arc::new(img));
        Ok(path)
    }

    /// A displayable image, without ever touching the network: the in-memory
    /// decoded copy if present, else the on-disk file decoded fresh, else a
    /// generated placeholder at the preset's dimensions.
    pub fn get_or_placeholder(&self, url: &str, size: SizePreset) -> Arc<DynamicImage> {
        let key = (url.to_string(), size);
        if let Some(img) = self.inner.memory.lock().unwrap().get(&key) {
            return Arc::clone(img);
        }

        if let Some(path) = self.get_path(url, size) {
            match image::open(&path) {
                Ok(img) => {
                    let img = Arc::new(img);
                    self.inner
                        .memory
                        .lock()
                        .unwrap()
                        .insert(key, Arc::clone(&img));
                    return img;
                }
                Err(e) => log::warn!("Failed to decode cached image {:?}: {}", path, e),
            }
        }

        Arc::new(Self::placeholder(size))
    }

    /// Neutral placeholder shown while an image is missing: dark fill with a
    /// white border at the preset's box
    pub fn placeholder(size: SizePreset) -> DynamicImage {
        let (w, h) = size.dimensions().unwrap_or((223, 311));
        let fill = Rgba([44u8, 62, 80, 255]);
        let border = Rgba([255u8, 255, 255, 255]);

        let mut img = RgbaImage::from_pixel(w, h, fill);
        for x in 0..w {
            for t in 0..2u32.min(h) {
                img.put_pixel(x, t, border);
                img.put_pixel(x, h - 1 - t, border);
            }
        }
        for y in 0..h {
            for t in 0..2u32.min(w) {
                img.put_pixel(t, y, border);
                img.put_pixel(w - 1 - t, y, border);
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    /// Preload images on one worker thread, skipping anything already
    /// cached and pausing briefly between transfers. Reports
    /// `(completed, total)` after each URL.
    pub fn preload(
        &self,
        urls: Vec<String>,
        size: SizePreset,
        mut on_progress: Option<PreloadProgress>,
    ) {
        if urls.is_empty() {
            return;
        }
        let cache = self.clone();
        std::thread::spawn(move || {
            let total = urls.len();
            for (i, url) in urls.iter().enumerate() {
                if !url.is_empty() && !cache.is_cached(url, size) {
                    let key = (url.clone(), size);
                    let owner = {
                        let mut in_flight = cache.inner.in_flight.lock().unwrap();
                        if in_flight.contains_key(&key) {
                            false
                        } else {
                            in_flight.insert(key, Vec::new());
                            true
                        }
                    };
                    if owner {
                        cache.perform_download(url, size);
                    }
                    std::thread::sleep(PRELOAD_PAUSE);
                }
                if let Some(cb) = on_progress.as_mut() {
                    cb(i + 1, total);
                }
            }
        });
    }

    /// Delete cached files older than `days`. Returns how many were removed.
    pub fn evict_older_than(&self, days: u64) -> usize {
        let cutoff = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
        self.evict_before(cutoff)
    }

    /// Delete cached files whose modification time is strictly before
    /// `cutoff`. Per-file errors are skipped, never fatal to the sweep.
    pub fn evict_before(&self, cutoff: SystemTime) -> usize {
        let entries = match std::fs::read_dir(&self.inner.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to read image cache directory: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    log::warn!("Skipping {:?} during eviction: {}", path, e);
                    continue;
                }
            };
            if modified < cutoff {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!("Failed to remove {:?}: {}", path, e),
                }
            }
        }
        log::info!("Evicted {} cached images", removed);
        removed
    }
}

#[cfg(test)]
#[path = "image_cache_tests.rs"]
mod tests;
