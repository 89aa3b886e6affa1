//! Rate-limited Scryfall API client
//!
//! All requests go through one throttle shared across clones of a client, so
//! consecutive calls are at least [`DEFAULT_MIN_INTERVAL`] apart regardless of
//! which endpoint they hit.

use crate::error::{CollectionError, Result};
use crate::models::CardRecord;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Production API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.scryfall.com";

/// Minimum delay between consecutive requests from one client instance
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

const USER_AGENT: &str = "MTG-Collection/0.1";
const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Scryfall API error response
#[derive(Debug, Deserialize)]
pub struct ScryfallError {
    #[serde(default)]
    pub status: u16,
    pub code: String,
    pub details: String,
}

/// One page of a free-text card search
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_cards: u64,
    #[serde(default)]
    pub has_more: bool,
    pub data: Vec<CardRecord>,
}

/// Full set listing
#[derive(Debug, Deserialize)]
pub struct SetList {
    #[serde(default)]
    pub has_more: bool,
    pub data: Vec<SetInfo>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SetInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub card_count: u64,
    #[serde(default)]
    pub released_at: Option<String>,
    #[serde(default)]
    pub set_type: Option<String>,
}

/// Bulk dataset manifest (`/bulk-data`)
#[derive(Debug, Deserialize)]
pub struct BulkManifest {
    pub data: Vec<BulkEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BulkEntry {
    /// Dataset variant, e.g. "default_cards" or "all_cards"
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub download_uri: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Blocking Scryfall client with a per-instance request throttle.
///
/// Clones share the throttle, so handing copies to several components still
/// enforces one process-wide pace per original instance.
#[derive(Clone)]
pub struct ScryfallClient {
    base_url: String,
    http: reqwest::blocking::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl ScryfallClient {
    /// Create a client against the production API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
            min_interval: DEFAULT_MIN_INTERVAL,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the minimum inter-request interval
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Look up a single card by name.
    ///
    /// `exact` selects exact matching; otherwise Scryfall's fuzzy matcher is
    /// used, which tolerates misspellings and partial names.
    pub fn named(&self, name: &str, exact: bool) -> Result<CardRecord> {
        let param = if exact { "exact" } else { "fuzzy" };
        let url = format!(
            "{}/cards/named?{}={}",
            self.base_url,
            param,
            urlencoding::encode(name)
        );
        self.get_json(&url)
    }

    /// Look up a single card by its Scryfall id
    pub fn card_by_id(&self, id: &str) -> Result<CardRecord> {
        let url = format!("{}/cards/{}", self.base_url, id);
        self.get_json(&url)
    }

    /// Free-text card search, paginated (pages start at 1)
    pub fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let url = format!(
            "{}/cards/search?q={}&page={}",
            self.base_url,
            urlencoding::encode(query),
            page
        );
        self.get_json(&url)
    }

    /// Fetch the full set listing
    pub fn sets(&self) -> Result<SetList> {
        let url = format!("{}/sets", self.base_url);
        self.get_json(&url)
    }

    /// Fetch the bulk dataset manifest
    pub fn bulk_manifest(&self) -> Result<BulkManifest> {
        let url = format!("{}/bulk-data", self.base_url);
        self.get_json(&url)
    }

    /// Stream a download to `dest`, reporting `(received, total)` after each
    /// chunk. Data is written to a temp file and renamed on success, so a
    /// failed transfer never leaves a truncated file at `dest`.
    pub fn download_to(
        &self,
        url: &str,
        dest: &Path,
        mut progress: impl FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        let response = self.get(url)?;
        let mut response = Self::check_status(response)?;
        let total = response.content_length();

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = PathBuf::from(format!("{}.part", dest.display()));

        let result = Self::write_stream(&mut response, &tmp, total, &mut progress);
        match result {
            Ok(received) => {
                std::fs::rename(&tmp, dest)?;
                log::info!("Downloaded {} bytes to {}", received, dest.display());
                Ok(received)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn write_stream(
        response: &mut reqwest::blocking::Response,
        tmp: &Path,
        total: Option<u64>,
        progress: &mut impl FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        let mut file = File::create(tmp)?;
        let mut buf = [0u8; DOWNLOAD_CHUNK_SIZE];
        let mut received: u64 = 0;
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            received += n as u64;
            progress(received, total);
        }
        file.flush()?;
        Ok(received)
    }

    /// Issue a throttled GET without interpreting the response
    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        self.throttle();
        log::debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()?;
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url)?;
        let response = Self::check_status(response)?;
        Ok(response.json::<T>()?)
    }

    /// Block until the minimum interval since the previous request has
    /// elapsed. The lock is held across the sleep so concurrent callers queue
    /// behind each other instead of racing the timestamp.
    fn throttle(&self) {
        let mut last = self.last_request.lock().unwrap();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // Scryfall sends a structured error body; fall back to the bare
        // status when the body is something else (e.g. an image CDN error).
        match response.json::<ScryfallError>() {
            Ok(err) if status == reqwest::StatusCode::NOT_FOUND => {
                Err(CollectionError::NotFound(err.details))
            }
            Ok(err) => Err(CollectionError::ApiResponse {
                code: err.code,
                details: err.details,
            }),
            Err(_) => Err(CollectionError::HttpStatus(status)),
        }
    }
}

impl Default for ScryfallClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
