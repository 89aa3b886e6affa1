//! Persistent multi-key cache for card lookups
//!
//! One record is reachable under up to four keys (name, id, oracle id,
//! set + collector number). The whole index persists as a single JSON
//! document so the cache survives restarts and works offline.

use crate::api::scryfall::ScryfallClient;
use crate::error::{CollectionError, Result};
use crate::models::CardRecord;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

/// Index key for the card cache.
///
/// Serializes as `scheme:value` (`print` keys as `print:set:number`), which is
/// the key format of the on-disk document. Name and set components are
/// lowercased on construction so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Name(String),
    Id(String),
    Oracle(String),
    Print { set: String, number: String },
}

impl CacheKey {
    pub fn name(name: &str) -> Self {
        CacheKey::Name(name.to_lowercase())
    }

    pub fn id(id: &str) -> Self {
        CacheKey::Id(id.to_string())
    }

    pub fn oracle(oracle_id: &str) -> Self {
        CacheKey::Oracle(oracle_id.to_string())
    }

    pub fn print(set: &str, number: &str) -> Self {
        CacheKey::Print {
            set: set.to_lowercase(),
            number: number.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Name(name) => write!(f, "name:{}", name),
            CacheKey::Id(id) => write!(f, "id:{}", id),
            CacheKey::Oracle(oracle) => write!(f, "oracle:{}", oracle),
            CacheKey::Print { set, number } => write!(f, "print:{}:{}", set, number),
        }
    }
}

impl FromStr for CacheKey {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self> {
        let (scheme, value) = s
            .split_once(':')
            .ok_or_else(|| CollectionError::Cache(format!("invalid cache key: {}", s)))?;
        match scheme {
            "name" => Ok(CacheKey::Name(value.to_string())),
            "id" => Ok(CacheKey::Id(value.to_string())),
            "oracle" => Ok(CacheKey::Oracle(value.to_string())),
            "print" => {
                let (set, number) = value.split_once(':').ok_or_else(|| {
                    CollectionError::Cache(format!("invalid print key: {}", s))
                })?;
                Ok(CacheKey::Print {
                    set: set.to_string(),
                    number: number.to_string(),
                })
            }
            other => Err(CollectionError::Cache(format!(
                "unknown cache key scheme: {}",
                other
            ))),
        }
    }
}

impl Serialize for CacheKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CacheKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e| D::Error::custom(format!("{}", e)))
    }
}

/// Persistent multi-key card cache with network fallback for name lookups.
///
/// The index lives behind one mutex; every mutating operation re-indexes and
/// persists inside a single critical section, so a concurrent `persist` never
/// observes a half-written record.
pub struct CardCache {
    path: PathBuf,
    client: ScryfallClient,
    index: Mutex<HashMap<CacheKey, CardRecord>>,
}

impl CardCache {
    /// Default cache document location
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mtg_collection")
            .join("card_cache.json")
    }

    /// Load the cache from disk. A missing or corrupt file starts an empty
    /// cache (logged, never fatal).
    pub fn load(path: impl Into<PathBuf>, client: ScryfallClient) -> Self {
        let path = path.into();
        let index = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<CacheKey, CardRecord>>(&content) {
                Ok(index) => {
                    log::info!("Loaded card cache with {} entries", index.len());
                    index
                }
                Err(e) => {
                    log::warn!("Failed to parse card cache, starting fresh: {}", e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Starting with empty card cache");
                HashMap::new()
            }
            Err(e) => {
                log::warn!("Failed to read card cache, starting fresh: {}", e);
                HashMap::new()
            }
        };
        Self {
            path,
            client,
            index: Mutex::new(index),
        }
    }

    /// Look up a card by name. Checks the cache first; on miss, queries
    /// Scryfall and stores the result. Network failures and remote misses
    /// both come back as `None` - the caller decides how to present that.
    pub fn lookup_by_name(&self, name: &str, exact: bool) -> Option<CardRecord> {
        let key = CacheKey::name(name);
        {
            let index = self.index.lock().unwrap();
            if let Some(record) = index.get(&key) {
                log::debug!("Cache hit for {}", key);
                return Some(record.clone());
            }
        }

        log::info!("Cache miss for {}, fetching from Scryfall", key);
        match self.client.named(name, exact) {
            Ok(record) => {
                self.upsert(&record);
                Some(record)
            }
            Err(e) => {
                log::info!("Name lookup failed for '{}': {}", name, e);
                None
            }
        }
    }

    /// Cache-only lookup by Scryfall id
    pub fn lookup_by_id(&self, id: &str) -> Option<CardRecord> {
        self.lookup(&CacheKey::id(id))
    }

    /// Cache-only lookup by oracle id
    pub fn lookup_by_oracle_id(&self, oracle_id: &str) -> Option<CardRecord> {
        self.lookup(&CacheKey::oracle(oracle_id))
    }

    /// Cache-only lookup by set code and collector number
    pub fn lookup_by_print(&self, set_code: &str, collector_number: &str) -> Option<CardRecord> {
        self.lookup(&CacheKey::print(set_code, collector_number))
    }

    /// Cache-only lookup by an arbitrary key
    pub fn lookup(&self, key: &CacheKey) -> Option<CardRecord> {
        self.index.lock().unwrap().get(key).cloned()
    }

    /// Scan cached names for a case-insensitive substring match.
    ///
    /// Results come in three tiers: exact name match, then prefix matches,
    /// then other substring matches. Within a tier, scan order is preserved.
    pub fn search_local(&self, query: &str, limit: usize) -> Vec<CardRecord> {
        let q = query.to_lowercase();
        let index = self.index.lock().unwrap();

        let mut exact = Vec::new();
        let mut prefix = Vec::new();
        let mut substring = Vec::new();
        for (key, record) in index.iter() {
            let CacheKey::Name(name) = key else { continue };
            if !name.contains(&q) {
                continue;
            }
            if name == &q {
                exact.push(record.clone());
            } else if name.starts_with(&q) {
                prefix.push(record.clone());
            } else {
                substring.push(record.clone());
            }
        }

        exact
            .into_iter()
            .chain(prefix)
            .chain(substring)
            .take(limit)
            .collect()
    }

    /// Write the record under every key its fields provide and persist.
    /// Persistence failures are logged; the in-memory index stays
    /// authoritative for the rest of the process lifetime.
    pub fn upsert(&self, record: &CardRecord) {
        let mut index = self.index.lock().unwrap();
        Self::index_record(&mut index, record);
        if let Err(e) = self.persist_locked(&index) {
            log::warn!("Failed to persist card cache: {}", e);
        }
    }

    /// Like `upsert`, but without the write-through flush. Used by bulk
    /// ingestion; the caller must call `persist` once at the end.
    pub fn upsert_deferred(&self, record: &CardRecord) {
        let mut index = self.index.lock().unwrap();
        Self::index_record(&mut index, record);
    }

    fn index_record(index: &mut HashMap<CacheKey, CardRecord>, record: &CardRecord) {
        index.insert(CacheKey::name(&record.name), record.clone());
        index.insert(CacheKey::id(&record.id), record.clone());
        if let Some(oracle_id) = record.oracle_id.as_deref().filter(|o| !o.is_empty()) {
            index.insert(CacheKey::oracle(oracle_id), record.clone());
        }
        if record.has_print_key() {
            let set = record.set_code.as_deref().unwrap_or_default();
            let number = record.collector_number.as_deref().unwrap_or_default();
            index.insert(CacheKey::print(set, number), record.clone());
        }
    }

    /// Serialize the whole index to its JSON document
    pub fn persist(&self) -> Result<()> {
        let index = self.index.lock().unwrap();
        self.persist_locked(&index)
    }

    /// Write via temp file + rename so a failed write leaves the previous
    /// document intact.
    fn persist_locked(&self, index: &HashMap<CacheKey, CardRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(index)?;
        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("Saved card cache with {} entries", index.len());
        Ok(())
    }

    /// Number of index entries (a record counts once per key)
    pub fn len(&self) -> usize {
        self.index.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
#[path = "card_cache_tests.rs"]
mod tests;
