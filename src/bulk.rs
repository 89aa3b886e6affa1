//! Bulk dataset ingestion pipeline
//!
//! Refreshes the card cache from a Scryfall bulk dataset: fetch the manifest,
//! pick the requested variant, stream the download to disk, then parse the
//! file (gzip or plain) into the cache. Per-record persistence against tens
//! of thousands of records would dominate runtime, so the index is flushed
//! once after all records are in.

use crate::api::scryfall::ScryfallClient;
use crate::cache::card_cache::CardCache;
use crate::error::{CollectionError, Result};
use crate::models::CardRecord;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Parse progress is reported once per this many records
const PARSE_PROGRESS_EVERY: usize = 1000;

/// Progress events reported to the ingestion observer
#[derive(Debug, Clone, Copy)]
pub enum BulkProgress {
    /// Download progress in bytes; `total` is absent when the server sends
    /// no content length
    Download { received: u64, total: Option<u64> },
    /// Parse progress in records
    Parse { processed: usize, total: usize },
}

/// Outcome of a successful ingestion run
#[derive(Debug)]
pub struct IngestSummary {
    /// Dataset variant that was ingested
    pub dataset: String,
    pub records: usize,
}

/// Download and ingest a bulk dataset variant into the cache.
///
/// Failure outcomes stay distinguishable for the caller: a missing manifest
/// entry is `ManifestEntryMissing`, a payload in the wrong shape is
/// `MalformedDataset`, and network errors carry through unchanged. On any
/// failure nothing is flushed, so the previous on-disk cache document
/// survives untouched.
pub fn ingest_bulk_dataset(
    client: &ScryfallClient,
    cache: &CardCache,
    variant: &str,
    download_dir: &Path,
    mut progress: impl FnMut(BulkProgress),
) -> Result<IngestSummary> {
    log::info!("Fetching bulk data manifest...");
    let manifest = client.bulk_manifest()?;
    let entry = manifest
        .data
        .into_iter()
        .find(|e| e.kind == variant)
        .ok_or_else(|| CollectionError::ManifestEntryMissing(variant.to_string()))?;
    log::info!(
        "Selected bulk dataset '{}' (~{:.1} MB)",
        entry.name,
        entry.size as f64 / (1024.0 * 1024.0)
    );

    std::fs::create_dir_all(download_dir)?;
    let dataset_path = download_dir.join(format!("{}.json", variant));
    client.download_to(&entry.download_uri, &dataset_path, |received, total| {
        progress(BulkProgress::Download { received, total });
    })?;

    let records = parse_dataset_file(&dataset_path, cache, &mut progress)?;

    // Single flush for the whole run
    if let Err(e) = cache.persist() {
        log::warn!("Failed to persist card cache after ingestion: {}", e);
    }

    log::info!("Ingested {} card records from '{}'", records, entry.name);
    Ok(IngestSummary {
        dataset: entry.kind,
        records,
    })
}

/// Parse a downloaded dataset file into the cache without flushing.
///
/// The payload must be one JSON array of card objects. Every record is
/// validated before any of them touch the index, so a malformed record means
/// no partial ingest.
pub fn parse_dataset_file(
    path: &Path,
    cache: &CardCache,
    progress: &mut impl FnMut(BulkProgress),
) -> Result<usize> {
    log::info!("Parsing bulk dataset: {}", path.display());
    let reader = open_dataset(path)?;

    let values: Vec<serde_json::Value> = serde_json::from_reader(reader)
        .map_err(|e| CollectionError::MalformedDataset(format!("expected a card array: {}", e)))?;
    let total = values.len();

    let mut records = Vec::with_capacity(total);
    for (i, value) in values.into_iter().enumerate() {
        let record: CardRecord = serde_json::from_value(value)
            .map_err(|e| CollectionError::MalformedDataset(format!("record {}: {}", i, e)))?;
        records.push(record);
        if (i + 1) % PARSE_PROGRESS_EVERY == 0 {
            progress(BulkProgress::Parse {
                processed: i + 1,
                total,
            });
        }
    }

    for record in &records {
        cache.upsert_deferred(record);
    }
    progress(BulkProgress::Parse {
        processed: total,
        total,
    });
    Ok(total)
}

/// Open a dataset file, transparently decompressing gzip (sniffed by the
/// `1f 8b` magic bytes)
fn open_dataset(path: &Path) -> Result<Box<dyn Read>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    file.rewind()?;
    if n == 2 && magic == [0x1f, 0x8b] {
        log::debug!("Dataset is gzip-compressed");
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
#[path = "bulk_tests.rs"]
mod tests;
