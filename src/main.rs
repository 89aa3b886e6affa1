//! MTG Collection - card data sync and cache maintenance CLI
//!
//! Drives the library from the command line: bulk dataset sync, cached name
//! lookups, local search and image cache maintenance.

use clap::Parser;
use mtg_collection::{
    ingest_bulk_dataset, BulkProgress, CardCache, ImageCache, ScryfallClient, SizePreset,
};
use std::path::PathBuf;

/// MTG collection manager - offline card cache maintenance
#[derive(Parser, Debug)]
#[command(name = "mtg_collection")]
#[command(version, about, long_about = None)]
struct Args {
    /// Data directory for the card cache and images
    #[arg(long, default_value_t = default_data_dir())]
    data_dir: String,

    /// Download and ingest a bulk dataset
    #[arg(long, default_value_t = false)]
    sync: bool,

    /// Bulk dataset variant to ingest
    #[arg(long, default_value = "default_cards")]
    variant: String,

    /// Look up a card by name (cached, falls back to Scryfall)
    #[arg(long)]
    lookup: Option<String>,

    /// Use exact name matching for --lookup
    #[arg(long, default_value_t = false)]
    exact: bool,

    /// Search cached card names for a substring
    #[arg(long)]
    search: Option<String>,

    /// Maximum results for --search
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Prefetch the image for the card found by --lookup
    #[arg(long, default_value_t = false)]
    fetch_image: bool,

    /// Remove cached images older than this many days
    #[arg(long)]
    evict_days: Option<u64>,
}

/// Returns the default data directory: ~/.cache/mtg_collection
fn default_data_dir() -> String {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mtg_collection")
        .to_string_lossy()
        .to_string()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let data_dir = PathBuf::from(&args.data_dir);
    log::info!("Data directory: {}", data_dir.display());

    let client = ScryfallClient::new();
    let cache = CardCache::load(data_dir.join("card_cache.json"), client.clone());

    if args.sync {
        println!("Syncing bulk dataset '{}'...", args.variant);
        let result = ingest_bulk_dataset(
            &client,
            &cache,
            &args.variant,
            &data_dir.join("bulk"),
            print_progress,
        );
        match result {
            Ok(summary) => {
                println!(
                    "Done: {} records from '{}'",
                    summary.records, summary.dataset
                );
            }
            Err(e) => {
                log::error!("Bulk sync failed: {}", e);
                eprintln!("Bulk sync failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(name) = args.lookup.as_deref() {
        match cache.lookup_by_name(name, args.exact) {
            Some(card) => {
                println!(
                    "{} [{}] {} #{}",
                    card.name,
                    card.rarity.as_deref().unwrap_or("?"),
                    card.set_code.as_deref().unwrap_or("?"),
                    card.collector_number.as_deref().unwrap_or("?")
                );
                if let Some(type_line) = card.type_line.as_deref() {
                    println!("  {}", type_line);
                }
                if args.fetch_image {
                    prefetch_image(&data_dir, &card);
                }
            }
            None => println!("No card found for '{}'", name),
        }
    }

    if let Some(query) = args.search.as_deref() {
        let results = cache.search_local(query, args.limit);
        if results.is_empty() {
            println!("No cached cards match '{}'", query);
        }
        for card in results {
            println!(
                "{} ({})",
                card.name,
                card.set_code.as_deref().unwrap_or("?")
            );
        }
    }

    if let Some(days) = args.evict_days {
        let images = ImageCache::new(data_dir.join("images"));
        let removed = images.evict_older_than(days);
        println!("Removed {} cached images", removed);
    }
}

fn print_progress(progress: BulkProgress) {
    use std::io::Write;
    match progress {
        BulkProgress::Download {
            received,
            total: Some(total),
        } => {
            print!(
                "\rDownloading: {:.1} / {:.1} MB",
                received as f64 / (1024.0 * 1024.0),
                total as f64 / (1024.0 * 1024.0)
            );
        }
        BulkProgress::Download {
            received,
            total: None,
        } => {
            print!("\rDownloading: {:.1} MB", received as f64 / (1024.0 * 1024.0));
        }
        BulkProgress::Parse { processed, total } => {
            print!("\rProcessing: {} / {} cards", processed, total);
            if processed == total {
                println!();
            }
        }
    }
    let _ = std::io::stdout().flush();
}

/// Download the card's normal-size image into the cache, blocking until the
/// completion callback reports back
fn prefetch_image(data_dir: &std::path::Path, card: &mtg_collection::CardRecord) {
    let Some(url) = card.image_url() else {
        println!("No image available for {}", card.name);
        return;
    };
    let images = ImageCache::new(data_dir.join("images"));
    let (tx, rx) = std::sync::mpsc::channel();
    images.download(
        url,
        SizePreset::Medium,
        Some(Box::new(move |success, path| {
            let _ = tx.send((success, path));
        })),
    );
    match rx.recv() {
        Ok((true, Some(path))) => println!("Image cached at {}", path.display()),
        _ => println!("Image download failed for {}", card.name),
    }
}
