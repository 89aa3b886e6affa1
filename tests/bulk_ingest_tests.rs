//! End-to-end ingestion tests: manifest fetch, download and parse against a
//! mock Scryfall server.

use mtg_collection::{ingest_bulk_dataset, BulkProgress, CardCache, CollectionError, ScryfallClient};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn card_value(name: &str, id: &str, set: &str, cn: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "oracle_id": format!("oracle-{}", id),
        "name": name,
        "set": set,
        "collector_number": cn,
        "rarity": "common"
    })
}

fn manifest_json(base_url: &str) -> serde_json::Value {
    serde_json::json!({
        "data": [
            {
                "type": "default_cards",
                "name": "Default Cards",
                "download_uri": format!("{}/bulk/default-cards.json", base_url),
                "size": 1024
            },
            {
                "type": "oracle_cards",
                "name": "Oracle Cards",
                "download_uri": format!("{}/bulk/oracle-cards.json", base_url),
                "size": 512
            }
        ]
    })
}

async fn mount_manifest(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json(&server.uri())))
        .mount(server)
        .await;
}

#[tokio::test]
async fn ingest_populates_and_flushes_the_cache() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/bulk/default-cards.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            card_value("Lightning Bolt", "bolt-id", "lea", "161"),
            card_value("Shock", "shock-id", "m10", "152")
        ])))
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("card_cache.json");
        let client =
            ScryfallClient::with_base_url(&base_url).with_min_interval(Duration::ZERO);
        let cache = CardCache::load(&cache_path, client.clone());

        let mut saw_download = false;
        let mut saw_parse = false;
        let summary = ingest_bulk_dataset(
            &client,
            &cache,
            "default_cards",
            &dir.path().join("bulk"),
            |p| match p {
                BulkProgress::Download { .. } => saw_download = true,
                BulkProgress::Parse { .. } => saw_parse = true,
            },
        )
        .unwrap();

        assert_eq!(summary.dataset, "default_cards");
        assert_eq!(summary.records, 2);
        assert!(saw_download);
        assert!(saw_parse);

        // Flushed once: a fresh load sees every key scheme
        let reloaded = CardCache::load(&cache_path, client);
        assert_eq!(reloaded.len(), 8);
        assert!(reloaded.lookup_by_print("lea", "161").is_some());
        assert!(reloaded.lookup_by_oracle_id("oracle-shock-id").is_some());
        assert_eq!(
            reloaded.lookup_by_id("bolt-id").unwrap().name,
            "Lightning Bolt"
        );
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn ingest_unknown_variant_fails_with_manifest_entry_missing() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server).await;

    let base_url = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        let client =
            ScryfallClient::with_base_url(&base_url).with_min_interval(Duration::ZERO);
        let cache = CardCache::load(dir.path().join("card_cache.json"), client.clone());

        let result = ingest_bulk_dataset(&client, &cache, "all_cards", dir.path(), |_| {});

        match result {
            Err(CollectionError::ManifestEntryMissing(variant)) => {
                assert_eq!(variant, "all_cards");
            }
            other => panic!("Expected ManifestEntryMissing, got: {other:?}"),
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn ingest_download_failure_surfaces_and_flushes_nothing() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/bulk/default-cards.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("card_cache.json");
        let client =
            ScryfallClient::with_base_url(&base_url).with_min_interval(Duration::ZERO);
        let cache = CardCache::load(&cache_path, client.clone());

        let result =
            ingest_bulk_dataset(&client, &cache, "default_cards", &dir.path().join("bulk"), |_| {});

        assert!(result.is_err());
        assert!(cache.is_empty());
        assert!(!cache_path.exists());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn ingest_malformed_payload_keeps_previous_document_intact() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/bulk/default-cards.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "object": "error", "details": "oops" })),
        )
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("card_cache.json");
        let client =
            ScryfallClient::with_base_url(&base_url).with_min_interval(Duration::ZERO);
        let cache = CardCache::load(&cache_path, client.clone());

        // Previous run left a valid document behind
        let seeded: mtg_collection::CardRecord =
            serde_json::from_value(card_value("Seeded", "seed-id", "lea", "7")).unwrap();
        cache.upsert(&seeded);
        let before = std::fs::read(&cache_path).unwrap();

        let result =
            ingest_bulk_dataset(&client, &cache, "default_cards", &dir.path().join("bulk"), |_| {});

        match result {
            Err(CollectionError::MalformedDataset(_)) => {}
            other => panic!("Expected MalformedDataset, got: {other:?}"),
        }
        assert_eq!(std::fs::read(&cache_path).unwrap(), before);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn ingest_reports_download_progress_in_bytes() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server).await;
    let body = serde_json::to_vec(&serde_json::json!([card_value(
        "Lightning Bolt",
        "bolt-id",
        "lea",
        "161"
    )]))
    .unwrap();
    let body_len = body.len() as u64;
    Mock::given(method("GET"))
        .and(path("/bulk/default-cards.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        let client =
            ScryfallClient::with_base_url(&base_url).with_min_interval(Duration::ZERO);
        let cache = CardCache::load(dir.path().join("card_cache.json"), client.clone());

        let mut last_download = None;
        ingest_bulk_dataset(
            &client,
            &cache,
            "default_cards",
            &dir.path().join("bulk"),
            |p| {
                if let BulkProgress::Download { received, total } = p {
                    last_download = Some((received, total));
                }
            },
        )
        .unwrap();

        assert_eq!(last_download, Some((body_len, Some(body_len))));
    })
    .await
    .unwrap();
}
