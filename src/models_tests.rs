//! Tests for the card record model.

use super::{CardFace, CardRecord, ImageUris, Prices};

fn full_card_json() -> serde_json::Value {
    serde_json::json!({
        "id": "e3285e6b-3e79-4d7c-bf96-d920f973b122",
        "oracle_id": "4457ed35-7c10-48c8-9776-456485fdf070",
        "name": "Lightning Bolt",
        "set": "lea",
        "collector_number": "161",
        "rarity": "common",
        "mana_cost": "{R}",
        "cmc": 1.0,
        "type_line": "Instant",
        "oracle_text": "Lightning Bolt deals 3 damage to any target.",
        "colors": ["R"],
        "layout": "normal",
        "image_uris": { "normal": "https://example.com/bolt.jpg" },
        "prices": { "eur": "350.00", "eur_foil": null, "usd": "400.00", "usd_foil": null },
        "legalities": { "modern": "legal" },
        "games": ["paper"]
    })
}

#[test]
fn deserializes_full_card_ignoring_unknown_fields() {
    let card: CardRecord = serde_json::from_value(full_card_json()).unwrap();

    assert_eq!(card.name, "Lightning Bolt");
    assert_eq!(card.set_code.as_deref(), Some("lea"));
    assert_eq!(card.collector_number.as_deref(), Some("161"));
    assert_eq!(
        card.oracle_id.as_deref(),
        Some("4457ed35-7c10-48c8-9776-456485fdf070")
    );
    assert_eq!(card.colors, vec!["R".to_string()]);
    assert_eq!(card.cmc, 1.0);
    assert_eq!(card.prices.eur.as_deref(), Some("350.00"));
}

#[test]
fn deserializes_minimal_card_with_defaults() {
    let card: CardRecord = serde_json::from_value(serde_json::json!({
        "id": "abc",
        "name": "Mystery Card"
    }))
    .unwrap();

    assert!(card.oracle_id.is_none());
    assert!(card.set_code.is_none());
    assert!(card.collector_number.is_none());
    assert!(card.colors.is_empty());
    assert_eq!(card.cmc, 0.0);
    assert!(card.prices.eur.is_none());
    assert!(!card.has_print_key());
}

#[test]
fn serializes_set_code_under_wire_name() {
    let card: CardRecord = serde_json::from_value(full_card_json()).unwrap();
    let value = serde_json::to_value(&card).unwrap();

    // The on-disk cache document keeps the wire field name
    assert_eq!(value["set"], "lea");
    assert!(value.get("set_code").is_none());
}

#[test]
fn roundtrips_through_json() {
    let card: CardRecord = serde_json::from_value(full_card_json()).unwrap();
    let json = serde_json::to_string(&card).unwrap();
    let back: CardRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(card, back);
}

#[test]
fn image_url_from_image_uris() {
    let card = CardRecord {
        id: "id".to_string(),
        name: "Test".to_string(),
        oracle_id: None,
        set_code: Some("tst".to_string()),
        collector_number: Some("1".to_string()),
        image_uris: Some(ImageUris {
            normal: Some("https://example.com/normal.jpg".to_string()),
            ..Default::default()
        }),
        card_faces: None,
        mana_cost: None,
        type_line: None,
        oracle_text: None,
        colors: Vec::new(),
        cmc: 0.0,
        layout: None,
        rarity: None,
        prices: Prices::default(),
    };

    assert_eq!(card.image_url(), Some("https://example.com/normal.jpg"));
}

#[test]
fn image_url_falls_back_to_front_face() {
    let card = CardRecord {
        id: "id".to_string(),
        name: "DFC".to_string(),
        oracle_id: None,
        set_code: None,
        collector_number: None,
        image_uris: None,
        card_faces: Some(vec![
            CardFace {
                name: "Front".to_string(),
                image_uris: Some(ImageUris {
                    normal: Some("https://example.com/front.jpg".to_string()),
                    ..Default::default()
                }),
                mana_cost: None,
                type_line: None,
                oracle_text: None,
            },
            CardFace {
                name: "Back".to_string(),
                image_uris: Some(ImageUris {
                    normal: Some("https://example.com/back.jpg".to_string()),
                    ..Default::default()
                }),
                mana_cost: None,
                type_line: None,
                oracle_text: None,
            },
        ]),
        mana_cost: None,
        type_line: None,
        oracle_text: None,
        colors: Vec::new(),
        cmc: 0.0,
        layout: Some("transform".to_string()),
        rarity: None,
        prices: Prices::default(),
    };

    assert_eq!(card.image_url(), Some("https://example.com/front.jpg"));
}

#[test]
fn image_url_none_when_both_missing() {
    let card: CardRecord = serde_json::from_value(serde_json::json!({
        "id": "abc",
        "name": "No Image"
    }))
    .unwrap();

    assert_eq!(card.image_url(), None);
}

#[test]
fn has_print_key_requires_both_fields() {
    let mut card: CardRecord = serde_json::from_value(full_card_json()).unwrap();
    assert!(card.has_print_key());

    card.collector_number = None;
    assert!(!card.has_print_key());

    card.collector_number = Some("161".to_string());
    card.set_code = Some(String::new());
    assert!(!card.has_print_key());
}
