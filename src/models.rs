use serde::{Deserialize, Serialize};

/// One printed card as returned by Scryfall.
///
/// The same type is used for single-card responses, bulk dataset entries and
/// the on-disk cache document. Records are never mutated after creation; a
/// later fetch of the same key replaces the whole record.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CardRecord {
    /// Opaque unique print identifier
    pub id: String,
    pub name: String,
    /// Shared by all printings with identical rules text
    #[serde(default)]
    pub oracle_id: Option<String>,
    #[serde(rename = "set", default)]
    pub set_code: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub cmc: f64,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub prices: Prices,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Prices {
    pub eur: Option<String>,
    pub eur_foil: Option<String>,
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
}

/// Image URLs keyed by resolution tier
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
    pub png: Option<String>,
    pub art_crop: Option<String>,
    pub border_crop: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
}

impl CardRecord {
    /// Get the primary image URL (normal size)
    pub fn image_url(&self) -> Option<&str> {
        // Try direct image_uris first
        if let Some(ref uris) = self.image_uris {
            return uris.normal.as_deref();
        }
        // For double-faced cards, get front face image
        if let Some(ref faces) = self.card_faces {
            if let Some(face) = faces.first() {
                if let Some(ref uris) = face.image_uris {
                    return uris.normal.as_deref();
                }
            }
        }
        None
    }

    /// True when the record carries both print fields (set and collector number)
    pub fn has_print_key(&self) -> bool {
        self.set_code.as_deref().is_some_and(|s| !s.is_empty())
            && self
                .collector_number
                .as_deref()
                .is_some_and(|n| !n.is_empty())
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
