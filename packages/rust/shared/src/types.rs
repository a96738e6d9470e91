//! Core domain types for Placebook catalogs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current parser/format version for the persisted catalog.
///
/// The catalog JSON shape is the wire format consumed by downstream readers
/// and must stay stable unless this version is bumped.
pub const PARSER_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// PlaceType
// ---------------------------------------------------------------------------

/// Broad category a place belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaceType {
    Dining,
    Activity,
    Accommodation,
    Shopping,
    #[default]
    Other,
}

impl PlaceType {
    /// Lowercase tag form, usable directly as a search tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dining => "dining",
            Self::Activity => "activity",
            Self::Accommodation => "accommodation",
            Self::Shopping => "shopping",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PlaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlaceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dining" => Ok(Self::Dining),
            "activity" => Ok(Self::Activity),
            "accommodation" => Ok(Self::Accommodation),
            "shopping" => Ok(Self::Shopping),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown place type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// PriceRange
// ---------------------------------------------------------------------------

/// Ordinal price tier, serialized as the familiar `$`…`$$$$` symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "$")]
    Inexpensive,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Expensive,
    #[serde(rename = "$$$$")]
    VeryExpensive,
}

impl std::fmt::Display for PriceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Inexpensive => "$",
            Self::Moderate => "$$",
            Self::Expensive => "$$$",
            Self::VeryExpensive => "$$$$",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Hours
// ---------------------------------------------------------------------------

/// Day of the week, ordered Monday-first for stable weekly listings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Capitalized English name for human-readable summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

/// Opening hours: either a free-text summary or a per-weekday mapping.
///
/// Serialized untagged so the wire format is a plain string or an object
/// keyed by lowercase weekday names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hours {
    Text(String),
    Weekly(BTreeMap<Weekday, String>),
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// EnrichmentStatus
// ---------------------------------------------------------------------------

/// How confident we are in the resolved business match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceConfidence {
    /// Search match plus a successful detail fetch.
    High,
    /// Search match only (detail fetch failed or was skipped).
    Medium,
}

/// Per-place enrichment witness. The orchestrator's skip decision reads this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStatus {
    pub enriched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_confidence: Option<SourceConfidence>,
}

impl EnrichmentStatus {
    /// Mark a place as successfully enriched under `version`.
    pub fn enriched(version: &str, confidence: SourceConfidence) -> Self {
        Self {
            enriched: true,
            enriched_at: Some(Utc::now()),
            enrichment_version: Some(version.to_string()),
            reason: None,
            source_confidence: Some(confidence),
        }
    }

    /// Mark a place as not enriched, with the terminal reason.
    pub fn failed(version: &str, reason: impl Into<String>) -> Self {
        Self {
            enriched: false,
            enriched_at: Some(Utc::now()),
            enrichment_version: Some(version.to_string()),
            reason: Some(reason.into()),
            source_confidence: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Place
// ---------------------------------------------------------------------------

/// One catalog entry.
///
/// `id`, `name`, `orig_text`, and `category` are extraction-owned and never
/// touched by the enrichment or tagging phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Stable URL-safe slug, unique within a catalog. Assigned once.
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub place_type: PlaceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Verbatim source excerpt. Immutable once set.
    pub orig_text: String,
    /// Cleaned section label the place was found under.
    pub category: String,

    // Populated by enrichment; absent until enriched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Hours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// External classification tags from the lookup API.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_taxonomy: Vec<String>,

    /// Lowercase search tags. Set semantics: order and duplicates irrelevant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub enrichment_status: EnrichmentStatus,
}

impl Place {
    /// A bare place as the extractor produces it, before enrichment.
    pub fn extracted(
        name: impl Into<String>,
        orig_text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            place_type: PlaceType::Other,
            description: None,
            notes: None,
            orig_text: orig_text.into(),
            category: category.into(),
            address: None,
            phone: None,
            website: None,
            hours: None,
            rating: None,
            price_range: None,
            coordinates: None,
            place_taxonomy: Vec::new(),
            tags: Vec::new(),
            enrichment_status: EnrichmentStatus::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Aggregate enrichment counters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    pub enriched_places: usize,
    pub skipped_places: usize,
    pub failed_places: usize,
}

/// Catalog metadata written alongside the places on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    pub generated_at: DateTime<Utc>,
    pub source_id: String,
    pub source_title: String,
    pub total_places: usize,
    pub categories: Vec<String>,
    pub enrichment_stats: EnrichmentStats,
    pub parser_version: String,
}

/// The persisted unit: metadata plus places in document encounter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub metadata: CatalogMetadata,
    pub places: Vec<Place>,
}

impl Catalog {
    /// Advisory invariant check. Returns human-readable issues; an empty
    /// list means the catalog is well-formed.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for place in &self.places {
            if place.id.is_empty() {
                issues.push(format!("place '{}' has no id", place.name));
            } else if !seen_ids.insert(place.id.as_str()) {
                issues.push(format!("duplicate place id '{}'", place.id));
            }
            if place.orig_text.trim().is_empty() {
                issues.push(format!("place '{}' has empty origText", place.name));
            }
            if place.category.trim().is_empty() {
                issues.push(format!("place '{}' has empty category", place.name));
            }
            if let Some(rating) = place.rating {
                if !(0.0..=5.0).contains(&rating) {
                    issues.push(format!(
                        "place '{}' rating {rating} outside 0-5",
                        place.name
                    ));
                }
            }
        }

        if self.metadata.total_places != self.places.len() {
            issues.push(format!(
                "metadata.totalPlaces {} != places.len() {}",
                self.metadata.total_places,
                self.places.len()
            ));
        }

        issues
    }
}
