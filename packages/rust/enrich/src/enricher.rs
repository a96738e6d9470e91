//! The enrichment engine: query composition, best-match resolution, field
//! mapping, run-scoped caching, and fixed-delay throttling.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use placebook_shared::{
    Coordinates, EnrichmentStatus, Hours, Place, PriceRange, Result, SourceConfidence, Weekday,
};

use crate::lookup::{PlaceDetails, PlaceLookup, SearchHit};
use crate::mapping::{map_place_type, map_price_tier};

/// How many leading description words go into the search query.
const QUERY_DESCRIPTION_WORDS: usize = 4;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-run enrichment settings.
#[derive(Debug, Clone)]
pub struct EnricherOptions {
    /// Free-text disambiguator appended to every search query.
    pub location_context: String,
    /// Version stamp written into `enrichmentStatus`.
    pub enrichment_version: String,
    /// Fixed delay enforced before every outbound call.
    pub rate_limit: Duration,
    /// Maximum search results requested per query.
    pub max_results: u8,
}

// ---------------------------------------------------------------------------
// Extracted field set
// ---------------------------------------------------------------------------

/// Business fields resolved for one place. This is what the run cache
/// stores, so a duplicate mention costs zero additional lookup calls.
#[derive(Debug, Clone)]
pub struct EnrichedFields {
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Option<Hours>,
    pub rating: Option<f64>,
    pub price_range: Option<PriceRange>,
    pub coordinates: Option<Coordinates>,
    pub taxonomy: Vec<String>,
    pub confidence: SourceConfidence,
}

impl EnrichedFields {
    /// Fields available from a bare search hit (no detail fetch).
    fn from_search(hit: &SearchHit) -> Self {
        Self {
            address: hit.address.clone(),
            phone: None,
            website: None,
            hours: None,
            rating: hit.rating,
            price_range: hit.price_tier.as_deref().and_then(map_price_tier),
            coordinates: None,
            taxonomy: hit.types.clone(),
            confidence: SourceConfidence::Medium,
        }
    }

    /// Merge detail fields over the search fields. Detailed data wins on
    /// overlap.
    fn merge_details(mut self, details: PlaceDetails) -> Self {
        if details.address.is_some() {
            self.address = details.address;
        }
        self.phone = details.phone.or(self.phone);
        self.website = details.website.or(self.website);
        if details.rating.is_some() {
            self.rating = details.rating;
        }
        if let Some(price) = details.price_tier.as_deref().and_then(map_price_tier) {
            self.price_range = Some(price);
        }
        if details.coordinates.is_some() {
            self.coordinates = details.coordinates;
        }
        if !details.types.is_empty() {
            self.taxonomy = details.types;
        }
        if !details.weekday_hours.is_empty() {
            self.hours = Some(parse_weekday_hours(&details.weekday_hours));
        }
        self.confidence = SourceConfidence::High;
        self
    }
}

// ---------------------------------------------------------------------------
// Fixed-delay throttle
// ---------------------------------------------------------------------------

/// Enforces a minimum interval between consecutive outbound calls. A plain
/// fixed delay, not adaptive backoff.
struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    async fn wait(&mut self) {
        if let Some(prev) = self.last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Resolves places to authoritative business data.
///
/// Owned by a single pipeline run: the cache never outlives or is shared
/// across runs, so concurrent runs cannot cross-contaminate results.
pub struct Enricher {
    lookup: Arc<dyn PlaceLookup>,
    options: EnricherOptions,
    cache: HashMap<String, EnrichedFields>,
    throttle: Throttle,
    lookup_calls: usize,
}

impl Enricher {
    pub fn new(lookup: Arc<dyn PlaceLookup>, options: EnricherOptions) -> Self {
        let throttle = Throttle::new(options.rate_limit);
        Self {
            lookup,
            options,
            cache: HashMap::new(),
            throttle,
            lookup_calls: 0,
        }
    }

    /// Number of outbound lookup calls (search + details) made so far.
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls
    }

    /// Enrich one place in-place.
    ///
    /// Writes only enrichment-owned fields (`address`, `phone`, `website`,
    /// `hours`, `rating`, `priceRange`, `coordinates`, `placeTaxonomy`,
    /// `type`, `enrichmentStatus`). Extraction-owned fields are never
    /// touched. Zero search results is a terminal, non-retryable outcome
    /// recorded on the status; an `Err` means the lookup itself failed and
    /// is recorded by the caller.
    #[instrument(skip_all, fields(place = %place.id))]
    pub async fn enrich(&mut self, place: &mut Place) -> Result<()> {
        let cache_key = self.cache_key(&place.name);
        if let Some(fields) = self.cache.get(&cache_key) {
            debug!(key = %cache_key, "enrichment cache hit");
            let fields = fields.clone();
            self.apply(place, fields);
            return Ok(());
        }

        let query = self.compose_query(place);
        self.throttle.wait().await;
        self.lookup_calls += 1;
        let hits = self.lookup.search(&query, self.options.max_results).await?;

        let Some(best) = hits.first() else {
            debug!(query = %query, "search returned no results");
            place.enrichment_status = EnrichmentStatus::failed(
                &self.options.enrichment_version,
                "no results",
            );
            return Ok(());
        };

        // The API's relevance ranking is trusted as-is; no secondary
        // disambiguation is applied. Known precision limit for common
        // business names.
        let mut fields = EnrichedFields::from_search(best);

        self.throttle.wait().await;
        self.lookup_calls += 1;
        match self.lookup.details(&best.external_id).await {
            Ok(details) => {
                fields = fields.merge_details(details);
            }
            Err(e) => {
                warn!(external_id = %best.external_id, error = %e, "detail fetch failed, keeping search fields");
            }
        }

        self.cache.insert(cache_key, fields.clone());
        self.apply(place, fields);
        Ok(())
    }

    fn cache_key(&self, name: &str) -> String {
        format!(
            "{}|{}",
            name.to_lowercase(),
            self.options.location_context.to_lowercase()
        )
    }

    /// Compose the search query: name + category + leading description
    /// words + location context.
    fn compose_query(&self, place: &Place) -> String {
        let mut parts: Vec<&str> = vec![place.name.as_str()];
        if !place.category.is_empty() {
            parts.push(place.category.as_str());
        }

        let description_head = place
            .description
            .as_deref()
            .map(|d| {
                d.split_whitespace()
                    .take(QUERY_DESCRIPTION_WORDS)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        if !description_head.is_empty() {
            parts.push(&description_head);
        }

        if !self.options.location_context.is_empty() {
            parts.push(self.options.location_context.as_str());
        }

        parts.join(" ")
    }

    fn apply(&self, place: &mut Place, fields: EnrichedFields) {
        place.address = fields.address;
        place.phone = fields.phone;
        place.website = fields.website;
        place.hours = fields.hours;
        place.rating = fields.rating;
        place.price_range = fields.price_range;
        place.coordinates = fields.coordinates;
        if let Some(mapped) = map_place_type(&fields.taxonomy) {
            place.place_type = mapped;
        }
        place.place_taxonomy = fields.taxonomy;
        place.enrichment_status = EnrichmentStatus::enriched(
            &self.options.enrichment_version,
            fields.confidence,
        );
    }
}

// ---------------------------------------------------------------------------
// Hours parsing
// ---------------------------------------------------------------------------

/// Parse raw weekday descriptions into a per-weekday map. Lines that do not
/// follow the `Day: hours` shape make the whole set fall back to free text.
fn parse_weekday_hours(lines: &[String]) -> Hours {
    let mut weekly = BTreeMap::new();

    for line in lines {
        let Some((day, hours)) = line.split_once(':') else {
            return Hours::Text(lines.join("; "));
        };
        let Some(weekday) = parse_weekday(day.trim()) else {
            return Hours::Text(lines.join("; "));
        };
        weekly.insert(weekday, hours.trim().to_string());
    }

    Hours::Weekly(weekly)
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "monday" => Some(Weekday::Monday),
        "tuesday" => Some(Weekday::Tuesday),
        "wednesday" => Some(Weekday::Wednesday),
        "thursday" => Some(Weekday::Thursday),
        "friday" => Some(Weekday::Friday),
        "saturday" => Some(Weekday::Saturday),
        "sunday" => Some(Weekday::Sunday),
        _ => None,
    }
}
