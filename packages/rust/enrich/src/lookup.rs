//! Places-lookup API client.
//!
//! Narrow read-only contract: text search returning ranked hits, and a
//! detail fetch by external id. Both are quota-limited upstream; the
//! [`Enricher`](crate::Enricher) owns throttling and caching.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use placebook_shared::{Coordinates, PlacebookError, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub external_id: String,
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub price_tier: Option<String>,
    pub types: Vec<String>,
}

/// Full detail record for one business.
#[derive(Debug, Clone, Default)]
pub struct PlaceDetails {
    pub external_id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub price_tier: Option<String>,
    pub types: Vec<String>,
    pub coordinates: Option<Coordinates>,
    /// Raw per-weekday descriptions, e.g. `"Monday: 9:00 AM – 5:00 PM"`.
    pub weekday_hours: Vec<String>,
}

/// Read-only places lookup.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Text search; results are in the API's relevance order.
    async fn search(&self, query: &str, max_results: u8) -> Result<Vec<SearchHit>>;

    /// Fetch the full field set for one external id.
    async fn details(&self, external_id: &str) -> Result<PlaceDetails>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

const SEARCH_FIELD_MASK: &str =
    "places.id,places.displayName,places.formattedAddress,places.rating,places.priceLevel,places.types";

const DETAILS_FIELD_MASK: &str = "id,displayName,formattedAddress,nationalPhoneNumber,websiteUri,\
rating,priceLevel,types,location,regularOpeningHours.weekdayDescriptions";

/// Places API client over HTTP.
pub struct HttpPlacesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    text_query: &'a str,
    max_result_count: u8,
}

#[derive(Deserialize)]
struct SearchResponse {
    places: Option<Vec<ApiPlace>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    id: Option<String>,
    display_name: Option<ApiText>,
    formatted_address: Option<String>,
    national_phone_number: Option<String>,
    website_uri: Option<String>,
    rating: Option<f64>,
    price_level: Option<String>,
    types: Option<Vec<String>>,
    location: Option<ApiLocation>,
    regular_opening_hours: Option<ApiOpeningHours>,
}

#[derive(Deserialize)]
struct ApiText {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiOpeningHours {
    weekday_descriptions: Option<Vec<String>>,
}

impl HttpPlacesClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlacebookError::Network(format!("client build: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PlaceLookup for HttpPlacesClient {
    async fn search(&self, query: &str, max_results: u8) -> Result<Vec<SearchHit>> {
        debug!(query, max_results, "places text search");

        let body = SearchRequest {
            text_query: query,
            max_result_count: max_results,
        };

        let response = self
            .http
            .post(self.endpoint("places:searchText"))
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlacebookError::Enrichment(format!("search request: {e}")))?
            .error_for_status()
            .map_err(|e| PlacebookError::Enrichment(format!("search status: {e}")))?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| PlacebookError::Enrichment(format!("search response: {e}")))?;

        let hits = parsed
            .places
            .unwrap_or_default()
            .into_iter()
            .filter_map(|place| {
                let external_id = place.id?;
                Some(SearchHit {
                    external_id,
                    name: place
                        .display_name
                        .and_then(|t| t.text)
                        .unwrap_or_default(),
                    address: place.formatted_address,
                    rating: place.rating,
                    price_tier: place.price_level,
                    types: place.types.unwrap_or_default(),
                })
            })
            .collect();

        Ok(hits)
    }

    async fn details(&self, external_id: &str) -> Result<PlaceDetails> {
        debug!(external_id, "places detail fetch");

        let response = self
            .http
            .get(self.endpoint(&format!("places/{external_id}")))
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .send()
            .await
            .map_err(|e| PlacebookError::Enrichment(format!("details request: {e}")))?
            .error_for_status()
            .map_err(|e| PlacebookError::Enrichment(format!("details status: {e}")))?;

        let place: ApiPlace = response
            .json()
            .await
            .map_err(|e| PlacebookError::Enrichment(format!("details response: {e}")))?;

        let coordinates = place.location.and_then(|loc| {
            Some(Coordinates {
                lat: loc.latitude?,
                lng: loc.longitude?,
            })
        });

        Ok(PlaceDetails {
            external_id: place.id.unwrap_or_else(|| external_id.to_string()),
            name: place.display_name.and_then(|t| t.text),
            address: place.formatted_address,
            phone: place.national_phone_number,
            website: place.website_uri,
            rating: place.rating,
            price_tier: place.price_level,
            types: place.types.unwrap_or_default(),
            coordinates,
            weekday_hours: place
                .regular_opening_hours
                .and_then(|h| h.weekday_descriptions)
                .unwrap_or_default(),
        })
    }
}
