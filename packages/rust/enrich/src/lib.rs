//! Place enrichment: resolve catalog places to authoritative business data
//! via an external places-lookup API.
//!
//! The [`Enricher`] composes a search query per place, trusts the API's
//! top-ranked result, fetches details for it, and maps external fields onto
//! the place. Results are cached for the lifetime of one pipeline run and
//! outbound calls are spaced by a fixed delay.

mod enricher;
mod lookup;
mod mapping;

pub use enricher::{EnrichedFields, Enricher, EnricherOptions};
pub use lookup::{HttpPlacesClient, PlaceDetails, PlaceLookup, SearchHit};
pub use mapping::{map_place_type, map_price_tier};
