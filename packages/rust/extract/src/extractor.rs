//! Extraction phase: model call, response parsing, advisory validation.

use serde::Deserialize;
use tracing::{instrument, warn};

use placebook_model::CompletionBackend;
use placebook_segment::{Section, clean_category};
use placebook_shared::{Place, PlaceType, PlacebookError, Result};

use crate::prompts::{EXTRACTION_SYSTEM_PROMPT, build_extraction_prompt};
use crate::slug::assign_ids;

/// Category used for places found outside any heading.
const UNCATEGORIZED: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Candidate schema
// ---------------------------------------------------------------------------

/// One raw candidate as the model emits it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    orig_text: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Wrapper shape some models emit instead of a bare array.
#[derive(Debug, Deserialize)]
struct CandidateEnvelope {
    places: Vec<RawCandidate>,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract places from segmented document text.
///
/// Fatal on unparseable output or zero candidates: an empty catalog is not
/// a valid extraction outcome, and the caller must be able to distinguish
/// "document has no content" from "extractor malfunctioned".
#[instrument(skip_all, fields(sections = sections.len()))]
pub async fn extract_places(
    backend: &dyn CompletionBackend,
    sections: &[Section],
    location_context: &str,
) -> Result<Vec<Place>> {
    let prompt = build_extraction_prompt(sections, location_context);
    let response = backend
        .complete(EXTRACTION_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| PlacebookError::Extraction(format!("completion failed: {e}")))?;

    let mut places = parse_candidates(&response)?;
    if places.is_empty() {
        return Err(PlacebookError::Extraction(
            "model returned zero place candidates".into(),
        ));
    }

    assign_ids(&mut places);
    Ok(places)
}

/// Parse the model response into raw candidates.
///
/// Tolerates markdown code fences and a `{"places": [...]}` envelope; any
/// other shape is a fatal extraction error.
pub fn parse_candidates(response: &str) -> Result<Vec<Place>> {
    let stripped = strip_code_fence(response);

    let raw: Vec<RawCandidate> = match serde_json::from_str::<Vec<RawCandidate>>(stripped) {
        Ok(list) => list,
        Err(array_err) => serde_json::from_str::<CandidateEnvelope>(stripped)
            .map(|envelope| envelope.places)
            .map_err(|_| {
                PlacebookError::Extraction(format!(
                    "response is not a JSON place list: {array_err}"
                ))
            })?,
    };

    Ok(raw.into_iter().filter_map(into_place).collect())
}

/// Convert one raw candidate into a [`Place`], best-effort.
///
/// Validation is advisory: a malformed field is logged and repaired rather
/// than voiding the batch. Only a missing name is unrecoverable (no
/// identity can be derived).
fn into_place(raw: RawCandidate) -> Option<Place> {
    let name = match raw.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            warn!("dropping candidate without a name");
            return None;
        }
    };

    let orig_text = match raw.orig_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            warn!(name = %name, "candidate missing origText, falling back to name");
            name.clone()
        }
    };

    let category = raw
        .category
        .as_deref()
        .map(clean_category)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string());

    let place_type = match raw.place_type.as_deref() {
        Some(tag) => match tag.parse::<PlaceType>() {
            Ok(t) => t,
            Err(_) => {
                warn!(name = %name, place_type = tag, "unknown place type, using 'other'");
                PlaceType::Other
            }
        },
        None => PlaceType::Other,
    };

    let mut place = Place::extracted(name, orig_text, category);
    place.place_type = place_type;
    place.description = raw.description.filter(|d| !d.trim().is_empty());
    place.notes = raw.notes.filter(|n| !n.trim().is_empty());
    Some(place)
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use placebook_model::MockCompletion;
    use placebook_shared::PlacebookError;

    fn blue_moon_json() -> &'static str {
        r#"[{
            "name": "Blue Moon Cafe",
            "type": "dining",
            "description": "Amazing breakfast spot",
            "notes": null,
            "origText": "**Blue Moon Cafe** - https://bluemooncafe.com\nAmazing breakfast spot on the harbor!",
            "category": "Restaurants & Food"
        }]"#
    }

    fn guide_sections() -> Vec<Section> {
        vec![Section {
            category: Some("Restaurants & Food".into()),
            heading_level: 2,
            body: "**Blue Moon Cafe** - https://bluemooncafe.com\nAmazing breakfast spot on the harbor!".into(),
        }]
    }

    #[tokio::test]
    async fn extracts_blue_moon_cafe() {
        let mock = MockCompletion::new(vec![Ok(blue_moon_json().into())]);
        let places = extract_places(&mock, &guide_sections(), "Door County")
            .await
            .unwrap();

        assert_eq!(places.len(), 1);
        let place = &places[0];
        assert_eq!(place.name, "Blue Moon Cafe");
        assert_eq!(place.id, "blue-moon-cafe");
        assert_eq!(place.category, "Restaurants & Food");
        assert_eq!(
            place.orig_text,
            "**Blue Moon Cafe** - https://bluemooncafe.com\nAmazing breakfast spot on the harbor!"
        );
        assert_eq!(place.place_type, PlaceType::Dining);
    }

    #[tokio::test]
    async fn zero_candidates_is_extraction_error() {
        let mock = MockCompletion::new(vec![Ok("[]".into())]);
        let err = extract_places(&mock, &guide_sections(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, PlacebookError::Extraction(_)));
    }

    #[tokio::test]
    async fn garbage_response_is_extraction_error() {
        let mock = MockCompletion::new(vec![Ok("I found some nice places!".into())]);
        let err = extract_places(&mock, &guide_sections(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, PlacebookError::Extraction(_)));
    }

    #[test]
    fn parses_fenced_response() {
        let fenced = format!("```json\n{}\n```", blue_moon_json());
        let places = parse_candidates(&fenced).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Blue Moon Cafe");
    }

    #[test]
    fn parses_envelope_response() {
        let wrapped = format!(r#"{{"places": {}}}"#, blue_moon_json());
        let places = parse_candidates(&wrapped).unwrap();
        assert_eq!(places.len(), 1);
    }

    #[test]
    fn nameless_candidate_is_dropped_others_kept() {
        let json = r#"[
            {"name": "", "origText": "x", "category": "Dining"},
            {"name": "Kept Place", "origText": "y", "category": "Dining"}
        ]"#;
        let places = parse_candidates(json).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Kept Place");
    }

    #[test]
    fn unknown_type_degrades_to_other() {
        let json = r#"[{"name": "Odd Spot", "type": "nightclub", "origText": "t", "category": "Fun"}]"#;
        let places = parse_candidates(json).unwrap();
        assert_eq!(places[0].place_type, PlaceType::Other);
    }

    #[test]
    fn missing_category_becomes_uncategorized() {
        let json = r#"[{"name": "Stray Place", "origText": "t"}]"#;
        let places = parse_candidates(json).unwrap();
        assert_eq!(places[0].category, "Uncategorized");
    }

    #[test]
    fn category_is_cleaned_and_deduplicated() {
        let json = r#"[
            {"name": "A", "origText": "a", "category": "**restaurants & food**"},
            {"name": "B", "origText": "b", "category": "Restaurants & Food"}
        ]"#;
        let places = parse_candidates(json).unwrap();
        assert_eq!(places[0].category, places[1].category);
    }
}
