//! Model-driven tag synthesis with taxonomy fallback.

use tracing::{instrument, warn};

use placebook_model::CompletionBackend;
use placebook_shared::{Hours, Place};

use crate::hours::summarize_hours;

/// System prompt for tag synthesis.
pub const TAG_SYSTEM_PROMPT: &str = "\
You generate search tags for places in a travel catalog.

Given a place's source text and its business classification, respond with \
ONLY a JSON array of 5-12 short lowercase tags. Combine experiential cues \
from the text (\"cash only\", \"harbor view\", \"kid friendly\") with \
categorical cues from the classification (\"restaurant\", \
\"tourist attraction\"). No prose, no markdown fences.";

/// Result of one tag-synthesis pass.
#[derive(Debug, Clone)]
pub struct TagOutcome {
    /// Lowercase, deduplicated tags.
    pub tags: Vec<String>,
    /// Normalized hours, present only when the place has raw weekly hours.
    pub hours: Option<Hours>,
    /// Set when the model call failed and taxonomy fallback was used.
    pub degraded: Option<String>,
}

/// Build the user prompt from the place's text and taxonomy.
pub fn build_tag_prompt(place: &Place) -> String {
    let mut prompt = format!("Place: {}\n", place.name);
    prompt.push_str(&format!("Type: {}\n", place.place_type));

    if !place.place_taxonomy.is_empty() {
        prompt.push_str(&format!(
            "Classification: {}\n",
            place.place_taxonomy.join(", ")
        ));
    }
    prompt.push_str(&format!("\nSource text:\n{}\n", place.orig_text));
    if let Some(description) = &place.description {
        prompt.push_str(&format!("\nDescription: {description}\n"));
    }
    if let Some(notes) = &place.notes {
        prompt.push_str(&format!("\nNotes: {notes}\n"));
    }

    prompt
}

/// Synthesize tags (and normalized hours) for one place.
///
/// Never fails: a model error degrades to taxonomy-derived tags and is
/// reported in [`TagOutcome::degraded`] for the caller to log.
#[instrument(skip_all, fields(place = %place.id))]
pub async fn synthesize(backend: &dyn CompletionBackend, place: &Place) -> TagOutcome {
    let hours = place.hours.as_ref().map(summarize_hours);

    let reason = match backend
        .complete(TAG_SYSTEM_PROMPT, &build_tag_prompt(place))
        .await
        .and_then(|response| parse_tags(&response))
    {
        Ok(tags) if !tags.is_empty() => {
            return TagOutcome {
                tags,
                hours,
                degraded: None,
            };
        }
        Ok(_) => "model returned zero tags".to_string(),
        Err(e) => e.to_string(),
    };

    warn!(place = %place.id, reason = %reason, "tag synthesis degraded to taxonomy fallback");
    TagOutcome {
        tags: fallback_tags(place),
        hours,
        degraded: Some(reason),
    }
}

/// Taxonomy-derived fallback: the place type plus normalized taxonomy terms.
pub fn fallback_tags(place: &Place) -> Vec<String> {
    let mut raw = vec![place.place_type.as_str().to_string()];
    raw.extend(
        place
            .place_taxonomy
            .iter()
            .map(|term| term.replace('_', " ")),
    );
    normalize_tags(raw)
}

/// Parse the model response as a JSON array of strings.
fn parse_tags(response: &str) -> placebook_shared::Result<Vec<String>> {
    let stripped = strip_code_fence(response);
    let raw: Vec<String> = serde_json::from_str(stripped).map_err(|e| {
        placebook_shared::PlacebookError::TagSynthesis(format!("response is not a tag array: {e}"))
    })?;
    Ok(normalize_tags(raw))
}

/// Lowercase, trim, drop empties, dedupe preserving first-seen order.
fn normalize_tags(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
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
    use placebook_shared::{PlaceType, PlacebookError};

    fn enriched_cafe() -> Place {
        let mut place = Place::extracted(
            "Blue Moon Cafe",
            "**Blue Moon Cafe** - cash only, amazing harbor views!",
            "Restaurants & Food",
        );
        place.id = "blue-moon-cafe".into();
        place.place_type = PlaceType::Dining;
        place.place_taxonomy = vec!["cafe".into(), "tourist_attraction".into()];
        place
    }

    #[tokio::test]
    async fn model_tags_are_normalized() {
        let mock = MockCompletion::new(vec![Ok(
            r#"["Cash Only", "harbor view", "cafe", "cash only "]"#.into(),
        )]);
        let outcome = synthesize(&mock, &enriched_cafe()).await;

        assert_eq!(outcome.tags, vec!["cash only", "harbor view", "cafe"]);
        assert!(outcome.degraded.is_none());
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_taxonomy() {
        let mock = MockCompletion::new(vec![Err(PlacebookError::Network("timeout".into()))]);
        let outcome = synthesize(&mock, &enriched_cafe()).await;

        assert_eq!(outcome.tags, vec!["dining", "cafe", "tourist attraction"]);
        assert!(outcome.degraded.is_some());
    }

    #[tokio::test]
    async fn unparseable_response_falls_back() {
        let mock = MockCompletion::new(vec![Ok("tags: cafe, harbor".into())]);
        let outcome = synthesize(&mock, &enriched_cafe()).await;
        assert_eq!(outcome.tags[0], "dining");
        assert!(outcome.degraded.is_some());
    }

    #[tokio::test]
    async fn hours_are_summarized_when_present() {
        let mut place = enriched_cafe();
        let weekly: std::collections::BTreeMap<_, _> = placebook_shared::Weekday::ALL
            .iter()
            .map(|day| (*day, "8 AM – 2 PM".to_string()))
            .collect();
        place.hours = Some(Hours::Weekly(weekly));

        let mock = MockCompletion::new(vec![Ok(r#"["cafe"]"#.into())]);
        let outcome = synthesize(&mock, &place).await;
        assert_eq!(outcome.hours, Some(Hours::Text("Daily: 8 AM – 2 PM".into())));
    }

    #[tokio::test]
    async fn no_hours_yields_none() {
        let mock = MockCompletion::new(vec![Ok(r#"["cafe"]"#.into())]);
        let outcome = synthesize(&mock, &enriched_cafe()).await;
        assert!(outcome.hours.is_none());
    }

    #[test]
    fn prompt_includes_text_and_taxonomy() {
        let prompt = build_tag_prompt(&enriched_cafe());
        assert!(prompt.contains("cash only, amazing harbor views"));
        assert!(prompt.contains("cafe, tourist_attraction"));
        assert!(prompt.contains("Type: dining"));
    }

    #[test]
    fn fenced_tag_response_parses() {
        let parsed = parse_tags("```json\n[\"a\", \"b\"]\n```").unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }
}
