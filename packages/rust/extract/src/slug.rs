//! Identity assignment: stable URL-safe slugs derived from place names.

use placebook_shared::Place;
use tracing::warn;

/// Derive a URL-safe identifier from a place name.
///
/// Lowercase, strip characters outside `[a-z0-9\s-]`, collapse whitespace
/// runs to single hyphens, collapse repeated hyphens, trim leading and
/// trailing hyphens. Deterministic and total for any non-empty name;
/// an empty or whitespace-only name is a caller error and yields `""`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_hyphen = false;

    for ch in lowered.chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' => Some(ch),
            ch if ch.is_whitespace() => Some('-'),
            '-' => Some('-'),
            _ => None,
        };
        match mapped {
            Some('-') => {
                if !last_hyphen && !out.is_empty() {
                    out.push('-');
                    last_hyphen = true;
                }
            }
            Some(ch) => {
                out.push(ch);
                last_hyphen = false;
            }
            None => {}
        }
    }

    out.trim_end_matches('-').to_string()
}

/// Assign ids to places that lack one. Existing ids are never overwritten,
/// preserving identity continuity across runs even if a name's casing or
/// wording drifts slightly in a later extraction pass.
///
/// Within one batch, a slug collision gets a numeric suffix so ids stay
/// unique in document order.
pub fn assign_ids(places: &mut [Place]) {
    let mut taken: std::collections::HashSet<String> = places
        .iter()
        .filter(|p| !p.id.is_empty())
        .map(|p| p.id.clone())
        .collect();

    for place in places.iter_mut() {
        if !place.id.is_empty() {
            continue;
        }
        let base = slugify(&place.name);
        if base.is_empty() {
            warn!(name = %place.name, "place name produced an empty slug");
            continue;
        }
        let mut candidate = base.clone();
        let mut n = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        place.id = candidate;
    }
}
