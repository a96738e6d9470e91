//! Weekly-hours normalization.

use std::collections::BTreeMap;

use placebook_shared::{Hours, Weekday};

/// Produce the human-readable hours representation.
///
/// Free-text hours pass through unchanged. A weekly map collapses to a
/// single sentence when every day has identical hours; otherwise every
/// weekday is listed, with closed days explicitly marked "Closed" rather
/// than omitted.
pub fn summarize_hours(hours: &Hours) -> Hours {
    let Hours::Weekly(weekly) = hours else {
        return hours.clone();
    };

    let mut normalized: BTreeMap<Weekday, String> = BTreeMap::new();
    for day in Weekday::ALL {
        let value = weekly
            .get(&day)
            .map(|v| normalize_day(v))
            .unwrap_or_else(|| "Closed".to_string());
        normalized.insert(day, value);
    }

    let mut values = normalized.values();
    let first = values.next().cloned().unwrap_or_default();
    if values.all(|v| *v == first) {
        if first == "Closed" {
            return Hours::Text("Closed".to_string());
        }
        return Hours::Text(format!("Daily: {first}"));
    }

    Hours::Weekly(normalized)
}

fn normalize_day(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("closed") {
        "Closed".to_string()
    } else {
        trimmed.to_string()
    }
}
