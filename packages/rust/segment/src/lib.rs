//! Document segmenter.
//!
//! Splits raw guide text into ordered sections using `#`-style heading
//! markers. Every non-heading paragraph attaches to the most recently seen
//! heading; text before the first heading forms an anonymous leading
//! section. Pure transformation, no I/O, total: malformed heading structure
//! degrades to a single anonymous section rather than erroring.

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One document section: a heading (if any) and the body text under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Cleaned heading text. `None` for the anonymous leading section.
    pub category: Option<String>,
    /// Heading level (number of `#` markers); 0 for the anonymous section.
    pub heading_level: u8,
    /// Body text, trimmed, inner line structure preserved.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `# Heading` through `###### Heading`.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading regex"));

/// Markdown emphasis and stray markers stripped from category labels.
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`#~\[\]]").expect("marker regex"));

/// Whitespace runs collapsed to a single space.
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Split document text into ordered sections.
pub fn segment(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut category: Option<String> = None;
    let mut heading_level: u8 = 0;
    let mut body_lines: Vec<&str> = Vec::new();

    let mut flush = |category: &mut Option<String>,
                     heading_level: u8,
                     body_lines: &mut Vec<&str>,
                     sections: &mut Vec<Section>| {
        let body = body_lines.join("\n").trim().to_string();
        body_lines.clear();
        // An anonymous section with no content carries no information.
        if category.is_none() && body.is_empty() {
            return;
        }
        sections.push(Section {
            category: category.clone(),
            heading_level,
            body,
        });
    };

    for line in text.lines() {
        if let Some(caps) = HEADING_RE.captures(line.trim_end()) {
            flush(&mut category, heading_level, &mut body_lines, &mut sections);
            category = Some(clean_category(&caps[2]));
            heading_level = caps[1].len() as u8;
        } else {
            body_lines.push(line);
        }
    }
    flush(&mut category, heading_level, &mut body_lines, &mut sections);

    sections
}

/// Normalize a raw heading into a clean, human-readable category label.
///
/// Strips markdown markers, collapses whitespace, and title-cases words
/// so the same section written as `## restaurants & food` and
/// `## **Restaurants & Food**` deduplicates to one category.
pub fn clean_category(raw: &str) -> String {
    let stripped = MARKER_RE.replace_all(raw, "");
    let collapsed = WS_RE.replace_all(stripped.trim(), " ");

    collapsed
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_headings() {
        let text = "\
## Restaurants & Food

**Blue Moon Cafe** - https://bluemooncafe.com
Amazing breakfast spot on the harbor!

## Things To Do

**Lighthouse Tour** - great at sunset.
";
        let sections = segment(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category.as_deref(), Some("Restaurants & Food"));
        assert_eq!(sections[0].heading_level, 2);
        assert!(sections[0].body.contains("Blue Moon Cafe"));
        assert_eq!(sections[1].category.as_deref(), Some("Things To Do"));
        assert!(sections[1].body.contains("Lighthouse Tour"));
    }

    #[test]
    fn leading_text_becomes_anonymous_section() {
        let text = "Welcome to the guide!\n\n## Dining\n\nSome restaurant.\n";
        let sections = segment(text);
        assert_eq!(sections.len(), 2);
        assert!(sections[0].category.is_none());
        assert_eq!(sections[0].heading_level, 0);
        assert_eq!(sections[0].body, "Welcome to the guide!");
    }

    #[test]
    fn no_headings_degrades_to_single_anonymous_section() {
        let text = "Just a plain paragraph.\nAnother line.";
        let sections = segment(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].category.is_none());
        assert_eq!(sections[0].body, "Just a plain paragraph.\nAnother line.");
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(segment("").is_empty());
        assert!(segment("\n\n   \n").is_empty());
    }

    #[test]
    fn heading_with_empty_body_is_kept() {
        let text = "## Shopping\n\n## Dining\n\nA place.\n";
        let sections = segment(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category.as_deref(), Some("Shopping"));
        assert_eq!(sections[0].body, "");
    }

    #[test]
    fn clean_category_strips_markers_and_title_cases() {
        assert_eq!(clean_category("**restaurants & food**"), "Restaurants & Food");
        assert_eq!(clean_category("  things   to   do "), "Things To Do");
        assert_eq!(clean_category("`Shopping`"), "Shopping");
        assert_eq!(clean_category("_Hidden__Gems_"), "Hiddengems");
    }

    #[test]
    fn clean_category_is_idempotent() {
        let once = clean_category("## **Beaches & Parks**");
        assert_eq!(clean_category(&once), once);
    }
}
