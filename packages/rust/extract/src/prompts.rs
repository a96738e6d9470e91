//! Prompt construction for the extraction phase.

use placebook_segment::Section;

/// System prompt for place extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You extract places (businesses, restaurants, activities, accommodations, \
shops, and other named locations) from travel-guide text.

Respond with ONLY a JSON array. Each element:
{
  \"name\": \"the place name\",
  \"type\": \"dining\" | \"activity\" | \"accommodation\" | \"shopping\" | \"other\",
  \"description\": \"short description drawn from the text, or null\",
  \"notes\": \"practical tips from the text (hours hints, cash only, ...), or null\",
  \"origText\": \"the EXACT verbatim text block this place came from\",
  \"category\": \"the section heading the place appears under\"
}

Rules:
- Cover the ENTIRE document. Do not stop early or summarize.
- origText must be copied verbatim, including formatting markers.
- Use the section headings as categories. Places before any heading get the \
category \"Uncategorized\".
- Do not invent places that are not in the text.
- Output no prose, no markdown fences, only the JSON array.";

/// Build the user prompt: location context plus the segmented document.
pub fn build_extraction_prompt(sections: &[Section], location_context: &str) -> String {
    let mut prompt = String::new();

    if !location_context.is_empty() {
        prompt.push_str("Location context: ");
        prompt.push_str(location_context);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Document:\n\n");
    for section in sections {
        match &section.category {
            Some(category) => {
                let level = usize::from(section.heading_level.max(1));
                prompt.push_str(&"#".repeat(level));
                prompt.push(' ');
                prompt.push_str(category);
                prompt.push_str("\n\n");
            }
            None => {}
        }
        if !section.body.is_empty() {
            prompt.push_str(&section.body);
            prompt.push_str("\n\n");
        }
    }

    prompt
}
