//! Tag synthesis: compact search tags and normalized hours for each place.
//!
//! Tags combine experiential cues from the extracted text ("cash only",
//! "harbor view") with categorical cues from the external taxonomy
//! ("restaurant", "tourist attraction"). A failed model call never blocks
//! the pipeline: the fallback is the place type plus normalized taxonomy
//! terms.

mod hours;
mod synth;

pub use hours::summarize_hours;
pub use synth::{TAG_SYSTEM_PROMPT, TagOutcome, build_tag_prompt, fallback_tags, synthesize};
