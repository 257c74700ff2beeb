use serde::{Deserialize, Serialize};

use crate::manuscript::ManuscriptFeedback;
use crate::outline::Outline;
use crate::project::TargetAge;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Rhythmic,
    #[default]
    Narrative,
    Simple,
}

impl TextStyle {
    fn guidance(self) -> &'static str {
        match self {
            Self::Rhythmic => "rhythmic, gently rhyming text that is fun to read aloud",
            Self::Narrative => "plain storytelling prose",
            Self::Simple => "very short, simple sentences for early readers",
        }
    }
}

pub fn manuscript_system_prompt(
    age: TargetAge,
    page_count: u32,
    words_per_page: u32,
    style: TextStyle,
) -> String {
    let style = style.guidance();
    format!(
        r#"You are writing the page-by-page manuscript of a picture book for ages {}.

Produce exactly {page_count} pages, numbered 1 to {page_count}.

For every page give:
- text: what is printed on the page (null for a wordless page), written as {style}, about {words_per_page} words
- illustrationDescription: a detailed brief for the illustrator naming the characters present, their poses and expressions, the visible setting and the framing
- mood: the emotional tone
- action: what is happening
- characters: ids of the characters on the page
- textPlacement: one of "top", "bottom", "overlay", "integrated"
- spread: one of "left", "right", "full"

Pace the book: roughly the first fifth introduces, the next two fifths build, a quarter peaks, and the rest resolves.

Reply with one JSON object:
{{
  "pages": [
    {{
      "pageNumber": 1,
      "spread": "full",
      "text": "Page text",
      "textPlacement": "bottom",
      "illustrationDescription": "Illustrator brief",
      "characters": ["char-1"],
      "mood": "curious",
      "action": "What happens"
    }}
  ]
}}"#,
        age.as_str()
    )
}

pub fn manuscript_user_prompt(outline: &Outline, additional_guidance: Option<&str>) -> String {
    let characters = outline
        .characters
        .iter()
        .map(|c| {
            format!(
                "- {} [{}] ({:?}): {}\n  Looks: {}",
                c.name, c.id, c.role, c.description, c.physical_description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut plot: Vec<_> = outline.plot_points.iter().collect();
    plot.sort_by_key(|p| p.order);
    let plot = plot
        .iter()
        .map(|p| format!("{}. {}: {}", p.order, p.title, p.description))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Write the manuscript for this outline.\n\n\
         Title: {}\nSynopsis: {}\nTheme: {}\n\n\
         Characters:\n{characters}\n\n\
         Setting:\n- Location: {}\n- Time period: {}\n- Atmosphere: {}\n- Visual details: {}\n\n\
         Plot:\n{plot}",
        outline.title,
        outline.synopsis,
        outline.theme,
        outline.setting.location,
        outline.setting.time_period,
        outline.setting.atmosphere,
        outline.setting.visual_details,
    );
    if let Some(extra) = additional_guidance.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\n\nAdditional guidance: ");
        prompt.push_str(extra);
    }
    prompt
}

/// User prompt asking for a revised manuscript. `current` is the stored
/// manuscript as JSON.
pub fn manuscript_refinement_prompt(
    outline: &Outline,
    current: &str,
    feedback: &ManuscriptFeedback,
) -> String {
    let mut notes = Vec::new();
    if let Some(overall) = feedback.overall_note() {
        notes.push(format!("- Overall: {overall}"));
    }
    for (page, note) in feedback.page_notes() {
        notes.push(format!("- Page {page}: {note}"));
    }

    format!(
        "Revise the manuscript of \"{}\".\n\n\
         Current manuscript:\n{current}\n\n\
         Reviewer feedback:\n{}\n\n\
         Rewrite only what the feedback asks for. Keep the same page count and \
         page numbers. Reply with the complete revised manuscript in the same JSON shape.",
        outline.title,
        notes.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_pins_page_count() {
        let p = manuscript_system_prompt(TargetAge::Ages3To5, 8, 20, TextStyle::Rhythmic);
        assert!(p.contains("exactly 8 pages"));
        assert!(p.contains("ages 3-5"));
        assert!(p.contains("rhyming"));
    }
}
