use crate::outline::OutlineFeedback;
use crate::project::TargetAge;

fn age_guidance(age: TargetAge) -> &'static str {
    match age {
        TargetAge::Ages3To5 => "ages 3-5 (short sentences, simple words, familiar concepts)",
        TargetAge::Ages5To8 => "ages 5-8 (richer vocabulary, a longer story arc)",
    }
}

/// System prompt asking for a JSON outline.
pub fn outline_system_prompt(age: TargetAge, page_count: u32, tone_keywords: &[String]) -> String {
    let audience = age_guidance(age);
    let tone = if tone_keywords.is_empty() {
        "warm".to_string()
    } else {
        tone_keywords.join(", ")
    };

    format!(
        r#"You write children's picture books for {audience}.

Plan a {page_count}-page picture book about the topic you are given.

The story needs:
- a protagonist with a goal a child can relate to
- a gentle challenge and a satisfying, hopeful resolution
- scenes that will make strong illustrations
- vocabulary and themes suited to {audience}

Tone: {tone}

Reply with one JSON object shaped like this:
{{
  "title": "Story title",
  "subtitle": "Optional subtitle",
  "synopsis": "Two or three sentences",
  "theme": "The core message",
  "characters": [
    {{
      "id": "char-1",
      "name": "Name",
      "role": "protagonist",
      "description": "Personality and motivation",
      "physicalDescription": "Precise visual appearance an illustrator can follow",
      "age": "optional"
    }}
  ],
  "setting": {{
    "location": "Where",
    "timePeriod": "When",
    "atmosphere": "Mood of the place",
    "visualDetails": "Concrete visual elements"
  }},
  "plotPoints": [
    {{
      "id": "plot-1",
      "order": 1,
      "title": "Beat title",
      "description": "What happens",
      "characters": ["char-1"]
    }}
  ],
  "coverDescription": "Front cover illustration",
  "backCoverDescription": "Back cover illustration",
  "backCoverBlurb": "Two-sentence blurb for the back cover"
}}"#
    )
}

pub fn outline_user_prompt(topic: &str, additional_instructions: Option<&str>) -> String {
    let mut prompt = format!("Write a picture book outline about: {topic}");
    if let Some(extra) = additional_instructions.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\n\nAlso: ");
        prompt.push_str(extra);
    }
    prompt
}

/// User prompt asking for a revised outline. `current` is the stored
/// outline as JSON; ids must survive so later feedback still resolves.
pub fn outline_refinement_prompt(current: &str, feedback: &OutlineFeedback) -> String {
    let notes = feedback
        .notes()
        .into_iter()
        .map(|(label, note)| format!("- {label}: {note}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Revise this picture book outline.\n\n\
         Current outline:\n{current}\n\n\
         Reviewer feedback:\n{notes}\n\n\
         Apply the feedback and keep everything it does not mention unchanged. \
         Keep existing character and plot point ids. \
         Reply with the complete revised outline in the same JSON shape."
    )
}
