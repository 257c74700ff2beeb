//! Image prompts for covers, pages and refinements.

use crate::illustration::{ImageType, ReferenceImageInfo, ReferenceKind};
use crate::manuscript::{ManuscriptPage, TextPlacement};
use crate::outline::{Character, Outline};
use crate::project::ProjectSettings;

/// Inputs shared by the front and back cover prompts.
#[derive(Debug, Clone, Copy)]
pub struct CoverContext<'a> {
    pub outline: &'a Outline,
    pub settings: &'a ProjectSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub page: &'a ManuscriptPage,
    pub outline: &'a Outline,
    pub settings: &'a ProjectSettings,
    pub additional_prompt: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct RefinementContext<'a> {
    pub image_type: ImageType,
    pub original_prompt: &'a str,
    pub illustration_description: &'a str,
    pub page_text: Option<&'a str>,
    pub feedback: &'a str,
    pub outline: &'a Outline,
    pub settings: &'a ProjectSettings,
}

// ---------------------------------------------------------------------------
// Shared blocks
// ---------------------------------------------------------------------------

fn style_line(settings: &ProjectSettings) -> String {
    format!(
        "Art style: {}, children's picture book illustration, warm inviting colors, professional quality.",
        settings.art_style_keywords.join(", ")
    )
}

/// Block of character appearances the image must match.
fn character_block<'a>(characters: impl IntoIterator<Item = &'a Character>) -> Option<String> {
    let lines: Vec<String> = characters
        .into_iter()
        .map(|c| format!("- {}: {}", c.name, c.physical_description))
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!(
        "CHARACTER REFERENCE (match these appearances exactly):\n{}",
        lines.join("\n")
    ))
}

fn setting_block(outline: &Outline) -> String {
    let s = &outline.setting;
    format!(
        "Setting:\n- Location: {}\n- Time period: {}\n- Atmosphere: {}\n- Visual details: {}",
        s.location, s.time_period, s.atmosphere, s.visual_details
    )
}

fn placement_hint(placement: TextPlacement) -> &'static str {
    match placement {
        TextPlacement::Top => "across the top of the image",
        TextPlacement::Bottom => "across the bottom of the image",
        _ => "woven naturally into the scene",
    }
}

/// Text-rendering instructions for ai-baked composition.
fn baked_text_block(text: &str, font_style: &str, placement: &str) -> String {
    format!(
        "TEXT TO RENDER IN THE IMAGE:\n\"{text}\"\n\n\
         - Font style: {font_style}, friendly and easy for children to read\n\
         - Place the text {placement}\n\
         - The text must be fully legible; add a soft translucent panel behind it if needed\n\
         - Every word must appear exactly as written"
    )
}

const CLOSING: &str = "This is for a children's book: keep it age-appropriate, gentle, never scary, \
and consistent with the book's art style.";

fn join_blocks(blocks: Vec<String>) -> String {
    blocks
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Front cover prompt. The cover is generated without references and
/// anchors the style of everything after it.
pub fn cover_prompt(ctx: CoverContext<'_>) -> String {
    let CoverContext { outline, settings } = ctx;
    let mut blocks = vec![
        format!(
            "Create the FRONT COVER of a children's picture book for ages {}.",
            settings.target_age.as_str()
        ),
        style_line(settings),
        format!("Title: {}", outline.title),
        format!("Cover scene:\n{}", outline.cover_description),
    ];
    blocks.extend(character_block(outline.protagonist()));
    blocks.push(setting_block(outline));
    if settings.bakes_text() {
        blocks.push(baked_text_block(
            &outline.title,
            &settings.font_style,
            "as a prominent title near the top",
        ));
    }
    blocks.push(CLOSING.to_string());
    join_blocks(blocks)
}

pub fn back_cover_prompt(ctx: CoverContext<'_>) -> String {
    let CoverContext { outline, settings } = ctx;
    let mut blocks = vec![
        format!(
            "Create the BACK COVER of a children's picture book for ages {}. \
             It must match the front cover and interior pages you already drew in this session.",
            settings.target_age.as_str()
        ),
        style_line(settings),
        format!("Back cover scene:\n{}", outline.back_cover_description),
    ];
    blocks.extend(character_block(outline.protagonist()));
    blocks.push(setting_block(outline));
    if settings.bakes_text() && !outline.back_cover_blurb.trim().is_empty() {
        blocks.push(baked_text_block(
            &outline.back_cover_blurb,
            &settings.font_style,
            "in a calm area of the composition",
        ));
    }
    blocks.push(CLOSING.to_string());
    join_blocks(blocks)
}

/// Prompt for one content page.
pub fn page_prompt(ctx: PageContext<'_>) -> String {
    let PageContext {
        page,
        outline,
        settings,
        additional_prompt,
    } = ctx;
    let mut blocks = vec![
        format!(
            "Create the illustration for page {} of a children's picture book for ages {}.",
            page.page_number,
            settings.target_age.as_str()
        ),
        style_line(settings),
        format!("Scene:\n{}", page.illustration_description),
        format!("Mood: {}\nAction: {}", page.mood, page.action),
        setting_block(outline),
    ];
    blocks.extend(character_block(outline.characters_by_ids(&page.characters)));
    if settings.bakes_text() {
        if let Some(text) = page.visible_text() {
            blocks.push(baked_text_block(
                text,
                &settings.font_style,
                placement_hint(page.text_placement),
            ));
        }
    }
    if let Some(extra) = additional_prompt.filter(|s| !s.trim().is_empty()) {
        blocks.push(format!("Additional instructions: {extra}"));
    }
    blocks.push(CLOSING.to_string());
    join_blocks(blocks)
}

/// Instruction block describing the attached reference images. Empty when
/// there are none.
pub fn reference_instructions(references: &[ReferenceImageInfo]) -> String {
    if references.is_empty() {
        return String::new();
    }
    let listed = references
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let role = match r.kind {
                ReferenceKind::Style => "style anchor",
                ReferenceKind::PreviousPage => "previous page",
                ReferenceKind::Character => "character",
            };
            format!("{}. {} ({role})", i + 1, r.label)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "REFERENCE IMAGES PROVIDED:\n{listed}\n\n\
         Match the references exactly:\n\
         - the same art style and color palette\n\
         - identical character proportions, colors and clothing\n\
         - the same line weight and texture\n\
         - the same background treatment"
    )
}

/// Prompt for regenerating an existing illustration with user feedback.
pub fn refinement_prompt(ctx: RefinementContext<'_>) -> String {
    let label = match ctx.image_type {
        ImageType::Cover => "front cover",
        ImageType::BackCover => "back cover",
        ImageType::Page => "page illustration",
    };
    let mut blocks = vec![
        format!(
            "Revise this {label} of a children's picture book. The attached original image shows the current version; \
             keep everything the feedback does not ask to change."
        ),
        format!("Original prompt:\n{}", ctx.original_prompt),
        format!("Illustration description:\n{}", ctx.illustration_description),
    ];
    if let Some(text) = ctx.page_text.filter(|t| !t.trim().is_empty()) {
        blocks.push(format!("Text on this page:\n\"{text}\""));
    }
    blocks.push(format!("REQUESTED CHANGES:\n{}", ctx.feedback));
    blocks.extend(character_block(&ctx.outline.characters));
    blocks.push(style_line(ctx.settings));
    blocks.push(CLOSING.to_string());
    join_blocks(blocks)
}
