//! The project aggregate and its settings.
//!
//! A [`Project`] is persisted as a single JSON document. Field names are
//! camelCase on the wire so project files stay readable by the wizard
//! client without a translation layer.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::illustration::{IllustrationTarget, PageImage};
use crate::manuscript::Manuscript;
use crate::outline::Outline;
use crate::types::{new_id, ProjectId, Timestamp};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Pipeline stage. Ordered: a project only ever moves forward implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Outline,
    Manuscript,
    Illustrations,
    Export,
}

/// Reader age band the book is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetAge {
    #[serde(rename = "3-5")]
    Ages3To5,
    #[serde(rename = "5-8")]
    Ages5To8,
}

impl TargetAge {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ages3To5 => "3-5",
            Self::Ages5To8 => "5-8",
        }
    }

    /// Default words per manuscript page for this age band.
    pub fn default_words_per_page(self) -> u32 {
        match self {
            Self::Ages3To5 => 20,
            Self::Ages5To8 => 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait2x3 => "2:3",
            Self::Landscape3x2 => "3:2",
        }
    }
}

/// How page text ends up on the final page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextCompositionMode {
    /// The image model renders the text into the pixels.
    AiBaked,
    AiOverlay,
    Manual,
    None,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Minimum and maximum number of content pages a book may have.
pub const MIN_PAGE_COUNT: u32 = 4;
pub const MAX_PAGE_COUNT: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub target_age: TargetAge,
    pub target_page_count: u32,
    pub aspect_ratio: AspectRatio,
    pub tone_keywords: Vec<String>,
    pub art_style_keywords: Vec<String>,
    pub text_composition_mode: TextCompositionMode,
    pub font_style: String,
    pub text_model: String,
    pub image_model: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            target_age: TargetAge::Ages3To5,
            target_page_count: 12,
            aspect_ratio: AspectRatio::Portrait3x4,
            tone_keywords: vec!["whimsical".to_string()],
            art_style_keywords: vec![
                "watercolor".to_string(),
                "soft".to_string(),
                "children book illustration".to_string(),
            ],
            text_composition_mode: TextCompositionMode::AiBaked,
            font_style: "storybook-serif".to_string(),
            text_model: "claude-opus-4-5-20251101".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
        }
    }
}

impl ProjectSettings {
    /// Whether the image model is asked to paint text into the picture.
    pub fn bakes_text(&self) -> bool {
        self.text_composition_mode == TextCompositionMode::AiBaked
    }
}

/// Partial settings supplied on create/update; unset fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettingsPatch {
    pub target_age: Option<TargetAge>,
    pub target_page_count: Option<u32>,
    pub aspect_ratio: Option<AspectRatio>,
    pub tone_keywords: Option<Vec<String>>,
    pub art_style_keywords: Option<Vec<String>>,
    pub text_composition_mode: Option<TextCompositionMode>,
    pub font_style: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

impl ProjectSettingsPatch {
    /// Merge this patch onto `settings`, validating the page count.
    pub fn apply_to(self, settings: &mut ProjectSettings) -> Result<(), CoreError> {
        if let Some(count) = self.target_page_count {
            validate_page_count(count)?;
            settings.target_page_count = count;
        }
        if let Some(v) = self.target_age {
            settings.target_age = v;
        }
        if let Some(v) = self.aspect_ratio {
            settings.aspect_ratio = v;
        }
        if let Some(v) = self.tone_keywords {
            settings.tone_keywords = v;
        }
        if let Some(v) = self.art_style_keywords {
            settings.art_style_keywords = v;
        }
        if let Some(v) = self.text_composition_mode {
            settings.text_composition_mode = v;
        }
        if let Some(v) = self.font_style {
            settings.font_style = v;
        }
        if let Some(v) = self.text_model {
            settings.text_model = v;
        }
        if let Some(v) = self.image_model {
            settings.image_model = v;
        }
        Ok(())
    }
}

/// Validate a requested content page count.
pub fn validate_page_count(count: u32) -> Result<(), CoreError> {
    if (MIN_PAGE_COUNT..=MAX_PAGE_COUNT).contains(&count) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Page count {count} out of range. Must be between {MIN_PAGE_COUNT} and {MAX_PAGE_COUNT}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Root aggregate: one picture book in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub topic: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub settings: ProjectSettings,
    pub current_stage: Stage,
    pub outline: Option<Outline>,
    pub manuscript: Option<Manuscript>,
    #[serde(default)]
    pub page_images: Vec<PageImage>,
    #[serde(default)]
    pub cover_image: Option<PageImage>,
    #[serde(default)]
    pub back_cover_image: Option<PageImage>,
}

impl Project {
    /// Create a fresh project at the outline stage.
    pub fn new(name: impl Into<String>, topic: impl Into<String>, settings: ProjectSettings) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            topic: topic.into(),
            created_at: now,
            updated_at: now,
            settings,
            current_stage: Stage::Outline,
            outline: None,
            manuscript: None,
            page_images: Vec::new(),
            cover_image: None,
            back_cover_image: None,
        }
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }

    /// Move the stage forward to `stage`. Never moves it backwards.
    pub fn advance_stage(&mut self, stage: Stage) {
        self.current_stage = self.current_stage.max(stage);
    }

    /// Replace the outline. Outlines have no prerequisite.
    pub fn set_outline(&mut self, outline: Outline) {
        self.outline = Some(outline);
        self.advance_stage(Stage::Outline);
        self.touch();
    }

    /// Replace the manuscript. Requires an outline.
    pub fn set_manuscript(&mut self, manuscript: Manuscript) -> Result<(), CoreError> {
        if self.outline.is_none() {
            return Err(CoreError::prerequisite("store manuscript", "outline"));
        }
        self.manuscript = Some(manuscript);
        self.advance_stage(Stage::Manuscript);
        self.touch();
        Ok(())
    }

    /// Outline and manuscript, or a prerequisite error naming whichever is
    /// missing (outline first).
    pub fn story(&self, action: &'static str) -> Result<(&Outline, &Manuscript), CoreError> {
        let outline = self
            .outline
            .as_ref()
            .ok_or_else(|| CoreError::prerequisite(action, "outline"))?;
        let manuscript = self
            .manuscript
            .as_ref()
            .ok_or_else(|| CoreError::prerequisite(action, "manuscript"))?;
        Ok((outline, manuscript))
    }

    /// The current illustration stored in `target`'s slot, if any.
    pub fn illustration(&self, target: IllustrationTarget) -> Option<&PageImage> {
        match target {
            IllustrationTarget::Cover => self.cover_image.as_ref(),
            IllustrationTarget::BackCover => self.back_cover_image.as_ref(),
            IllustrationTarget::Page(n) => self
                .page_images
                .iter()
                .find(|img| img.slot == IllustrationTarget::Page(n)),
        }
    }

    /// Store `image` in the slot its own target names.
    ///
    /// Content pages are upserted by page number and the list is kept sorted,
    /// so storing the same page twice leaves exactly one entry. Any stored
    /// illustration advances the stage to `illustrations`.
    pub fn put_illustration(&mut self, image: PageImage) {
        match image.slot {
            IllustrationTarget::Cover => self.cover_image = Some(image),
            IllustrationTarget::BackCover => self.back_cover_image = Some(image),
            IllustrationTarget::Page(n) => {
                match self
                    .page_images
                    .iter_mut()
                    .find(|img| img.slot == IllustrationTarget::Page(n))
                {
                    Some(existing) => *existing = image,
                    None => self.page_images.push(image),
                }
                self.page_images.sort_by_key(|img| img.slot.page_number());
            }
        }
        self.advance_stage(Stage::Illustrations);
        self.touch();
    }

    /// Lightweight listing view.
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            current_stage: self.current_stage,
            thumbnail_path: self
                .cover_image
                .as_ref()
                .or_else(|| self.page_images.first())
                .map(|img| img.image_path.clone()),
            title: self.outline.as_ref().map(|o| o.title.clone()),
            has_cover_image: self.cover_image.is_some(),
            has_page_images: !self.page_images.is_empty(),
        }
    }
}

/// Listing entry for the project sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub current_stage: Stage,
    pub thumbnail_path: Option<String>,
    pub title: Option<String>,
    pub has_cover_image: bool,
    pub has_page_images: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
