//! Illustrations, their slots, and the metadata recorded per generation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::project::AspectRatio;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Which illustration slot of a book an image occupies.
///
/// On the wire this is a string (`"cover"`, `"back-cover"`) or a positive
/// page number. Inside a stored [`PageImage`] it keeps the legacy
/// `pageNumber` encoding (0 front cover, -1 back cover).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TargetRepr", into = "TargetRepr")]
pub enum IllustrationTarget {
    Cover,
    BackCover,
    Page(u32),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Named(String),
    Page(u32),
}

impl TryFrom<TargetRepr> for IllustrationTarget {
    type Error = String;

    fn try_from(repr: TargetRepr) -> Result<Self, Self::Error> {
        match repr {
            TargetRepr::Named(name) => match name.as_str() {
                "cover" => Ok(Self::Cover),
                "back-cover" | "backCover" => Ok(Self::BackCover),
                other => Err(format!("unknown illustration target '{other}'")),
            },
            TargetRepr::Page(0) => Err("page numbers start at 1".to_string()),
            TargetRepr::Page(n) => Ok(Self::Page(n)),
        }
    }
}

impl From<IllustrationTarget> for TargetRepr {
    fn from(target: IllustrationTarget) -> Self {
        match target {
            IllustrationTarget::Cover => TargetRepr::Named("cover".to_string()),
            IllustrationTarget::BackCover => TargetRepr::Named("back-cover".to_string()),
            IllustrationTarget::Page(n) => TargetRepr::Page(n),
        }
    }
}

impl IllustrationTarget {
    /// Legacy `pageNumber` encoding.
    pub fn page_number(self) -> i64 {
        match self {
            Self::Cover => 0,
            Self::BackCover => -1,
            Self::Page(n) => i64::from(n),
        }
    }

    pub fn from_page_number(n: i64) -> Option<Self> {
        match n {
            0 => Some(Self::Cover),
            -1 => Some(Self::BackCover),
            n if n > 0 => u32::try_from(n).ok().map(Self::Page),
            _ => None,
        }
    }

    /// Fixed storage location of this slot's image.
    pub fn storage_key(self) -> (ImageCategory, String) {
        match self {
            Self::Cover => (ImageCategory::Cover, "front".to_string()),
            Self::BackCover => (ImageCategory::Cover, "back".to_string()),
            Self::Page(n) => (ImageCategory::Pages, format!("page-{n}")),
        }
    }
}

impl fmt::Display for IllustrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cover => f.write_str("cover"),
            Self::BackCover => f.write_str("back cover"),
            Self::Page(n) => write!(f, "page {n}"),
        }
    }
}

/// `pageNumber` (de)serialization for [`PageImage::slot`].
mod slot_number {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::IllustrationTarget;

    pub fn serialize<S: Serializer>(slot: &IllustrationTarget, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(slot.page_number())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<IllustrationTarget, D::Error> {
        let n = i64::deserialize(d)?;
        IllustrationTarget::from_page_number(n)
            .ok_or_else(|| de::Error::custom(format!("invalid page number {n}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageType {
    Page,
    Cover,
    BackCover,
}

impl From<IllustrationTarget> for ImageType {
    fn from(target: IllustrationTarget) -> Self {
        match target {
            IllustrationTarget::Cover => Self::Cover,
            IllustrationTarget::BackCover => Self::BackCover,
            IllustrationTarget::Page(_) => Self::Page,
        }
    }
}

impl ImageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Cover => "cover",
            Self::BackCover => "back-cover",
        }
    }
}

/// Top-level directory an image blob is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCategory {
    Pages,
    Cover,
    Composed,
    References,
}

impl ImageCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Cover => "cover",
            Self::Composed => "composed",
            Self::References => "references",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pages" => Some(Self::Pages),
            "cover" => Some(Self::Cover),
            "composed" => Some(Self::Composed),
            "references" => Some(Self::References),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stored illustration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    Character,
    PreviousPage,
    Style,
}

/// Descriptor of a reference image sent with a generation call. Never
/// carries the image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImageInfo {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

/// A reference image loaded for one generation call. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub kind: ReferenceKind,
    pub label: String,
    pub data: Vec<u8>,
    pub mime_type: String,
    pub source_path: Option<String>,
}

impl ReferenceImage {
    pub fn info(&self) -> ReferenceImageInfo {
        ReferenceImageInfo {
            kind: self.kind,
            label: self.label.clone(),
            source_path: self.source_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub session_id: String,
    pub prompt: String,
    pub reference_images: Vec<ReferenceImageInfo>,
    pub model_used: String,
    pub generated_at: Timestamp,
    pub generation_time_ms: u64,
    pub aspect_ratio: AspectRatio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_index: Option<u32>,
}

/// One rendered illustration as stored in the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImage {
    #[serde(rename = "pageNumber", with = "slot_number")]
    pub slot: IllustrationTarget,
    pub image_path: String,
    pub has_text_baked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baked_text: Option<String>,
    pub prompt: String,
    pub generated_at: Timestamp,
    pub model_used: String,
    pub aspect_ratio: AspectRatio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<ImageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_metadata: Option<GenerationMetadata>,
}

// ---------------------------------------------------------------------------
// Refinement
// ---------------------------------------------------------------------------

/// User feedback for a batch refinement. Lives only for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IllustrationFeedback {
    pub cover: Option<String>,
    pub back_cover: Option<String>,
    pub pages: BTreeMap<u32, String>,
}

impl IllustrationFeedback {
    /// Refinement targets in processing order: cover, pages ascending,
    /// back cover. Blank feedback strings are skipped.
    pub fn targets(&self) -> Vec<(IllustrationTarget, &str)> {
        fn non_blank(s: &str) -> Option<&str> {
            let t = s.trim();
            (!t.is_empty()).then_some(t)
        }

        let mut out = Vec::new();
        if let Some(text) = self.cover.as_deref().and_then(non_blank) {
            out.push((IllustrationTarget::Cover, text));
        }
        for (page, text) in &self.pages {
            if let Some(text) = non_blank(text) {
                out.push((IllustrationTarget::Page(*page), text));
            }
        }
        if let Some(text) = self.back_cover.as_deref().and_then(non_blank) {
            out.push((IllustrationTarget::BackCover, text));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.targets().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<PageImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_cover: Option<PageImage>,
    pub pages: Vec<PageImage>,
}
