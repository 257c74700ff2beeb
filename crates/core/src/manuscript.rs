//! Page-by-page manuscript.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSpread {
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPlacement {
    Top,
    Bottom,
    Overlay,
    Integrated,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManuscriptPage {
    pub page_number: u32,
    pub spread: PageSpread,
    pub text: Option<String>,
    pub text_placement: TextPlacement,
    pub illustration_description: String,
    /// Ids of the outline characters that appear on this page.
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub action: String,
}

impl ManuscriptPage {
    /// Page text if it is present and not blank.
    pub fn visible_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    pub pages: Vec<ManuscriptPage>,
}

impl Manuscript {
    pub fn page(&self, number: u32) -> Option<&ManuscriptPage> {
        self.pages.iter().find(|p| p.page_number == number)
    }

    /// Check that page numbers are unique and cover exactly `1..=expected`.
    pub fn validate(&self, expected: u32) -> Result<(), CoreError> {
        let mut seen = BTreeSet::new();
        for page in &self.pages {
            if !seen.insert(page.page_number) {
                return Err(CoreError::Validation(format!(
                    "Duplicate manuscript page number {}",
                    page.page_number
                )));
            }
        }
        let contiguous = seen.iter().copied().eq(1..=expected);
        if !contiguous {
            return Err(CoreError::Validation(format!(
                "Manuscript must contain pages 1..={expected}, got {} pages",
                self.pages.len()
            )));
        }
        Ok(())
    }

    /// Pages in ascending page-number order.
    pub fn sorted_pages(&self) -> Vec<&ManuscriptPage> {
        let mut pages: Vec<_> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.page_number);
        pages
    }
}

/// Reviewer notes on a manuscript, overall and per page number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManuscriptFeedback {
    pub overall: Option<String>,
    pub pages: BTreeMap<u32, String>,
}

impl ManuscriptFeedback {
    pub fn overall_note(&self) -> Option<&str> {
        self.overall
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Non-blank page notes in ascending page order.
    pub fn page_notes(&self) -> Vec<(u32, &str)> {
        self.pages
            .iter()
            .map(|(n, note)| (*n, note.trim()))
            .filter(|(_, note)| !note.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.overall_note().is_none() && self.page_notes().is_empty()
    }

    /// Page notes must address pages `1..=page_count`.
    pub fn check_pages(&self, page_count: u32) -> Result<(), CoreError> {
        match self.pages.keys().find(|n| !(1..=page_count).contains(*n)) {
            Some(n) => Err(CoreError::Validation(format!(
                "Feedback for page {n} is outside pages 1..={page_count}"
            ))),
            None => Ok(()),
        }
    }
}
