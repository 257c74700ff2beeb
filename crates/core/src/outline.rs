//! Story outline: characters, setting, plot points and cover copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterRole {
    Protagonist,
    Supporting,
    Antagonist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub role: CharacterRole,
    pub description: String,
    /// Appearance details every illustration must match exactly.
    pub physical_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub location: String,
    pub time_period: String,
    pub atmosphere: String,
    pub visual_details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotPoint {
    pub id: String,
    pub order: u32,
    pub title: String,
    pub description: String,
    /// Ids of the characters involved.
    #[serde(default)]
    pub characters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub synopsis: String,
    pub theme: String,
    pub characters: Vec<Character>,
    pub setting: Setting,
    pub plot_points: Vec<PlotPoint>,
    #[serde(default)]
    pub cover_description: String,
    #[serde(default)]
    pub back_cover_description: String,
    #[serde(default)]
    pub back_cover_blurb: String,
}

impl Outline {
    /// The first protagonist, falling back to the first character.
    pub fn protagonist(&self) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.role == CharacterRole::Protagonist)
            .or_else(|| self.characters.first())
    }

    /// Characters whose id is in `ids`, in outline order.
    pub fn characters_by_ids<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = &'a Character> {
        self.characters.iter().filter(move |c| ids.contains(&c.id))
    }
}

/// Reviewer notes on an outline. Characters and plot points are addressed
/// by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlineFeedback {
    pub overall: Option<String>,
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub theme: Option<String>,
    pub setting: Option<String>,
    pub characters: BTreeMap<String, String>,
    pub plot_points: BTreeMap<String, String>,
    pub cover_description: Option<String>,
    pub back_cover_description: Option<String>,
    pub back_cover_blurb: Option<String>,
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

impl OutlineFeedback {
    /// Non-blank notes as `(label, note)` pairs, overall first.
    pub fn notes(&self) -> Vec<(String, &str)> {
        let fields = [
            ("Overall", &self.overall),
            ("Title", &self.title),
            ("Synopsis", &self.synopsis),
            ("Theme", &self.theme),
            ("Setting", &self.setting),
            ("Cover description", &self.cover_description),
            ("Back cover description", &self.back_cover_description),
            ("Back cover blurb", &self.back_cover_blurb),
        ];
        let mut out: Vec<(String, &str)> = fields
            .into_iter()
            .filter_map(|(label, value)| {
                value
                    .as_deref()
                    .and_then(non_blank)
                    .map(|note| (label.to_string(), note))
            })
            .collect();
        for (id, note) in &self.characters {
            if let Some(note) = non_blank(note) {
                out.push((format!("Character {id}"), note));
            }
        }
        for (id, note) in &self.plot_points {
            if let Some(note) = non_blank(note) {
                out.push((format!("Plot point {id}"), note));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.notes().is_empty()
    }

    /// Every character and plot point id must exist in `outline`.
    pub fn check_ids(&self, outline: &Outline) -> Result<(), CoreError> {
        if let Some(id) = self
            .characters
            .keys()
            .find(|id| !outline.characters.iter().any(|c| &c.id == *id))
        {
            return Err(CoreError::Validation(format!("Unknown character id {id}")));
        }
        if let Some(id) = self
            .plot_points
            .keys()
            .find(|id| !outline.plot_points.iter().any(|p| &p.id == *id))
        {
            return Err(CoreError::Validation(format!("Unknown plot point id {id}")));
        }
        Ok(())
    }
}
