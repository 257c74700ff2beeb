//! Outline generation.

use std::sync::Arc;

use picturebook_core::observability::Observability;
use picturebook_core::error::CoreError;
use picturebook_core::outline::{Outline, OutlineFeedback};
use picturebook_core::project::{validate_page_count, Project, TargetAge};
use picturebook_core::prompts::{
    outline_refinement_prompt, outline_system_prompt, outline_user_prompt,
};
use picturebook_storage::StorageAdapter;
use picturebook_textgen::{generate_structured, TextGenOptions, TextGenerationAdapter};
use serde_json::json;

use crate::error::PipelineError;
use crate::store::{load_project, update_project};

const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, Default)]
pub struct OutlineRequest {
    pub project_id: String,
    pub topic: String,
    /// Overrides the project's target age when set.
    pub target_age: Option<TargetAge>,
    /// Overrides the project's page count when set.
    pub page_count: Option<u32>,
    pub tone_keywords: Option<Vec<String>>,
    pub additional_instructions: Option<String>,
}

pub struct OutlineService {
    text: Arc<dyn TextGenerationAdapter>,
    storage: Arc<dyn StorageAdapter>,
    observability: Arc<dyn Observability>,
}

impl OutlineService {
    pub fn new(
        text: Arc<dyn TextGenerationAdapter>,
        storage: Arc<dyn StorageAdapter>,
        observability: Arc<dyn Observability>,
    ) -> Self {
        Self {
            text,
            storage,
            observability,
        }
    }

    /// Generate and store an outline. Age and page count given in the
    /// request are written back to the project settings so later stages
    /// agree with the outline.
    pub async fn generate_outline(&self, request: OutlineRequest) -> Result<Project, PipelineError> {
        if let Some(count) = request.page_count {
            validate_page_count(count)?;
        }
        let project = load_project(self.storage.as_ref(), &request.project_id).await?;
        let settings = &project.settings;
        let age = request.target_age.unwrap_or(settings.target_age);
        let page_count = request.page_count.unwrap_or(settings.target_page_count);
        let tone = request
            .tone_keywords
            .clone()
            .unwrap_or_else(|| settings.tone_keywords.clone());

        tracing::info!(
            project_id = %project.id,
            target_age = age.as_str(),
            page_count,
            "Generating outline"
        );
        let options = TextGenOptions {
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            ..Default::default()
        };
        let outline: Outline = generate_structured(
            self.text.as_ref(),
            &outline_system_prompt(age, page_count, &tone),
            &outline_user_prompt(&request.topic, request.additional_instructions.as_deref()),
            &options,
        )
        .await?;

        let characters = outline.characters.len();
        let (project, ()) = update_project(self.storage.as_ref(), &request.project_id, |project| {
            project.settings.target_age = age;
            project.settings.target_page_count = page_count;
            project.settings.tone_keywords = tone;
            project.set_outline(outline);
            Ok(())
        })
        .await?;

        self.observability.record_event(
            "outline.generated",
            json!({ "projectId": project.id, "characters": characters }),
        );
        Ok(project)
    }

    /// Revise the stored outline according to `feedback`. The revision
    /// replaces the outline; project settings are left alone.
    pub async fn refine_outline(
        &self,
        project_id: &str,
        feedback: &OutlineFeedback,
    ) -> Result<Project, PipelineError> {
        if feedback.is_empty() {
            return Err(CoreError::Validation("At least one feedback entry is required".into()).into());
        }
        let project = load_project(self.storage.as_ref(), project_id).await?;
        let current = project
            .outline
            .as_ref()
            .ok_or_else(|| CoreError::prerequisite("refine outline", "outline"))?;
        feedback.check_ids(current)?;
        let current = serde_json::to_string_pretty(current)
            .map_err(|e| CoreError::Internal(format!("Failed to encode outline: {e}")))?;

        let settings = &project.settings;
        let notes = feedback.notes().len();
        tracing::info!(project_id = %project.id, notes, "Refining outline");
        let options = TextGenOptions {
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            ..Default::default()
        };
        let outline: Outline = generate_structured(
            self.text.as_ref(),
            &outline_system_prompt(
                settings.target_age,
                settings.target_page_count,
                &settings.tone_keywords,
            ),
            &outline_refinement_prompt(&current, feedback),
            &options,
        )
        .await?;

        let (project, ()) = update_project(self.storage.as_ref(), project_id, |project| {
            project.set_outline(outline);
            Ok(())
        })
        .await?;

        self.observability.record_event(
            "outline.refined",
            json!({ "projectId": project.id, "notes": notes }),
        );
        Ok(project)
    }
}
