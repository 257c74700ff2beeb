//! Manuscript generation.

use std::sync::Arc;

use picturebook_core::error::CoreError;
use picturebook_core::manuscript::{Manuscript, ManuscriptFeedback};
use picturebook_core::observability::Observability;
use picturebook_core::project::Project;
use picturebook_core::prompts::{
    manuscript_refinement_prompt, manuscript_system_prompt, manuscript_user_prompt, TextStyle,
};
use picturebook_storage::StorageAdapter;
use picturebook_textgen::{generate_structured, TextGenOptions, TextGenerationAdapter};
use serde_json::json;

use crate::error::PipelineError;
use crate::store::{load_project, update_project};

const MAX_TOKENS: u32 = 8192;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct ManuscriptRequest {
    pub project_id: String,
    /// Defaults to the target age's word budget.
    pub words_per_page: Option<u32>,
    pub text_style: Option<TextStyle>,
    pub additional_guidance: Option<String>,
}

pub struct ManuscriptService {
    text: Arc<dyn TextGenerationAdapter>,
    storage: Arc<dyn StorageAdapter>,
    observability: Arc<dyn Observability>,
}

impl ManuscriptService {
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

    /// Write page text and illustration notes for every page of the
    /// outline's story. The response must contain pages `1..=N` exactly,
    /// where `N` is the project's target page count.
    pub async fn generate_manuscript(&self, request: ManuscriptRequest) -> Result<Project, PipelineError> {
        let project = load_project(self.storage.as_ref(), &request.project_id).await?;
        let outline = project
            .outline
            .as_ref()
            .ok_or_else(|| CoreError::prerequisite("generate manuscript", "outline"))?;
        let settings = &project.settings;
        let words_per_page = request
            .words_per_page
            .unwrap_or_else(|| settings.target_age.default_words_per_page());
        if words_per_page == 0 {
            return Err(CoreError::Validation("Words per page must be positive".into()).into());
        }
        let page_count = settings.target_page_count;

        tracing::info!(project_id = %project.id, page_count, words_per_page, "Generating manuscript");
        let options = TextGenOptions {
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            ..Default::default()
        };
        let manuscript: Manuscript = generate_structured(
            self.text.as_ref(),
            &manuscript_system_prompt(
                settings.target_age,
                page_count,
                words_per_page,
                request.text_style.unwrap_or_default(),
            ),
            &manuscript_user_prompt(outline, request.additional_guidance.as_deref()),
            &options,
        )
        .await?;
        manuscript.validate(page_count)?;

        let (project, ()) = update_project(self.storage.as_ref(), &request.project_id, |project| {
            project.set_manuscript(manuscript)
        })
        .await?;

        self.observability.record_event(
            "manuscript.generated",
            json!({ "projectId": project.id, "pages": page_count }),
        );
        Ok(project)
    }

    /// Revise the stored manuscript according to `feedback`. The revision
    /// must still cover pages `1..=N` exactly.
    pub async fn refine_manuscript(
        &self,
        project_id: &str,
        feedback: &ManuscriptFeedback,
    ) -> Result<Project, PipelineError> {
        if feedback.is_empty() {
            return Err(CoreError::Validation("At least one feedback entry is required".into()).into());
        }
        let project = load_project(self.storage.as_ref(), project_id).await?;
        let (outline, current) = project.story("refine manuscript")?;
        let settings = &project.settings;
        let page_count = settings.target_page_count;
        feedback.check_pages(page_count)?;
        let current = serde_json::to_string_pretty(current)
            .map_err(|e| CoreError::Internal(format!("Failed to encode manuscript: {e}")))?;

        tracing::info!(
            project_id = %project.id,
            pages = feedback.page_notes().len(),
            "Refining manuscript"
        );
        let options = TextGenOptions {
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            ..Default::default()
        };
        let manuscript: Manuscript = generate_structured(
            self.text.as_ref(),
            &manuscript_system_prompt(
                settings.target_age,
                page_count,
                settings.target_age.default_words_per_page(),
                TextStyle::default(),
            ),
            &manuscript_refinement_prompt(outline, &current, feedback),
            &options,
        )
        .await?;
        manuscript.validate(page_count)?;

        let (project, ()) = update_project(self.storage.as_ref(), project_id, |project| {
            project.set_manuscript(manuscript)
        })
        .await?;

        self.observability.record_event(
            "manuscript.refined",
            json!({ "projectId": project.id, "pages": page_count }),
        );
        Ok(project)
    }
}
