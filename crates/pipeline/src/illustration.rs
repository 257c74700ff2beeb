//! Illustration orchestrator.
//!
//! A batch run generates the front cover, every content page in ascending
//! order and finally the back cover, one call at a time, inside a single
//! generation session. Each step is persisted before the next one starts,
//! so a failed run leaves every earlier step stored and a re-run simply
//! overwrites slots by key.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use picturebook_core::error::CoreError;
use picturebook_core::illustration::{
    GenerationMetadata, IllustrationFeedback, IllustrationTarget, ImageType, PageImage,
    ReferenceImage, RefinementResult,
};
use picturebook_core::observability::Observability;
use picturebook_core::project::Project;
use picturebook_core::prompts::{
    back_cover_prompt, cover_prompt, page_prompt, reference_instructions, refinement_prompt,
    CoverContext, PageContext, RefinementContext,
};
use picturebook_events::ProgressSink;
use picturebook_imagegen::{GenerationSession, ImageGenOptions, ImageGenerationAdapter};
use picturebook_storage::StorageAdapter;
use serde_json::json;

use crate::error::PipelineError;
use crate::guard::{BatchGuard, BatchPermit};
use crate::references::{
    load_references, plan_references, plan_refinement_reference, PlannedReference, ReferenceWindow,
};
use crate::store::{load_project, update_project};

const BATCH_ACTION: &str = "generate illustrations";
const PAGE_ACTION: &str = "generate page";
const REFINE_ACTION: &str = "refine illustration";

/// One image about to be generated and stored.
struct Draft {
    target: IllustrationTarget,
    prompt: String,
    references: Vec<ReferenceImage>,
    baked_text: Option<String>,
    has_text_baked: bool,
    image_type: ImageType,
}

impl Draft {
    fn new(target: IllustrationTarget, prompt: String, baked_text: Option<String>) -> Self {
        Self {
            target,
            prompt,
            references: Vec::new(),
            has_text_baked: baked_text.is_some(),
            baked_text,
            image_type: target.into(),
        }
    }

    fn with_references(mut self, references: Vec<ReferenceImage>) -> Self {
        let infos: Vec<_> = references.iter().map(ReferenceImage::info).collect();
        let instructions = reference_instructions(&infos);
        if !instructions.is_empty() {
            self.prompt.push_str("\n\n");
            self.prompt.push_str(&instructions);
        }
        self.references = references;
        self
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn step_count(project: &Project) -> Result<u32, CoreError> {
    let pages = project.manuscript.as_ref().map_or(0, |m| m.pages.len());
    u32::try_from(pages + 2)
        .map_err(|_| CoreError::Internal(format!("Too many manuscript pages: {pages}")))
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct IllustrationOrchestrator {
    images: Arc<dyn ImageGenerationAdapter>,
    storage: Arc<dyn StorageAdapter>,
    observability: Arc<dyn Observability>,
    batches: BatchGuard,
}

impl IllustrationOrchestrator {
    pub fn new(
        images: Arc<dyn ImageGenerationAdapter>,
        storage: Arc<dyn StorageAdapter>,
        observability: Arc<dyn Observability>,
    ) -> Self {
        Self {
            images,
            storage,
            observability,
            batches: BatchGuard::new(),
        }
    }

    /// Reserve the batch slot for `project_id` ahead of a
    /// [`generate_reserved`](Self::generate_reserved) call, so the caller
    /// can report a conflict before it starts streaming.
    pub fn reserve_batch(&self, project_id: &str) -> Result<BatchPermit, PipelineError> {
        Ok(self.batches.try_acquire(project_id)?)
    }

    pub fn is_batch_running(&self, project_id: &str) -> bool {
        self.batches.is_active(project_id)
    }

    /// Generate cover, all content pages and back cover for a project.
    ///
    /// Returns the content-page illustrations in page order. Fails with
    /// [`CoreError::Conflict`] when a batch for the project is already
    /// running.
    pub async fn generate_all_pages(
        &self,
        project_id: &str,
        additional_prompt: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<PageImage>, PipelineError> {
        let permit = self.reserve_batch(project_id)?;
        self.generate_reserved(permit, additional_prompt, sink).await
    }

    /// Run a batch under an already acquired permit. The permit is
    /// released when the run ends, successfully or not.
    ///
    /// Progress is pushed into `sink` without checking whether anyone is
    /// still listening; a departed consumer does not stop the run.
    pub async fn generate_reserved(
        &self,
        permit: BatchPermit,
        additional_prompt: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<PageImage>, PipelineError> {
        let project_id = permit.project_id().to_string();
        let project = load_project(self.storage.as_ref(), &project_id).await?;
        project.story(BATCH_ACTION)?;
        let total = step_count(&project)?;

        tracing::info!(project_id = %project_id, total_steps = total, "Starting illustration batch");
        self.observability.record_event(
            "illustration.batch_started",
            json!({ "projectId": project_id, "totalSteps": total }),
        );

        let started = Instant::now();
        let mut session = self.images.create_session(&project_id).await;
        let result = self
            .run_batch(&project, &mut session, additional_prompt, sink, total)
            .await;
        let session_id = session.id().to_string();
        self.images.close_session(session).await;

        match &result {
            Ok(pages) => {
                tracing::info!(
                    project_id = %project_id,
                    session_id = %session_id,
                    pages = pages.len(),
                    duration_ms = elapsed_ms(started),
                    "Illustration batch completed"
                );
                self.observability.record_event(
                    "illustration.batch_completed",
                    json!({
                        "projectId": project_id,
                        "sessionId": session_id,
                        "pages": pages.len(),
                        "durationMs": elapsed_ms(started),
                    }),
                );
            }
            Err(e) => {
                tracing::error!(
                    project_id = %project_id,
                    session_id = %session_id,
                    error = %e,
                    "Illustration batch failed"
                );
                self.observability.record_event(
                    "illustration.batch_failed",
                    json!({
                        "projectId": project_id,
                        "sessionId": session_id,
                        "error": e.to_string(),
                    }),
                );
            }
        }

        drop(permit);
        result
    }

    async fn run_batch(
        &self,
        project: &Project,
        session: &mut GenerationSession,
        additional_prompt: Option<&str>,
        sink: &dyn ProgressSink,
        total: u32,
    ) -> Result<Vec<PageImage>, PipelineError> {
        let (outline, manuscript) = project.story(BATCH_ACTION)?;
        let settings = &project.settings;
        let bakes = settings.bakes_text();
        let covers = CoverContext { outline, settings };
        let mut step = 0;

        step += 1;
        sink.progress(step, total, "Generating cover...");
        let cover = Draft::new(
            IllustrationTarget::Cover,
            cover_prompt(covers),
            bakes.then(|| outline.title.clone()),
        );
        let cover = self.generate_in_session(project, session, cover, "illustration.generated").await?;
        sink.image_complete(&cover, ImageType::Cover);

        let mut window = ReferenceWindow::default();
        let mut pages = Vec::with_capacity(manuscript.pages.len());
        for page in manuscript.sorted_pages() {
            step += 1;
            sink.progress(
                step,
                total,
                &format!("Generating page {} of {}...", page.page_number, manuscript.pages.len()),
            );

            let target = IllustrationTarget::Page(page.page_number);
            let references = self
                .load_references(&project.id, &plan_references(target, &window))
                .await;
            let prompt = page_prompt(PageContext {
                page,
                outline,
                settings,
                additional_prompt,
            });
            let baked = if bakes { page.visible_text().map(str::to_string) } else { None };
            let draft = Draft::new(target, prompt, baked).with_references(references);

            let image = self.generate_in_session(project, session, draft, "illustration.generated").await?;
            window.push(page.page_number);
            sink.image_complete(&image, ImageType::Page);
            pages.push(image);
        }

        step += 1;
        sink.progress(step, total, "Generating back cover...");
        let blurb = Some(outline.back_cover_blurb.trim()).filter(|b| !b.is_empty());
        let back = Draft::new(
            IllustrationTarget::BackCover,
            back_cover_prompt(covers),
            blurb.filter(|_| bakes).map(str::to_string),
        );
        let back = self.generate_in_session(project, session, back, "illustration.generated").await?;
        sink.image_complete(&back, ImageType::BackCover);

        Ok(pages)
    }

    /// Generate one draft in `session`, store the image under its slot's
    /// key and splice it into the project document.
    async fn generate_in_session(
        &self,
        project: &Project,
        session: &mut GenerationSession,
        draft: Draft,
        event: &str,
    ) -> Result<PageImage, PipelineError> {
        let options =
            ImageGenOptions::for_adapter(self.images.as_ref(), project.settings.aspect_ratio)?;
        let started = Instant::now();
        let generated = self
            .images
            .generate_with_references(session, &draft.prompt, &draft.references, &options)
            .await?;
        let generation_time_ms = elapsed_ms(started);

        let (category, image_id) = draft.target.storage_key();
        let image_path = self
            .storage
            .save_image(&project.id, category, &image_id, &generated.data)
            .await?;

        let generated_at = Utc::now();
        let metadata = GenerationMetadata {
            session_id: session.id().to_string(),
            prompt: draft.prompt.clone(),
            reference_images: draft.references.iter().map(ReferenceImage::info).collect(),
            model_used: generated.metadata.model.clone(),
            generated_at,
            generation_time_ms,
            aspect_ratio: options.aspect_ratio,
            message_index: Some(session.message_index()),
        };
        let image = PageImage {
            slot: draft.target,
            image_path,
            has_text_baked: draft.has_text_baked,
            baked_text: draft.baked_text,
            prompt: draft.prompt,
            generated_at,
            model_used: generated.metadata.model,
            aspect_ratio: options.aspect_ratio,
            image_type: Some(draft.image_type),
            generation_metadata: Some(metadata),
        };

        self.store_illustration(&project.id, &image).await?;
        self.record_image(event, &project.id, &image, generation_time_ms, draft.references.len());
        Ok(image)
    }

    async fn store_illustration(&self, project_id: &str, image: &PageImage) -> Result<(), PipelineError> {
        update_project(self.storage.as_ref(), project_id, |project| {
            project.put_illustration(image.clone());
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn load_references(&self, project_id: &str, plan: &[PlannedReference]) -> Vec<ReferenceImage> {
        load_references(self.storage.as_ref(), self.observability.as_ref(), project_id, plan).await
    }

    fn record_image(&self, event: &str, project_id: &str, image: &PageImage, time_ms: u64, references: usize) {
        tracing::info!(
            project_id = %project_id,
            target = %image.slot,
            generation_time_ms = time_ms,
            references,
            "Illustration stored"
        );
        self.observability.record_event(
            event,
            json!({
                "projectId": project_id,
                "imageType": image.image_type.map(ImageType::as_str),
                "pageNumber": image.slot.page_number(),
                "generationTimeMs": time_ms,
                "referenceCount": references,
            }),
        );
    }

    // -----------------------------------------------------------------------
    // Single page
    // -----------------------------------------------------------------------

    /// Generate one content page outside any session, without references.
    /// Replaces whatever is stored for that page.
    pub async fn generate_page(
        &self,
        project_id: &str,
        page_number: u32,
        additional_prompt: Option<&str>,
    ) -> Result<PageImage, PipelineError> {
        let project = load_project(self.storage.as_ref(), project_id).await?;
        let (outline, manuscript) = project.story(PAGE_ACTION)?;
        let page = manuscript.page(page_number).ok_or_else(|| CoreError::NotFound {
            entity: "Manuscript page",
            id: page_number.to_string(),
        })?;
        let settings = &project.settings;

        let prompt = page_prompt(PageContext {
            page,
            outline,
            settings,
            additional_prompt,
        });
        let baked_text = if settings.bakes_text() {
            page.visible_text().map(str::to_string)
        } else {
            None
        };
        let options = ImageGenOptions::for_adapter(self.images.as_ref(), settings.aspect_ratio)?;

        let started = Instant::now();
        let generated = self.images.generate_image(&prompt, &options).await?;
        let generation_time_ms = elapsed_ms(started);

        let target = IllustrationTarget::Page(page_number);
        let (category, image_id) = target.storage_key();
        let image_path = self
            .storage
            .save_image(project_id, category, &image_id, &generated.data)
            .await?;

        let image = PageImage {
            slot: target,
            image_path,
            has_text_baked: baked_text.is_some(),
            baked_text,
            prompt,
            generated_at: Utc::now(),
            model_used: generated.metadata.model,
            aspect_ratio: options.aspect_ratio,
            image_type: Some(ImageType::Page),
            generation_metadata: None,
        };
        self.store_illustration(project_id, &image).await?;
        self.record_image("illustration.generated", project_id, &image, generation_time_ms, 0);
        Ok(image)
    }

    // -----------------------------------------------------------------------
    // Refinement
    // -----------------------------------------------------------------------

    /// Regenerate the illustration in `target`'s slot from user feedback,
    /// using the current image as the only reference. The result replaces
    /// the original under the same storage key.
    pub async fn refine_illustration(
        &self,
        project_id: &str,
        target: IllustrationTarget,
        feedback: &str,
    ) -> Result<PageImage, PipelineError> {
        if feedback.trim().is_empty() {
            return Err(CoreError::Validation("Feedback must not be empty".into()).into());
        }

        let project = load_project(self.storage.as_ref(), project_id).await?;
        let outline = project
            .outline
            .as_ref()
            .ok_or_else(|| CoreError::prerequisite(REFINE_ACTION, "outline"))?;
        let original = project
            .illustration(target)
            .ok_or_else(|| CoreError::prerequisite(REFINE_ACTION, format!("original {target} image")))?;

        let (description, page_text) = match target {
            IllustrationTarget::Cover => (outline.cover_description.as_str(), Some(outline.title.as_str())),
            IllustrationTarget::BackCover => (
                outline.back_cover_description.as_str(),
                Some(outline.back_cover_blurb.as_str()),
            ),
            IllustrationTarget::Page(n) => {
                let manuscript = project
                    .manuscript
                    .as_ref()
                    .ok_or_else(|| CoreError::prerequisite(REFINE_ACTION, "manuscript"))?;
                let page = manuscript.page(n).ok_or_else(|| CoreError::NotFound {
                    entity: "Manuscript page",
                    id: n.to_string(),
                })?;
                (page.illustration_description.as_str(), page.visible_text())
            }
        };

        let image_type = original.image_type.unwrap_or_else(|| target.into());
        let prompt = refinement_prompt(RefinementContext {
            image_type,
            original_prompt: &original.prompt,
            illustration_description: description,
            page_text,
            feedback: feedback.trim(),
            outline,
            settings: &project.settings,
        });
        let references = self
            .load_references(project_id, &[plan_refinement_reference(target)])
            .await;
        let draft = Draft {
            target: original.slot,
            prompt,
            references: Vec::new(),
            baked_text: original.baked_text.clone(),
            has_text_baked: original.has_text_baked,
            image_type,
        }
        .with_references(references);

        tracing::info!(project_id = %project_id, target = %target, "Refining illustration");
        let mut session = self.images.create_session(project_id).await;
        let result = self
            .generate_in_session(&project, &mut session, draft, "illustration.refined")
            .await;
        self.images.close_session(session).await;
        result
    }

    /// Refine every target named in `feedback`: cover, then pages in
    /// ascending order, then back cover. Each refinement is independent;
    /// the first failure stops the loop and earlier refinements stay.
    pub async fn refine_all_illustrations(
        &self,
        project_id: &str,
        feedback: &IllustrationFeedback,
    ) -> Result<RefinementResult, PipelineError> {
        let mut result = RefinementResult::default();
        for (target, text) in feedback.targets() {
            let image = self.refine_illustration(project_id, target, text).await?;
            match target {
                IllustrationTarget::Cover => result.cover = Some(image),
                IllustrationTarget::BackCover => result.back_cover = Some(image),
                IllustrationTarget::Page(_) => result.pages.push(image),
            }
        }
        Ok(result)
    }
}
