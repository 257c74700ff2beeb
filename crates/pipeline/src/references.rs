//! Reference-image policy.
//!
//! Which stored artifacts accompany each generation call:
//!
//! | Step               | References                                          |
//! |--------------------|-----------------------------------------------------|
//! | front cover        | none                                                |
//! | content page       | front cover + the two latest pages of this run      |
//! | back cover         | none (the session carries the context)              |
//! | refinement of slot | the current image stored in that slot               |
//!
//! References are loaded from storage right before each call. A reference
//! that fails to load is logged and left out; it never fails the step.

use std::collections::VecDeque;

use picturebook_core::illustration::{
    IllustrationTarget, ImageCategory, ReferenceImage, ReferenceKind,
};
use picturebook_core::observability::Observability;
use picturebook_storage::StorageAdapter;
use serde_json::json;

/// Previous content pages kept in the sliding window.
pub const MAX_PREVIOUS_PAGES: usize = 2;

/// Upper bound on references per generation call (cover + window).
pub const MAX_REFERENCES: usize = 1 + MAX_PREVIOUS_PAGES;

pub const COVER_LABEL: &str = "Front cover";
pub const ORIGINAL_LABEL: &str = "Original image";

/// A reference to load: what it is and where it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReference {
    pub kind: ReferenceKind,
    pub label: String,
    pub category: ImageCategory,
    pub image_id: String,
}

impl PlannedReference {
    fn for_slot(kind: ReferenceKind, label: impl Into<String>, target: IllustrationTarget) -> Self {
        let (category, image_id) = target.storage_key();
        Self {
            kind,
            label: label.into(),
            category,
            image_id,
        }
    }
}

/// Content pages generated successfully in the current run, newest last.
#[derive(Debug, Clone, Default)]
pub struct ReferenceWindow {
    pages: VecDeque<u32>,
}

impl ReferenceWindow {
    pub fn push(&mut self, page_number: u32) {
        self.pages.push_back(page_number);
        while self.pages.len() > MAX_PREVIOUS_PAGES {
            self.pages.pop_front();
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }
}

/// References for a batch step.
pub fn plan_references(target: IllustrationTarget, window: &ReferenceWindow) -> Vec<PlannedReference> {
    match target {
        IllustrationTarget::Cover | IllustrationTarget::BackCover => Vec::new(),
        IllustrationTarget::Page(_) => {
            let mut plan = vec![PlannedReference::for_slot(
                ReferenceKind::Style,
                COVER_LABEL,
                IllustrationTarget::Cover,
            )];
            plan.extend(window.pages().map(|n| {
                PlannedReference::for_slot(
                    ReferenceKind::PreviousPage,
                    format!("Page {n}"),
                    IllustrationTarget::Page(n),
                )
            }));
            plan
        }
    }
}

/// The single reference used when refining `target`: its own current image.
pub fn plan_refinement_reference(target: IllustrationTarget) -> PlannedReference {
    PlannedReference::for_slot(ReferenceKind::Style, ORIGINAL_LABEL, target)
}

/// Load planned references from storage, skipping any that fail.
pub async fn load_references(
    storage: &dyn StorageAdapter,
    observability: &dyn Observability,
    project_id: &str,
    plan: &[PlannedReference],
) -> Vec<ReferenceImage> {
    let mut loaded = Vec::with_capacity(plan.len());
    for planned in plan.iter().take(MAX_REFERENCES) {
        match storage
            .load_image(project_id, planned.category, &planned.image_id)
            .await
        {
            Ok(data) => loaded.push(ReferenceImage {
                kind: planned.kind,
                label: planned.label.clone(),
                data,
                mime_type: "image/png".to_string(),
                source_path: storage
                    .image_path(project_id, planned.category, &planned.image_id)
                    .ok(),
            }),
            Err(e) => {
                tracing::warn!(
                    project_id = %project_id,
                    label = %planned.label,
                    image_id = %planned.image_id,
                    error = %e,
                    "Reference image unavailable, continuing without it"
                );
                observability.record_event(
                    "illustration.reference_missing",
                    json!({
                        "projectId": project_id,
                        "label": planned.label,
                        "category": planned.category.as_str(),
                        "imageId": planned.image_id,
                    }),
                );
            }
        }
    }
    loaded
}
