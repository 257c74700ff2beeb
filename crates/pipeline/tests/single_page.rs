mod common;

use assert_matches::assert_matches;
use common::Harness;
use picturebook_core::error::CoreError;
use picturebook_core::illustration::IllustrationTarget;
use picturebook_core::project::{AspectRatio, Project, ProjectSettings, Stage};
use picturebook_imagegen::mock::CallKind;
use picturebook_imagegen::{ImageGenError, MockImageAdapter};
use picturebook_pipeline::PipelineError;
use picturebook_storage::StorageAdapter;

#[tokio::test]
async fn generating_a_page_twice_keeps_one_entry() {
    let h = Harness::new();
    let project = h.seed(3).await;

    let first = h.orchestrator.generate_page(&project.id, 2, None).await.unwrap();
    let second = h
        .orchestrator
        .generate_page(&project.id, 2, Some("more fireflies"))
        .await
        .unwrap();

    assert_eq!(first.image_path, second.image_path);
    let stored = h.reload(&project.id).await;
    let entries: Vec<_> = stored
        .page_images
        .iter()
        .filter(|p| p.slot == IllustrationTarget::Page(2))
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].prompt.contains("more fireflies"));
    assert_eq!(stored.current_stage, Stage::Illustrations);
}

#[tokio::test]
async fn single_page_is_generated_without_session_or_references() {
    let h = Harness::new();
    let project = h.seed(2).await;

    let image = h.orchestrator.generate_page(&project.id, 1, None).await.unwrap();

    let calls = h.images.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Standalone);
    assert!(calls[0].references.is_empty());
    assert!(h.images.opened_sessions().is_empty());
    assert!(image.generation_metadata.is_none());
    assert_eq!(image.baked_text.as_deref(), Some("Text of page 1."));
}

#[tokio::test]
async fn pages_are_kept_sorted_when_generated_out_of_order() {
    let h = Harness::new();
    let project = h.seed(3).await;

    for n in [3, 1, 2] {
        h.orchestrator.generate_page(&project.id, n, None).await.unwrap();
    }

    let stored = h.reload(&project.id).await;
    let numbers: Vec<_> = stored.page_images.iter().map(|p| p.slot.page_number()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn unknown_page_number_is_not_found() {
    let h = Harness::new();
    let project = h.seed(2).await;

    let err = h.orchestrator.generate_page(&project.id, 9, None).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::NotFound { .. }));
    assert!(h.images.calls().is_empty());
}

#[tokio::test]
async fn page_without_outline_is_a_prerequisite_error() {
    let h = Harness::new();
    let project = Project::new("Pip", "a fox", ProjectSettings::default());
    h.storage.create_project(&project).await.unwrap();

    let err = h.orchestrator.generate_page(&project.id, 1, None).await.unwrap_err();
    assert_matches!(
        err,
        PipelineError::Core(CoreError::Prerequisite { ref artifact, .. }) if artifact == "outline"
    );
}

#[tokio::test]
async fn unsupported_aspect_ratio_fails_before_generating() {
    let h = Harness::with_images(
        MockImageAdapter::new().with_aspect_ratios(vec![AspectRatio::Square]),
    );
    let project = h.seed(2).await;
    assert_ne!(project.settings.aspect_ratio, AspectRatio::Square);

    let err = h.orchestrator.generate_page(&project.id, 1, None).await.unwrap_err();

    assert_matches!(
        err,
        PipelineError::ImageGen(ImageGenError::UnsupportedAspectRatio(_))
    );
    assert!(h.images.calls().is_empty());
    assert!(h.reload(&project.id).await.page_images.is_empty());
}
