mod common;

use assert_matches::assert_matches;
use common::Harness;
use picturebook_core::error::CoreError;
use picturebook_core::illustration::{IllustrationTarget, ImageType, ReferenceKind};
use picturebook_core::project::{Project, ProjectSettings, Stage};
use picturebook_events::ChannelSink;
use picturebook_imagegen::mock::CallKind;
use picturebook_imagegen::MockImageAdapter;
use picturebook_pipeline::PipelineError;
use picturebook_storage::StorageAdapter;

fn labels(call: &picturebook_imagegen::mock::RecordedCall) -> Vec<&str> {
    call.references.iter().map(|r| r.label.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Ordering and progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_complete_events_follow_cover_pages_back_cover_order() {
    let h = Harness::new();
    let project = h.seed(4).await;
    let sink = common::RecordingSink::default();

    h.orchestrator
        .generate_all_pages(&project.id, None, &sink)
        .await
        .unwrap();

    assert_eq!(
        sink.completed(),
        vec![
            (IllustrationTarget::Cover, ImageType::Cover),
            (IllustrationTarget::Page(1), ImageType::Page),
            (IllustrationTarget::Page(2), ImageType::Page),
            (IllustrationTarget::Page(3), ImageType::Page),
            (IllustrationTarget::Page(4), ImageType::Page),
            (IllustrationTarget::BackCover, ImageType::BackCover),
        ]
    );
}

#[tokio::test]
async fn three_page_book_end_to_end() {
    let h = Harness::new();
    let project = h.seed(3).await;
    let sink = common::RecordingSink::default();

    let pages = h
        .orchestrator
        .generate_all_pages(&project.id, None, &sink)
        .await
        .unwrap();

    let slots: Vec<_> = pages.iter().map(|p| p.slot).collect();
    assert_eq!(
        slots,
        vec![
            IllustrationTarget::Page(1),
            IllustrationTarget::Page(2),
            IllustrationTarget::Page(3)
        ]
    );

    let stored = h.reload(&project.id).await;
    assert!(stored.cover_image.is_some());
    assert!(stored.back_cover_image.is_some());
    let numbers: Vec<_> = stored.page_images.iter().map(|p| p.slot.page_number()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(stored.current_stage, Stage::Illustrations);

    assert_eq!(sink.completed().len(), 5);
    assert_eq!(sink.progress(), vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);

    let names = h.observability.names();
    assert_eq!(names.first().map(String::as_str), Some("illustration.batch_started"));
    assert_eq!(names.last().map(String::as_str), Some("illustration.batch_completed"));
    assert_eq!(names.iter().filter(|n| *n == "illustration.generated").count(), 5);
}

#[tokio::test]
async fn batch_runs_in_one_session_with_increasing_message_index() {
    let h = Harness::new();
    let project = h.seed(2).await;

    let pages = h
        .orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap();

    let calls = h.images.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.kind == CallKind::Session));
    let indices: Vec<_> = calls.iter().map(|c| c.message_index).collect();
    assert_eq!(indices, vec![Some(1), Some(2), Some(3), Some(4)]);

    let opened = h.images.opened_sessions();
    assert_eq!(opened.len(), 1);
    assert_eq!(h.images.closed_sessions(), opened);

    let metadata = pages[1].generation_metadata.as_ref().unwrap();
    assert_eq!(metadata.session_id, opened[0]);
    assert_eq!(metadata.message_index, Some(3));
    assert_eq!(metadata.prompt, pages[1].prompt);
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pages_reference_cover_and_two_previous_pages_at_most() {
    let h = Harness::new();
    let project = h.seed(5).await;

    h.orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap();

    let calls = h.images.calls();
    assert_eq!(calls.len(), 7);
    assert!(labels(&calls[0]).is_empty(), "cover has no references");
    assert_eq!(labels(&calls[1]), vec!["Front cover"]);
    assert_eq!(labels(&calls[2]), vec!["Front cover", "Page 1"]);
    assert_eq!(labels(&calls[3]), vec!["Front cover", "Page 1", "Page 2"]);
    assert_eq!(labels(&calls[4]), vec!["Front cover", "Page 2", "Page 3"]);
    assert_eq!(labels(&calls[5]), vec!["Front cover", "Page 3", "Page 4"]);
    assert!(labels(&calls[6]).is_empty(), "back cover has no references");
    assert!(calls.iter().all(|c| c.references.len() <= 3));

    let page5 = &calls[5];
    assert_eq!(page5.references[0].kind, ReferenceKind::Style);
    assert_eq!(page5.references[1].kind, ReferenceKind::PreviousPage);
    assert!(page5.prompt.contains("REFERENCE IMAGES PROVIDED"));
    assert!(page5.prompt.contains("line weight"));
    assert!(!calls[0].prompt.contains("REFERENCE IMAGES PROVIDED"));
}

#[tokio::test]
async fn missing_cover_file_does_not_fail_first_page() {
    let h = Harness::new();
    let project = h.seed(1).await;
    h.storage.hide(IllustrationTarget::Cover);

    let pages = h
        .orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap();

    assert_eq!(pages.len(), 1);
    let page1 = &h.images.calls()[1];
    assert!(page1.references.len() <= 1);
    assert!(labels(page1).iter().all(|l| *l != "Front cover"));
    assert!(h
        .observability
        .names()
        .contains(&"illustration.reference_missing".to_string()));
}

#[tokio::test]
async fn reference_metadata_is_stored_without_image_data() {
    let h = Harness::new();
    let project = h.seed(2).await;

    h.orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap();

    let stored = h.reload(&project.id).await;
    let page2 = stored.illustration(IllustrationTarget::Page(2)).unwrap();
    let refs = &page2.generation_metadata.as_ref().unwrap().reference_images;
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[1].label, "Page 1");
    assert_eq!(
        refs[1].source_path.as_deref(),
        Some(stored.page_images[0].image_path.as_str())
    );

    let json = serde_json::to_value(page2).unwrap();
    assert_eq!(json["pageNumber"], 2);
    assert!(json["generationMetadata"]["referenceImages"][0].get("data").is_none());
}

// ---------------------------------------------------------------------------
// Text and prompts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn baked_text_follows_the_composition_mode() {
    let h = Harness::new();
    let project = h.seed(1).await;

    h.orchestrator
        .generate_all_pages(&project.id, Some("starry night sky"), &common::RecordingSink::default())
        .await
        .unwrap();

    let stored = h.reload(&project.id).await;
    let cover = stored.cover_image.as_ref().unwrap();
    assert!(cover.has_text_baked);
    assert_eq!(cover.baked_text.as_deref(), Some("Pip and the Lantern"));

    let page = &stored.page_images[0];
    assert_eq!(page.baked_text.as_deref(), Some("Text of page 1."));
    assert!(page.prompt.contains("Additional instructions: starry night sky"));

    let back = stored.back_cover_image.as_ref().unwrap();
    assert_eq!(back.baked_text.as_deref(), Some("Every forest needs a little light."));
}

#[tokio::test]
async fn nothing_is_baked_when_text_is_composed_elsewhere() {
    let h = Harness::new();
    let mut project = Project::new(
        "Pip",
        "a fox",
        ProjectSettings {
            text_composition_mode: picturebook_core::project::TextCompositionMode::AiOverlay,
            ..ProjectSettings::default()
        },
    );
    project.set_outline(common::outline());
    project.set_manuscript(common::manuscript(1)).unwrap();
    h.storage.create_project(&project).await.unwrap();

    h.orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap();

    let stored = h.reload(&project.id).await;
    assert!(!stored.page_images[0].has_text_baked);
    assert!(stored.page_images[0].baked_text.is_none());
    assert!(!stored.cover_image.unwrap().has_text_baked);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provider_failure_keeps_earlier_steps() {
    // Calls: 1 cover, 2 page 1, 3 page 2, 4 page 3.
    let h = Harness::with_images(MockImageAdapter::new().failing_on_call(4));
    let project = h.seed(5).await;
    let sink = common::RecordingSink::default();

    let err = h
        .orchestrator
        .generate_all_pages(&project.id, None, &sink)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::ImageGen(_));

    let stored = h.reload(&project.id).await;
    assert!(stored.cover_image.is_some());
    let numbers: Vec<_> = stored.page_images.iter().map(|p| p.slot.page_number()).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert!(stored.back_cover_image.is_none());

    assert_eq!(sink.completed().len(), 3);
    assert_eq!(h.images.calls().len(), 4);
    assert_eq!(h.images.closed_sessions(), h.images.opened_sessions());
    assert!(h
        .observability
        .names()
        .contains(&"illustration.batch_failed".to_string()));
}

#[tokio::test]
async fn missing_manuscript_fails_before_any_provider_call() {
    let h = Harness::new();
    let mut project = Project::new("Pip", "a fox", ProjectSettings::default());
    project.set_outline(common::outline());
    h.storage.create_project(&project).await.unwrap();

    let err = h
        .orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        PipelineError::Core(CoreError::Prerequisite { ref artifact, .. }) if artifact == "manuscript"
    );
    assert!(h.images.calls().is_empty());
    assert!(h.images.opened_sessions().is_empty());
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let h = Harness::new();
    let err = h
        .orchestrator
        .generate_all_pages("no-such-project", None, &common::RecordingSink::default())
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::NotFound { entity: "Project", .. }));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_batch_for_same_project_conflicts_while_first_is_reserved() {
    let h = Harness::new();
    let project = h.seed(1).await;

    let permit = h.orchestrator.reserve_batch(&project.id).unwrap();
    let err = h
        .orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Conflict(_)));

    h.orchestrator
        .generate_reserved(permit, None, &common::RecordingSink::default())
        .await
        .unwrap();
    h.orchestrator
        .generate_all_pages(&project.id, None, &common::RecordingSink::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn batches_for_different_projects_run_concurrently() {
    let h = Harness::new();
    let a = h.seed(2).await;
    let b = h.seed(2).await;
    let (sink_a, sink_b) = (common::RecordingSink::default(), common::RecordingSink::default());

    let (ra, rb) = tokio::join!(
        h.orchestrator.generate_all_pages(&a.id, None, &sink_a),
        h.orchestrator.generate_all_pages(&b.id, None, &sink_b),
    );
    assert_eq!(ra.unwrap().len(), 2);
    assert_eq!(rb.unwrap().len(), 2);
    assert_eq!(h.images.opened_sessions().len(), 2);
}

#[tokio::test]
async fn departed_consumer_does_not_cancel_the_batch() {
    let h = Harness::new();
    let project = h.seed(3).await;
    let (sink, rx) = ChannelSink::channel();
    drop(rx);

    let pages = h
        .orchestrator
        .generate_all_pages(&project.id, None, &sink)
        .await
        .unwrap();

    assert_eq!(pages.len(), 3);
    assert_eq!(h.images.calls().len(), 5);
    let stored = h.reload(&project.id).await;
    assert!(stored.back_cover_image.is_some());
}
