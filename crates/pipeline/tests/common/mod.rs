//! Shared fixtures for pipeline integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use picturebook_core::illustration::{IllustrationTarget, ImageCategory, ImageType, PageImage};
use picturebook_core::manuscript::{Manuscript, ManuscriptPage, PageSpread, TextPlacement};
use picturebook_core::observability::Observability;
use picturebook_core::outline::{Character, CharacterRole, Outline, PlotPoint, Setting};
use picturebook_core::project::{Project, ProjectSettings, ProjectSummary};
use picturebook_events::ProgressSink;
use picturebook_imagegen::MockImageAdapter;
use picturebook_pipeline::IllustrationOrchestrator;
use picturebook_storage::{FilesystemStorage, StorageAdapter, StorageError};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Story fixtures
// ---------------------------------------------------------------------------

pub fn outline() -> Outline {
    Outline {
        title: "Pip and the Lantern".into(),
        subtitle: None,
        synopsis: "A small fox carries a lantern through the forest.".into(),
        theme: "Courage".into(),
        characters: vec![Character {
            id: "char-1".into(),
            name: "Pip".into(),
            role: CharacterRole::Protagonist,
            description: "A brave little fox".into(),
            physical_description: "Small orange fox with a white-tipped tail and a green scarf".into(),
            age: Some("young".into()),
        }],
        setting: Setting {
            location: "A pine forest".into(),
            time_period: "Timeless".into(),
            atmosphere: "Quiet and magical".into(),
            visual_details: "Tall pines, fireflies, soft moss".into(),
        },
        plot_points: vec![PlotPoint {
            id: "plot-1".into(),
            order: 1,
            title: "The lantern".into(),
            description: "Pip finds a lantern.".into(),
            characters: vec!["char-1".into()],
        }],
        cover_description: "Pip holding a glowing lantern among the pines".into(),
        back_cover_description: "The lantern resting on a mossy stump".into(),
        back_cover_blurb: "Every forest needs a little light.".into(),
    }
}

pub fn manuscript(pages: u32) -> Manuscript {
    Manuscript {
        pages: (1..=pages)
            .map(|n| ManuscriptPage {
                page_number: n,
                spread: PageSpread::Full,
                text: Some(format!("Text of page {n}.")),
                text_placement: TextPlacement::Bottom,
                illustration_description: format!("Scene for page {n}"),
                characters: vec!["char-1".into()],
                mood: "hopeful".into(),
                action: "walking".into(),
            })
            .collect(),
    }
}

/// A project with an outline and an `pages`-page manuscript, stored.
pub async fn seed_project(storage: &dyn StorageAdapter, pages: u32) -> Project {
    let mut project = Project::new("Pip", "a fox with a lantern", ProjectSettings::default());
    project.set_outline(outline());
    project
        .set_manuscript(manuscript(pages))
        .expect("outline is set");
    storage.create_project(&project).await.expect("create project");
    project
}

// ---------------------------------------------------------------------------
// Recording collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingObservability {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingObservability {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl Observability for RecordingObservability {
    fn record_event(&self, name: &str, payload: Value) {
        self.events.lock().unwrap().push((name.to_string(), payload));
    }

    async fn get_text_cache(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set_text_cache(&self, _key: &str, _value: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Progress { current: u32, total: u32, message: String },
    ImageComplete { slot: IllustrationTarget, image_type: ImageType },
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Progress { current, total, .. } => Some((current, total)),
                SinkEvent::ImageComplete { .. } => None,
            })
            .collect()
    }

    pub fn completed(&self) -> Vec<(IllustrationTarget, ImageType)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::ImageComplete { slot, image_type } => Some((slot, image_type)),
                SinkEvent::Progress { .. } => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn progress(&self, current: u32, total: u32, message: &str) {
        self.events.lock().unwrap().push(SinkEvent::Progress {
            current,
            total,
            message: message.to_string(),
        });
    }

    fn image_complete(&self, image: &PageImage, image_type: ImageType) {
        self.events.lock().unwrap().push(SinkEvent::ImageComplete {
            slot: image.slot,
            image_type,
        });
    }
}

/// Filesystem storage that pretends some images were never written.
pub struct HidingStorage {
    inner: FilesystemStorage,
    hidden: Mutex<HashSet<(ImageCategory, String)>>,
}

impl HidingStorage {
    pub fn new(inner: FilesystemStorage) -> Self {
        Self {
            inner,
            hidden: Mutex::new(HashSet::new()),
        }
    }

    pub fn hide(&self, target: IllustrationTarget) {
        self.hidden.lock().unwrap().insert(target.storage_key());
    }

    fn is_hidden(&self, category: ImageCategory, image_id: &str) -> bool {
        self.hidden
            .lock()
            .unwrap()
            .contains(&(category, image_id.to_string()))
    }
}

#[async_trait]
impl StorageAdapter for HidingStorage {
    async fn create_project(&self, project: &Project) -> Result<(), StorageError> {
        self.inner.create_project(project).await
    }

    async fn load_project(&self, project_id: &str) -> Result<Project, StorageError> {
        self.inner.load_project(project_id).await
    }

    async fn save_project(&self, project: &Project) -> Result<(), StorageError> {
        self.inner.save_project(project).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        self.inner.delete_project(project_id).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError> {
        self.inner.list_projects().await
    }

    async fn project_exists(&self, project_id: &str) -> Result<bool, StorageError> {
        self.inner.project_exists(project_id).await
    }

    async fn save_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        self.inner.save_image(project_id, category, image_id, data).await
    }

    async fn load_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<Vec<u8>, StorageError> {
        if self.is_hidden(category, image_id) {
            return Err(StorageError::NotFound(format!("image {image_id}")));
        }
        self.inner.load_image(project_id, category, image_id).await
    }

    async fn delete_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<(), StorageError> {
        self.inner.delete_image(project_id, category, image_id).await
    }

    fn image_path(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<String, StorageError> {
        self.inner.image_path(project_id, category, image_id)
    }

    async fn save_export(
        &self,
        project_id: &str,
        export_id: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        self.inner.save_export(project_id, export_id, data).await
    }

    async fn load_export(&self, project_id: &str, export_id: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.load_export(project_id, export_id).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub storage: Arc<HidingStorage>,
    pub images: Arc<MockImageAdapter>,
    pub observability: Arc<RecordingObservability>,
    pub orchestrator: IllustrationOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_images(MockImageAdapter::new())
    }

    pub fn with_images(images: MockImageAdapter) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(HidingStorage::new(FilesystemStorage::new(dir.path())));
        let images = Arc::new(images);
        let observability = Arc::new(RecordingObservability::default());
        let orchestrator = IllustrationOrchestrator::new(
            images.clone(),
            storage.clone(),
            observability.clone(),
        );
        Self {
            dir,
            storage,
            images,
            observability,
            orchestrator,
        }
    }

    pub async fn seed(&self, pages: u32) -> Project {
        seed_project(self.storage.as_ref(), pages).await
    }

    pub async fn reload(&self, project_id: &str) -> Project {
        self.storage.load_project(project_id).await.expect("load project")
    }
}
