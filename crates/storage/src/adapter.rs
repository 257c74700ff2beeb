use async_trait::async_trait;
use picturebook_core::illustration::ImageCategory;
use picturebook_core::project::{Project, ProjectSummary};

use crate::error::StorageError;

/// Persistence backend for projects and their binary artifacts.
///
/// Implementations must serialize writes to a single project document;
/// writes to different projects may proceed concurrently.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Create the project's directory structure and write its document.
    async fn create_project(&self, project: &Project) -> Result<(), StorageError>;

    async fn load_project(&self, project_id: &str) -> Result<Project, StorageError>;

    async fn save_project(&self, project: &Project) -> Result<(), StorageError>;

    /// Remove a project and all of its artifacts. Missing projects are a
    /// no-op.
    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError>;

    /// Summaries of every readable project, most recently updated first.
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError>;

    async fn project_exists(&self, project_id: &str) -> Result<bool, StorageError>;

    /// Store an image, replacing any previous image under the same key.
    /// Returns the stored path.
    async fn save_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
        data: &[u8],
    ) -> Result<String, StorageError>;

    async fn load_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<Vec<u8>, StorageError>;

    async fn delete_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<(), StorageError>;

    /// Where an image with this key is (or would be) stored.
    fn image_path(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<String, StorageError>;

    async fn save_export(
        &self,
        project_id: &str,
        export_id: &str,
        data: &[u8],
    ) -> Result<String, StorageError>;

    async fn load_export(&self, project_id: &str, export_id: &str) -> Result<Vec<u8>, StorageError>;
}
