//! Filesystem-backed storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! {root}/{projectId}/project.json
//! {root}/{projectId}/images/{category}/{imageId}.png
//! {root}/{projectId}/exports/{exportId}.pdf
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use picturebook_core::illustration::ImageCategory;
use picturebook_core::project::{Project, ProjectSummary};
use picturebook_core::types::new_id;
use tokio::fs;

use crate::adapter::StorageAdapter;
use crate::error::StorageError;

const PROJECT_FILE: &str = "project.json";

/// Directories created alongside a new project document.
const PROJECT_SUBDIRS: &[&str] = &[
    "images/pages",
    "images/cover",
    "images/composed",
    "images/references",
    "exports",
];

pub struct FilesystemStorage {
    root: PathBuf,
    /// One async lock per project id, guarding its `project.json`.
    project_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: &str) -> Result<PathBuf, StorageError> {
        validate_id(project_id)?;
        Ok(self.root.join(project_id))
    }

    fn project_file(&self, project_id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.project_dir(project_id)?.join(PROJECT_FILE))
    }

    fn image_file(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<PathBuf, StorageError> {
        validate_id(image_id)?;
        Ok(self
            .project_dir(project_id)?
            .join("images")
            .join(category.as_str())
            .join(format!("{image_id}.png")))
    }

    fn export_file(&self, project_id: &str, export_id: &str) -> Result<PathBuf, StorageError> {
        validate_id(export_id)?;
        Ok(self
            .project_dir(project_id)?
            .join("exports")
            .join(format!("{export_id}.pdf")))
    }

    fn lock_for(&self, project_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .project_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(project_id.to_string())
            .or_default()
            .clone()
    }

    async fn write_project(&self, project: &Project) -> Result<(), StorageError> {
        let path = self.project_file(&project.id)?;
        let json = serde_json::to_vec_pretty(project)?;
        let lock = self.lock_for(&project.id);
        let _guard = lock.lock().await;
        write_atomic(&path, &json).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Ids become path segments, so only `[A-Za-z0-9_-]` is accepted.
fn validate_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("blob");
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", new_id()));
    fs::write(&tmp, data).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

async fn read_or_not_found(path: &Path, what: impl FnOnce() -> String) -> Result<Vec<u8>, StorageError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(what())),
        Err(e) => Err(e.into()),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// StorageAdapter
// ---------------------------------------------------------------------------

#[async_trait]
impl StorageAdapter for FilesystemStorage {
    async fn create_project(&self, project: &Project) -> Result<(), StorageError> {
        let dir = self.project_dir(&project.id)?;
        for sub in PROJECT_SUBDIRS {
            fs::create_dir_all(dir.join(sub)).await?;
        }
        self.write_project(project).await?;
        tracing::debug!(project_id = %project.id, "Project created on disk");
        Ok(())
    }

    async fn load_project(&self, project_id: &str) -> Result<Project, StorageError> {
        let path = self.project_file(project_id)?;
        let bytes = read_or_not_found(&path, || format!("Project {project_id}")).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save_project(&self, project: &Project) -> Result<(), StorageError> {
        self.write_project(project).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        let dir = self.project_dir(project_id)?;
        let lock = self.lock_for(project_id);
        let guard = lock.lock().await;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        drop(guard);
        self.project_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(project_id);
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError> {
        fs::create_dir_all(&self.root).await?;
        let mut entries = fs::read_dir(&self.root).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            match self.load_project(&name).await {
                Ok(project) => summaries.push(project.summary()),
                Err(e) => {
                    tracing::debug!(dir = %name, error = %e, "Skipping unreadable project directory");
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn project_exists(&self, project_id: &str) -> Result<bool, StorageError> {
        let path = self.project_file(project_id)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn save_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let path = self.image_file(project_id, category, image_id)?;
        write_atomic(&path, data).await?;
        Ok(path_string(&path))
    }

    async fn load_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<Vec<u8>, StorageError> {
        let path = self.image_file(project_id, category, image_id)?;
        read_or_not_found(&path, || {
            format!("Image {}/{image_id} of project {project_id}", category.as_str())
        })
        .await
    }

    async fn delete_image(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<(), StorageError> {
        let path = self.image_file(project_id, category, image_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn image_path(
        &self,
        project_id: &str,
        category: ImageCategory,
        image_id: &str,
    ) -> Result<String, StorageError> {
        Ok(path_string(&self.image_file(project_id, category, image_id)?))
    }

    async fn save_export(
        &self,
        project_id: &str,
        export_id: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let path = self.export_file(project_id, export_id)?;
        write_atomic(&path, data).await?;
        Ok(path_string(&path))
    }

    async fn load_export(&self, project_id: &str, export_id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.export_file(project_id, export_id)?;
        read_or_not_found(&path, || format!("Export {export_id} of project {project_id}")).await
    }
}
