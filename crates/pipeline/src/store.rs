//! Read-modify-write helpers over the storage adapter.

use picturebook_core::error::CoreError;
use picturebook_core::project::Project;
use picturebook_storage::{StorageAdapter, StorageError};

use crate::error::PipelineError;

/// Load a project, mapping a missing document to [`CoreError::NotFound`].
pub(crate) async fn load_project(
    storage: &dyn StorageAdapter,
    project_id: &str,
) -> Result<Project, PipelineError> {
    match storage.load_project(project_id).await {
        Ok(project) => Ok(project),
        Err(StorageError::NotFound(_)) => Err(CoreError::NotFound {
            entity: "Project",
            id: project_id.to_string(),
        }
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Load, mutate and save one project. The document is not held locked
/// between load and save; concurrent writers are last-write-wins.
pub(crate) async fn update_project<T>(
    storage: &dyn StorageAdapter,
    project_id: &str,
    mutate: impl FnOnce(&mut Project) -> Result<T, CoreError>,
) -> Result<(Project, T), PipelineError> {
    let mut project = load_project(storage, project_id).await?;
    let out = mutate(&mut project)?;
    project.touch();
    storage.save_project(&project).await?;
    Ok((project, out))
}
