//! Project CRUD.

use std::sync::Arc;

use picturebook_core::error::CoreError;
use picturebook_core::project::{Project, ProjectSettings, ProjectSettingsPatch, ProjectSummary};
use picturebook_storage::StorageAdapter;

use crate::error::PipelineError;
use crate::store::{load_project, update_project};

#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub name: String,
    pub topic: String,
    pub settings: Option<ProjectSettingsPatch>,
}

/// Name, topic and settings changes. Story and illustration state is
/// only changed by the generation stages.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub topic: Option<String>,
    pub settings: Option<ProjectSettingsPatch>,
}

fn non_blank(field: &str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

pub struct ProjectService {
    storage: Arc<dyn StorageAdapter>,
}

impl ProjectService {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, input: CreateProject) -> Result<Project, PipelineError> {
        let mut settings = ProjectSettings::default();
        if let Some(patch) = input.settings {
            patch.apply_to(&mut settings)?;
        }
        let project = Project::new(
            non_blank("Name", &input.name)?,
            non_blank("Topic", &input.topic)?,
            settings,
        );
        self.storage.create_project(&project).await?;
        tracing::info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    pub async fn get(&self, project_id: &str) -> Result<Project, PipelineError> {
        load_project(self.storage.as_ref(), project_id).await
    }

    pub async fn update(&self, project_id: &str, input: UpdateProject) -> Result<Project, PipelineError> {
        let (project, ()) = update_project(self.storage.as_ref(), project_id, |project| {
            if let Some(name) = &input.name {
                project.name = non_blank("Name", name)?;
            }
            if let Some(topic) = &input.topic {
                project.topic = non_blank("Topic", topic)?;
            }
            if let Some(patch) = input.settings {
                patch.apply_to(&mut project.settings)?;
            }
            Ok(())
        })
        .await?;
        Ok(project)
    }

    pub async fn delete(&self, project_id: &str) -> Result<(), PipelineError> {
        if !self.storage.project_exists(project_id).await? {
            return Err(CoreError::NotFound {
                entity: "Project",
                id: project_id.to_string(),
            }
            .into());
        }
        self.storage.delete_project(project_id).await?;
        tracing::info!(project_id = %project_id, "Project deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ProjectSummary>, PipelineError> {
        Ok(self.storage.list_projects().await?)
    }
}
