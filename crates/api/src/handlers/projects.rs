//! Handlers for project CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use picturebook_core::project::ProjectSettingsPatch;
use picturebook_pipeline::{CreateProject, UpdateProject};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::validated;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub topic: String,
    #[serde(default)]
    pub settings: Option<ProjectSettingsPatch>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub topic: Option<String>,
    #[serde(default)]
    pub settings: Option<ProjectSettingsPatch>,
}

/// GET /api/v1/projects
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let projects = state.projects.list().await?;
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let project = state
        .projects
        .create(CreateProject {
            name: input.name,
            topic: input.topic,
            settings: input.settings,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let project = state.projects.get(&id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}
///
/// Only name, topic and settings can change here.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProjectRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let project = state
        .projects
        .update(
            &id,
            UpdateProject {
                name: input.name,
                topic: input.topic,
                settings: input.settings,
            },
        )
        .await?;

    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.projects.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
