//! Handlers for outline, manuscript and illustration generation.
//!
//! The batch endpoint answers either with a Server-Sent Events stream
//! (when the client accepts `text/event-stream`) or with the finished
//! page list as JSON.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use picturebook_core::error::CoreError;
use picturebook_core::illustration::{IllustrationFeedback, IllustrationTarget};
use picturebook_core::manuscript::ManuscriptFeedback;
use picturebook_core::outline::OutlineFeedback;
use picturebook_core::project::TargetAge;
use picturebook_core::prompts::TextStyle;
use picturebook_events::{ChannelSink, NoopSink, ProgressEvent};
use picturebook_pipeline::{ManuscriptRequest, OutlineRequest};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::validated;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutlineRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub topic: String,
    pub target_age: Option<TargetAge>,
    #[validate(range(min = 4, max = 32, message = "pageCount must be between 4 and 32"))]
    pub page_count: Option<u32>,
    pub tone_keywords: Option<Vec<String>>,
    pub additional_instructions: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateManuscriptRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    pub words_per_page: Option<u32>,
    pub text_style: Option<TextStyle>,
    pub additional_guidance: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefineOutlineRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    pub feedback: OutlineFeedback,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefineManuscriptRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    pub feedback: ManuscriptFeedback,
}

/// Body shared by the single-page and all-pages endpoints.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIllustrationRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    pub additional_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefineIllustrationRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    pub target: IllustrationTarget,
    #[validate(length(min = 1, message = "feedback must not be empty"))]
    pub feedback: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefineAllIllustrationsRequest {
    #[validate(length(min = 1, message = "projectId must not be empty"))]
    pub project_id: String,
    pub feedback: IllustrationFeedback,
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/event-stream"))
}

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

/// POST /api/v1/generate/outline
///
/// Generate and store the outline. Responds with the outline.
pub async fn generate_outline(
    State(state): State<AppState>,
    Json(input): Json<GenerateOutlineRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let project = state
        .outlines
        .generate_outline(OutlineRequest {
            project_id: input.project_id,
            topic: input.topic,
            target_age: input.target_age,
            page_count: input.page_count,
            tone_keywords: input.tone_keywords,
            additional_instructions: input.additional_instructions,
        })
        .await?;

    let outline = project
        .outline
        .ok_or_else(|| AppError::InternalError("Outline missing after generation".to_string()))?;
    Ok(Json(DataResponse { data: outline }))
}

/// POST /api/v1/generate/manuscript
///
/// Generate and store the manuscript. Responds with the manuscript.
pub async fn generate_manuscript(
    State(state): State<AppState>,
    Json(input): Json<GenerateManuscriptRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let project = state
        .manuscripts
        .generate_manuscript(ManuscriptRequest {
            project_id: input.project_id,
            words_per_page: input.words_per_page,
            text_style: input.text_style,
            additional_guidance: input.additional_guidance,
        })
        .await?;

    let manuscript = project.manuscript.ok_or_else(|| {
        AppError::InternalError("Manuscript missing after generation".to_string())
    })?;
    Ok(Json(DataResponse { data: manuscript }))
}

/// POST /api/v1/generate/outline/refine
///
/// Revise the stored outline from reviewer feedback. Responds with the
/// revised outline.
pub async fn refine_outline(
    State(state): State<AppState>,
    Json(input): Json<RefineOutlineRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let project = state
        .outlines
        .refine_outline(&input.project_id, &input.feedback)
        .await?;

    let outline = project
        .outline
        .ok_or_else(|| AppError::InternalError("Outline missing after refinement".to_string()))?;
    Ok(Json(DataResponse { data: outline }))
}

/// POST /api/v1/generate/manuscript/refine
pub async fn refine_manuscript(
    State(state): State<AppState>,
    Json(input): Json<RefineManuscriptRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let project = state
        .manuscripts
        .refine_manuscript(&input.project_id, &input.feedback)
        .await?;

    let manuscript = project.manuscript.ok_or_else(|| {
        AppError::InternalError("Manuscript missing after refinement".to_string())
    })?;
    Ok(Json(DataResponse { data: manuscript }))
}

// ---------------------------------------------------------------------------
// Illustrations
// ---------------------------------------------------------------------------

/// POST /api/v1/generate/page/{page_number}
///
/// Generate one content page outside any batch session.
pub async fn generate_page(
    State(state): State<AppState>,
    Path(page_number): Path<u32>,
    Json(input): Json<GenerateIllustrationRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    if page_number == 0 {
        return Err(AppError::BadRequest("Page numbers start at 1".to_string()));
    }

    let image = state
        .illustrations
        .generate_page(&input.project_id, page_number, input.additional_prompt.as_deref())
        .await?;

    Ok(Json(DataResponse { data: image }))
}

/// POST /api/v1/generate/all-pages
///
/// Generate cover, pages and back cover. With `Accept: text/event-stream`
/// the run is streamed as progress events; otherwise the response holds
/// the page list once the run is done. A run already active for the
/// project is rejected with 409 in both modes.
pub async fn generate_all_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<GenerateIllustrationRequest>,
) -> AppResult<Response> {
    let input = validated(input)?;
    let permit = state.illustrations.reserve_batch(&input.project_id)?;
    let orchestrator = state.illustrations.clone();
    let project_id = input.project_id;
    let additional_prompt = input.additional_prompt;

    // The run gets its own task in both modes: dropping the request must
    // not cancel a step in flight.
    if !accepts_event_stream(&headers) {
        let run = tokio::spawn(async move {
            orchestrator
                .generate_reserved(permit, additional_prompt.as_deref(), &NoopSink)
                .await
        });
        let pages = run.await.map_err(|e| {
            AppError::InternalError(format!("Illustration batch task failed: {e}"))
        })??;
        return Ok(Json(DataResponse { data: pages }).into_response());
    }

    let (sink, receiver) = ChannelSink::channel();
    tokio::spawn(async move {
        let result = orchestrator
            .generate_reserved(permit, additional_prompt.as_deref(), &sink)
            .await;
        if sink.is_closed() {
            tracing::info!(
                project_id = %project_id,
                succeeded = result.is_ok(),
                "Batch finished after the client disconnected"
            );
        }
        sink.send(ProgressEvent::terminal(&result));
    });

    let stream = UnboundedReceiverStream::new(receiver).map(|event| {
        Ok::<_, Infallible>(Event::default().json_data(&event).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode progress event");
            Event::default().data(r#"{"type":"error","error":"Failed to encode progress event"}"#)
        }))
    });

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// POST /api/v1/generate/illustration/refine
pub async fn refine_illustration(
    State(state): State<AppState>,
    Json(input): Json<RefineIllustrationRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    let image = state
        .illustrations
        .refine_illustration(&input.project_id, input.target, &input.feedback)
        .await?;

    Ok(Json(DataResponse { data: image }))
}

/// POST /api/v1/generate/illustrations/refine
///
/// Refine every slot that has feedback, in generation order. The first
/// failure aborts the rest.
pub async fn refine_all_illustrations(
    State(state): State<AppState>,
    Json(input): Json<RefineAllIllustrationsRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validated(input)?;
    if input.feedback.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one feedback entry is required".to_string(),
        )));
    }

    let result = state
        .illustrations
        .refine_all_illustrations(&input.project_id, &input.feedback)
        .await?;

    Ok(Json(DataResponse { data: result }))
}
