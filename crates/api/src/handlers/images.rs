use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use picturebook_core::illustration::ImageCategory;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/images/{project_id}/{category}/{image_id}
///
/// Serve a stored PNG. `image_id` may carry the `.png` extension.
pub async fn get_image(
    State(state): State<AppState>,
    Path((project_id, category, image_id)): Path<(String, String, String)>,
) -> AppResult<impl IntoResponse> {
    let category = ImageCategory::parse(&category)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown image category '{category}'")))?;
    let image_id = image_id.strip_suffix(".png").unwrap_or(&image_id);

    let bytes = state
        .storage
        .load_image(&project_id, category, image_id)
        .await?;

    Ok((
        [(CONTENT_TYPE, "image/png"), (CACHE_CONTROL, "no-cache")],
        bytes,
    ))
}
