use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// GET /{project_id}/{category}/{image_id} -> get_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{project_id}/{category}/{image_id}", get(images::get_image))
}
