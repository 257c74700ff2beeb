pub mod generation;
pub mod health;
pub mod images;
pub mod projects;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /projects                                  list, create
/// /projects/{id}                             get, update, delete
///
/// /generate/outline                          generate outline
/// /generate/manuscript                       generate manuscript
/// /generate/page/{page_number}               single page
/// /generate/all-pages                        batch (SSE or JSON)
/// /generate/illustration/refine              single refinement
/// /generate/illustrations/refine             batch refinement
///
/// /images/{project_id}/{category}/{image_id} image bytes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", projects::router())
        .nest("/generate", generation::router())
        .nest("/images", images::router())
}
