//! Route definitions for `/generate`.

use axum::routing::post;
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generate`.
///
/// ```text
/// POST /outline                  -> generate_outline
/// POST /outline/refine           -> refine_outline
/// POST /manuscript               -> generate_manuscript
/// POST /manuscript/refine        -> refine_manuscript
/// POST /page/{page_number}       -> generate_page
/// POST /all-pages                -> generate_all_pages
/// POST /illustration/refine      -> refine_illustration
/// POST /illustrations/refine     -> refine_all_illustrations
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/outline", post(generation::generate_outline))
        .route("/outline/refine", post(generation::refine_outline))
        .route("/manuscript", post(generation::generate_manuscript))
        .route("/manuscript/refine", post(generation::refine_manuscript))
        .route("/page/{page_number}", post(generation::generate_page))
        .route("/all-pages", post(generation::generate_all_pages))
        .route("/illustration/refine", post(generation::refine_illustration))
        .route("/illustrations/refine", post(generation::refine_all_illustrations))
}
