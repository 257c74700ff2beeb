//! Shared fixtures for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use picturebook_api::config::ServerConfig;
use picturebook_api::router::build_app_router;
use picturebook_api::state::AppState;
use picturebook_events::{EventBus, Telemetry};
use picturebook_imagegen::MockImageAdapter;
use picturebook_storage::{FilesystemStorage, StorageAdapter};
use picturebook_textgen::MockTextAdapter;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const OUTLINE_NEEDLE: &str = "Write a picture book outline about";
pub const MANUSCRIPT_NEEDLE: &str = "Write the manuscript for this outline";

/// Build a test `ServerConfig` rooted at `projects_path`, with mock
/// providers and the text cache disabled.
pub fn test_config(projects_path: &std::path::Path) -> ServerConfig {
    let root = projects_path.to_string_lossy().into_owned();
    ServerConfig::from_lookup(|key| match key {
        "HOST" => Some("127.0.0.1".to_string()),
        "REQUEST_TIMEOUT_SECS" => Some("30".to_string()),
        "PROJECTS_PATH" => Some(root.clone()),
        "CACHE_ENABLED" => Some("false".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

/// A full application router over a temporary project directory.
pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub storage: Arc<FilesystemStorage>,
    pub images: Arc<MockImageAdapter>,
    pub text: Arc<MockTextAdapter>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_images(MockImageAdapter::new())
    }

    pub fn with_images(images: MockImageAdapter) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path());
        let storage = Arc::new(FilesystemStorage::new(dir.path()));
        let images = Arc::new(images);
        let text = Arc::new(MockTextAdapter::new());
        let event_bus = Arc::new(EventBus::default());
        let observability = Arc::new(Telemetry::new(Arc::clone(&event_bus), None));

        let state = AppState::new(
            config,
            storage.clone(),
            images.clone(),
            text.clone(),
            event_bus,
            observability,
        );

        Self {
            dir,
            storage,
            images,
            text,
            router: build_app_router(state.clone()),
            state,
        }
    }

    /// The router is cheap to clone; each request gets its own copy.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Create a project, then drive outline and manuscript generation
    /// through the API. Returns the project id.
    pub async fn seed_story(&self, pages: u32) -> String {
        self.text
            .set_response(OUTLINE_NEEDLE, outline_json().to_string());
        self.text
            .set_response(MANUSCRIPT_NEEDLE, manuscript_json(pages).to_string());

        let response = post_json(
            self.app(),
            "/api/v1/projects",
            json!({ "name": "Pip", "topic": "a fox with a lantern" }),
        )
        .await;
        let id = body_json(response).await["data"]["id"]
            .as_str()
            .expect("project id")
            .to_string();

        let outline = post_json(
            self.app(),
            "/api/v1/generate/outline",
            json!({ "projectId": id, "topic": "a fox with a lantern", "pageCount": pages }),
        )
        .await;
        assert_eq!(outline.status(), StatusCode::OK, "outline generation");
        let manuscript = post_json(
            self.app(),
            "/api/v1/generate/manuscript",
            json!({ "projectId": id }),
        )
        .await;
        assert_eq!(manuscript.status(), StatusCode::OK, "manuscript generation");

        id
    }

    pub async fn load(&self, project_id: &str) -> picturebook_core::project::Project {
        self.storage.load_project(project_id).await.expect("project")
    }
}

// ---------------------------------------------------------------------------
// Story fixtures
// ---------------------------------------------------------------------------

pub fn outline_json() -> Value {
    json!({
        "title": "Pip and the Lantern",
        "synopsis": "A small fox carries a lantern through the forest.",
        "theme": "Courage",
        "characters": [{
            "id": "char-1",
            "name": "Pip",
            "role": "protagonist",
            "description": "A brave little fox",
            "physicalDescription": "Small orange fox with a green scarf"
        }],
        "setting": {
            "location": "A pine forest",
            "timePeriod": "Timeless",
            "atmosphere": "Quiet and magical",
            "visualDetails": "Tall pines and fireflies"
        },
        "plotPoints": [{
            "id": "plot-1",
            "order": 1,
            "title": "The lantern",
            "description": "Pip finds a lantern.",
            "characters": ["char-1"]
        }],
        "coverDescription": "Pip holding a glowing lantern among the pines",
        "backCoverDescription": "The lantern resting on a mossy stump",
        "backCoverBlurb": "Every forest needs a little light."
    })
}

pub fn manuscript_json(pages: u32) -> Value {
    let pages: Vec<Value> = (1..=pages)
        .map(|n| {
            json!({
                "pageNumber": n,
                "spread": "full",
                "text": format!("Text of page {n}."),
                "textPlacement": "bottom",
                "illustrationDescription": format!("Scene for page {n}"),
                "characters": ["char-1"],
                "mood": "hopeful",
                "action": "walking"
            })
        })
        .collect();
    json!({ "pages": pages })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response {
    send_json(app, Method::PUT, uri, body).await
}

/// POST asking for a Server-Sent Events response.
pub async fn post_event_stream(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
