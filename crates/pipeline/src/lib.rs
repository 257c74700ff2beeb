//! Story and illustration pipeline.
//!
//! - [`IllustrationOrchestrator`]: sequential cover → pages → back cover
//!   generation with reference images, single-page generation and
//!   refinement.
//! - [`references`]: which earlier images accompany each generation call.
//! - [`BatchGuard`]: at most one batch per project at a time.
//! - [`OutlineService`], [`ManuscriptService`], [`ProjectService`]: the
//!   text stages and project CRUD.

pub mod error;
pub mod guard;
pub mod illustration;
pub mod manuscript;
pub mod outline;
pub mod project;
pub mod references;

mod store;

pub use error::PipelineError;
pub use guard::{BatchGuard, BatchPermit};
pub use illustration::IllustrationOrchestrator;
pub use manuscript::{ManuscriptRequest, ManuscriptService};
pub use outline::{OutlineRequest, OutlineService};
pub use project::{CreateProject, ProjectService, UpdateProject};
