//! Prompt builders for the text and image providers.
//!
//! Builders are pure functions over domain types so they can be unit tested
//! and reused by both the batch orchestrator and the single-call services.

pub mod illustration;
pub mod manuscript;
pub mod outline;

pub use illustration::{
    back_cover_prompt, cover_prompt, page_prompt, reference_instructions, refinement_prompt,
    CoverContext, PageContext, RefinementContext,
};
pub use manuscript::{
    manuscript_refinement_prompt, manuscript_system_prompt, manuscript_user_prompt, TextStyle,
};
pub use outline::{outline_refinement_prompt, outline_system_prompt, outline_user_prompt};
