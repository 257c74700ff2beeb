pub mod error;
pub mod hashing;
pub mod illustration;
pub mod manuscript;
pub mod observability;
pub mod outline;
pub mod project;
pub mod prompts;
pub mod types;
