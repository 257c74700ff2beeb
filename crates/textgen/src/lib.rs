//! Text generation providers and structured (JSON) responses.

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod mock;
pub mod structured;

pub use adapter::{
    StopReason, TextGenOptions, TextGenerationAdapter, TextGenerationResponse, TextModelInfo,
    TokenUsage,
};
pub use anthropic::AnthropicAdapter;
pub use error::TextGenError;
pub use mock::MockTextAdapter;
pub use structured::{generate_structured, parse_structured};
