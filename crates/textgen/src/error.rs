/// Maximum number of characters of an unparseable response kept in
/// [`TextGenError::MalformedResponse`].
pub const RAW_PREFIX_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum TextGenError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Text provider error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Text provider returned no text content")]
    EmptyResponse,

    /// A structured response could not be parsed. Never coerced.
    #[error("Failed to parse JSON response: {reason}. Response was: {raw_prefix}")]
    MalformedResponse { reason: String, raw_prefix: String },

    #[error("Text generation failed: {0}")]
    Provider(String),
}

impl TextGenError {
    pub fn malformed(reason: impl ToString, raw: &str) -> Self {
        Self::MalformedResponse {
            reason: reason.to_string(),
            raw_prefix: raw.chars().take(RAW_PREFIX_LIMIT).collect(),
        }
    }
}
