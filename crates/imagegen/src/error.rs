/// Errors from an image generation provider.
#[derive(Debug, thiserror::Error)]
pub enum ImageGenError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Image provider error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response parsed but carried no image part.
    #[error("No image generated in response: {0}")]
    NoImage(String),

    /// The model cannot produce the requested aspect ratio.
    #[error("Aspect ratio {0} is not supported by this model")]
    UnsupportedAspectRatio(&'static str),

    #[error("Invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Any other provider-side failure.
    #[error("Image generation failed: {0}")]
    Provider(String),
}
