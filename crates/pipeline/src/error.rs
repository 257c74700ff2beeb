use picturebook_core::error::CoreError;
use picturebook_imagegen::ImageGenError;
use picturebook_storage::StorageError;
use picturebook_textgen::TextGenError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    ImageGen(#[from] ImageGenError),

    #[error(transparent)]
    TextGen(#[from] TextGenError),
}
