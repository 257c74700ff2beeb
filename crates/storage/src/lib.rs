//! Project persistence: project documents, image blobs and exports.

pub mod adapter;
pub mod error;
pub mod filesystem;

pub use adapter::StorageAdapter;
pub use error::StorageError;
pub use filesystem::FilesystemStorage;
