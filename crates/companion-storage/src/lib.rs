//! Companion Storage Library
//!
//! Object storage abstraction for the upload broker: presigned single PUTs and
//! the multipart protocol (create, sign part, list, complete, abort).
//!
//! # Storage key format
//!
//! Keys are derived once, when an upload starts, by [`keys::build_key`]:
//!
//! `{tenant}/original/{identity}/{year}/{month}/{day}/{HHMMSSmmm}/{filename}`
//!
//! Every later part/list/complete/abort call references that key by value.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-s3")]
pub use factory::S3StorageProvider;
pub use factory::{StaticStorageProvider, StorageProvider};
pub use keys::{build_key, sanitize_filename};
#[cfg(feature = "storage-memory")]
pub use memory::{InMemoryStorage, PaginationFault};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{
    CompletedPartRef, MultipartUpload, ObjectStorage, PartsPage, StorageError, StorageResult,
    UploadedPart,
};
