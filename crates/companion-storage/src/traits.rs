//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use companion_core::StorageSettings;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Unexpected backend response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Identifiers of a multipart session held by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUpload {
    pub key: String,
    pub upload_id: String,
}

/// One part the backend has accepted for a multipart session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A single page of a part listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartsPage {
    pub parts: Vec<UploadedPart>,
    pub is_truncated: bool,
    pub next_part_number_marker: Option<String>,
}

/// Part reference sent when completing a multipart session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartRef {
    pub part_number: i32,
    pub e_tag: String,
}

/// Object storage abstraction trait
///
/// Every call receives the tenant's [`StorageSettings`] so one backend client
/// can serve several tenants (bucket, region and accelerate flag are per call).
/// The backend is the only owner of multipart session state.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Presign a PUT of `key` with the given content type.
    async fn presign_put(
        &self,
        target: &StorageSettings,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Start a multipart session. The returned key is the one the backend echoes.
    async fn create_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        content_type: &str,
    ) -> StorageResult<MultipartUpload>;

    /// Presign an UploadPart request for one part of a session.
    async fn presign_upload_part(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Fetch one page of accepted parts, starting after `part_number_marker`.
    async fn list_parts_page(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        part_number_marker: Option<&str>,
    ) -> StorageResult<PartsPage>;

    /// Finalize the object. Returns the backend-reported location, if any.
    async fn complete_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartRef],
    ) -> StorageResult<Option<String>>;

    async fn abort_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()>;
}
