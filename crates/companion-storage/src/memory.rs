//! In-process object storage.
//!
//! Keeps multipart sessions in a map and hands out fake presigned URLs. Listing
//! is paginated like S3 so callers exercise their pagination loop; faults can
//! be injected per operation.

use crate::traits::{
    CompletedPartRef, MultipartUpload, ObjectStorage, PartsPage, StorageError, StorageResult,
    UploadedPart,
};
use async_trait::async_trait;
use chrono::Utc;
use companion_core::StorageSettings;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Misbehaviors of the listing endpoint, for pagination tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationFault {
    #[default]
    None,
    /// Reports `is_truncated` without a next marker.
    MissingMarker,
    /// Always reports another page.
    Endless,
}

#[derive(Debug)]
struct Session {
    key: String,
    parts: BTreeMap<i32, UploadedPart>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    sessions: HashMap<String, Session>,
    completed: HashMap<String, String>,
    list_calls: usize,
}

#[derive(Debug)]
pub struct InMemoryStorage {
    state: Mutex<State>,
    page_size: usize,
    pagination_fault: PaginationFault,
    failing: Mutex<HashSet<&'static str>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 1000,
            pagination_fault: PaginationFault::None,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_pagination_fault(mut self, fault: PaginationFault) -> Self {
        self.pagination_fault = fault;
        self
    }

    /// Make every later call to `operation` fail with a backend error.
    /// Operation names match the trait methods (`create_multipart_upload`, ...).
    pub fn fail_operation(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation);
        }
    }

    /// Record a part as if the browser had PUT it to a presigned URL.
    pub fn put_part(&self, upload_id: &str, part_number: i32, e_tag: &str, size: i64) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(session) = state.sessions.get_mut(upload_id) {
                session.parts.insert(
                    part_number,
                    UploadedPart {
                        part_number,
                        e_tag: e_tag.to_string(),
                        size,
                        last_modified: Some(Utc::now()),
                    },
                );
            }
        }
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().map(|s| s.list_calls).unwrap_or_default()
    }

    pub fn is_open(&self, upload_id: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.sessions.contains_key(upload_id))
            .unwrap_or(false)
    }

    pub fn completed_key(&self, upload_id: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.completed.get(upload_id).cloned())
    }

    fn check(&self, operation: &'static str) -> StorageResult<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| StorageError::BackendError("storage lock poisoned".to_string()))?;
        if failing.contains(operation) {
            return Err(StorageError::BackendError(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StorageError::BackendError("storage lock poisoned".to_string()))
    }

    fn object_url(target: &StorageSettings, key: &str) -> String {
        let host = if target.use_accelerate_endpoint {
            format!("{}.s3-accelerate.amazonaws.com", target.bucket)
        } else {
            format!("{}.s3.{}.amazonaws.com", target.bucket, target.region)
        };
        format!("https://{}/{}", host, key)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn presign_put(
        &self,
        target: &StorageSettings,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.check("presign_put")?;
        Ok(format!(
            "{}?x-id=PutObject&content-type={}&X-Amz-Expires={}",
            Self::object_url(target, key),
            content_type,
            expires_in.as_secs()
        ))
    }

    async fn create_multipart_upload(
        &self,
        _target: &StorageSettings,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<MultipartUpload> {
        self.check("create_multipart_upload")?;
        let mut state = self.lock()?;
        state.next_id += 1;
        let upload_id = format!("upload-{}", state.next_id);
        state.sessions.insert(
            upload_id.clone(),
            Session {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(MultipartUpload {
            key: key.to_string(),
            upload_id,
        })
    }

    async fn presign_upload_part(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.check("presign_upload_part")?;
        Ok(format!(
            "{}?x-id=UploadPart&partNumber={}&uploadId={}&X-Amz-Expires={}",
            Self::object_url(target, key),
            part_number,
            upload_id,
            expires_in.as_secs()
        ))
    }

    async fn list_parts_page(
        &self,
        _target: &StorageSettings,
        _key: &str,
        upload_id: &str,
        part_number_marker: Option<&str>,
    ) -> StorageResult<PartsPage> {
        self.check("list_parts_page")?;
        let mut state = self.lock()?;
        state.list_calls += 1;

        if self.pagination_fault == PaginationFault::Endless {
            return Ok(PartsPage {
                parts: Vec::new(),
                is_truncated: true,
                next_part_number_marker: Some(state.list_calls.to_string()),
            });
        }

        let session = state
            .sessions
            .get(upload_id)
            .ok_or_else(|| StorageError::BackendError(format!("NoSuchUpload: {}", upload_id)))?;

        let after: i32 = part_number_marker
            .map(|m| m.parse())
            .transpose()
            .map_err(|_| StorageError::BackendError("invalid part number marker".to_string()))?
            .unwrap_or(0);

        let remaining: Vec<&UploadedPart> = session
            .parts
            .range((after + 1)..)
            .map(|(_, part)| part)
            .collect();
        let is_truncated = remaining.len() > self.page_size;
        let parts: Vec<UploadedPart> = remaining
            .into_iter()
            .take(self.page_size)
            .cloned()
            .collect();

        let next_part_number_marker = match self.pagination_fault {
            PaginationFault::MissingMarker => None,
            _ if is_truncated => parts.last().map(|p| p.part_number.to_string()),
            _ => None,
        };

        Ok(PartsPage {
            parts,
            is_truncated,
            next_part_number_marker,
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartRef],
    ) -> StorageResult<Option<String>> {
        self.check("complete_multipart_upload")?;
        let mut state = self.lock()?;
        let session = state
            .sessions
            .remove(upload_id)
            .ok_or_else(|| StorageError::BackendError(format!("NoSuchUpload: {}", upload_id)))?;

        let invalid = parts
            .iter()
            .find(|p| {
                session
                    .parts
                    .get(&p.part_number)
                    .map(|stored| stored.e_tag != p.e_tag)
                    .unwrap_or(true)
            })
            .map(|p| p.part_number);

        if let Some(part_number) = invalid {
            state.sessions.insert(upload_id.to_string(), session);
            return Err(StorageError::BackendError(format!(
                "InvalidPart: {}",
                part_number
            )));
        }

        state
            .completed
            .insert(upload_id.to_string(), session.key.clone());
        Ok(Some(Self::object_url(target, key)))
    }

    async fn abort_multipart_upload(
        &self,
        _target: &StorageSettings,
        _key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        self.check("abort_multipart_upload")?;
        self.lock()?.sessions.remove(upload_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> StorageSettings {
        StorageSettings {
            bucket: "b".into(),
            region: "us-east-1".into(),
            credentials: None,
            use_accelerate_endpoint: false,
        }
    }

    #[tokio::test]
    async fn test_listing_is_paginated() {
        let storage = InMemoryStorage::new().with_page_size(2);
        let upload = storage
            .create_multipart_upload(&target(), "k", "text/plain")
            .await
            .unwrap();
        for n in 1..=3 {
            storage.put_part(&upload.upload_id, n, &format!("etag-{}", n), 10);
        }

        let first = storage
            .list_parts_page(&target(), "k", &upload.upload_id, None)
            .await
            .unwrap();
        assert!(first.is_truncated);
        assert_eq!(first.next_part_number_marker.as_deref(), Some("2"));

        let second = storage
            .list_parts_page(&target(), "k", &upload.upload_id, Some("2"))
            .await
            .unwrap();
        assert!(!second.is_truncated);
        assert_eq!(second.parts.len(), 1);
        assert_eq!(second.parts[0].part_number, 3);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let storage = InMemoryStorage::new();
        storage.fail_operation("presign_put");
        let result = storage
            .presign_put(&target(), "k", "text/plain", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(StorageError::BackendError(_))));
    }
}
