use super::parts::{parse_completed_parts, part_number_from};
use super::types::{MultipartCompleted, MultipartCreated, PartDescriptor, SignedPart, SignedPut};
use crate::constants::{MAX_LIST_PARTS_PAGES, SIGNED_URL_EXPIRES_SECS};
use chrono::{DateTime, Utc};
use companion_core::{AppError, Identity, Tenant};
use companion_storage::{build_key, ObjectStorage, StorageError, StorageProvider};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

const MISSING_KEY: &str = "s3: the object key must be passed as a query parameter.";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Signs object-storage operations for a tenant.
///
/// Holds no upload state: the multipart session lives in the object store and
/// is addressed by `(key, upload_id)` on every call. Each operation checks the
/// tenant's storage configuration before validating input and before any
/// network call.
#[derive(Clone)]
pub struct UploadBroker {
    storage: Arc<dyn StorageProvider>,
    clock: Clock,
    expires_in: Duration,
}

impl UploadBroker {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            clock: Arc::new(Utc::now),
            expires_in: Duration::from_secs(SIGNED_URL_EXPIRES_SECS),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    async fn backend(&self, tenant: &Tenant) -> Result<Arc<dyn ObjectStorage>, AppError> {
        if !tenant.storage.has_bucket() {
            tracing::warn!(tenant_id = %tenant.id, "Tenant has no bucket configured");
            return Err(AppError::MissingStorageConfig(tenant.id.clone()));
        }

        self.storage.storage_for(tenant).await.map_err(|e| match e {
            StorageError::ConfigError(message) => {
                tracing::warn!(tenant_id = %tenant.id, reason = %message, "No storage credentials for tenant");
                AppError::MissingStorageConfig(tenant.id.clone())
            }
            other => AppError::upstream("resolveStorage", tenant.id.clone(), other),
        })
    }

    /// Presign a single PUT of a new object.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, operation = "signS3"))]
    pub async fn sign_single_put(
        &self,
        tenant: &Tenant,
        filename: Option<&str>,
        content_type: Option<&str>,
        identity: &Identity,
        metadata: Option<&mut Map<String, Value>>,
    ) -> Result<SignedPut, AppError> {
        let backend = self.backend(tenant).await?;

        let (Some(filename), Some(content_type)) = (non_empty(filename), non_empty(content_type))
        else {
            return Err(AppError::Validation(
                "Missing filename or contentType".to_string(),
            ));
        };

        let key = build_key(&tenant.id, filename, identity, metadata, (self.clock)())?;
        let url = backend
            .presign_put(&tenant.storage, &key, content_type, self.expires_in)
            .await
            .map_err(|e| upstream("signS3", tenant, e))?;

        tracing::info!(key = %key, "Signed single upload");
        Ok(SignedPut {
            method: "PUT",
            url,
            fields: Map::new(),
        })
    }

    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, operation = "createMultipart"))]
    pub async fn create_multipart(
        &self,
        tenant: &Tenant,
        filename: Option<&str>,
        content_type: Option<&str>,
        identity: &Identity,
        metadata: Option<&mut Map<String, Value>>,
    ) -> Result<MultipartCreated, AppError> {
        let backend = self.backend(tenant).await?;

        let (Some(filename), Some(content_type)) = (filename, content_type) else {
            return Err(AppError::Validation(
                "s3: filename and type must be strings".to_string(),
            ));
        };

        let key = build_key(&tenant.id, filename, identity, metadata, (self.clock)())?;
        let upload = backend
            .create_multipart_upload(&tenant.storage, &key, content_type)
            .await
            .map_err(|e| upstream("createMultipart", tenant, e))?;

        tracing::info!(key = %upload.key, upload_id = %upload.upload_id, "Created multipart upload");
        Ok(MultipartCreated {
            key: upload.key,
            upload_id: upload.upload_id,
        })
    }

    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, operation = "signPart", upload_id = %upload_id))]
    pub async fn sign_part(
        &self,
        tenant: &Tenant,
        upload_id: &str,
        part_number: &str,
        key: Option<&str>,
    ) -> Result<SignedPart, AppError> {
        let backend = self.backend(tenant).await?;

        let part_number = part_number_from(&Value::String(part_number.to_string())).ok_or_else(
            || {
                AppError::Validation(
                    "s3: the part number must be an integer between 1 and 10000.".to_string(),
                )
            },
        )?;
        let key = require_key(key)?;

        let url = backend
            .presign_upload_part(&tenant.storage, key, upload_id, part_number, self.expires_in)
            .await
            .map_err(|e| upstream("signPart", tenant, e))?;

        Ok(SignedPart {
            url,
            expires: self.expires_in.as_secs(),
        })
    }

    /// Every part the store holds for the session, ordered by part number.
    ///
    /// Follows the listing's page markers, giving up with an upstream failure
    /// after [`MAX_LIST_PARTS_PAGES`] pages or when a truncated page carries no
    /// next marker.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, operation = "listParts", upload_id = %upload_id))]
    pub async fn list_parts(
        &self,
        tenant: &Tenant,
        upload_id: &str,
        key: Option<&str>,
    ) -> Result<Vec<PartDescriptor>, AppError> {
        let backend = self.backend(tenant).await?;
        let key = require_key(key)?;

        let mut parts: Vec<PartDescriptor> = Vec::new();
        let mut marker: Option<String> = None;

        for _ in 0..MAX_LIST_PARTS_PAGES {
            let page = backend
                .list_parts_page(&tenant.storage, key, upload_id, marker.as_deref())
                .await
                .map_err(|e| upstream("listParts", tenant, e))?;

            parts.extend(page.parts.into_iter().map(PartDescriptor::from));

            if !page.is_truncated {
                parts.sort_by_key(|p| p.part_number);
                return Ok(parts);
            }

            match page.next_part_number_marker.filter(|m| !m.is_empty()) {
                Some(next) => marker = Some(next),
                None => {
                    tracing::error!(key = %key, "Truncated part listing without a next marker");
                    return Err(AppError::upstream(
                        "listParts",
                        tenant.id.clone(),
                        "truncated listing without a next part number marker",
                    ));
                }
            }
        }

        tracing::error!(key = %key, pages = MAX_LIST_PARTS_PAGES, "Part listing did not terminate");
        Err(AppError::upstream(
            "listParts",
            tenant.id.clone(),
            format!("listing exceeded {} pages", MAX_LIST_PARTS_PAGES),
        ))
    }

    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, operation = "completeMultipart", upload_id = %upload_id))]
    pub async fn complete_multipart(
        &self,
        tenant: &Tenant,
        upload_id: &str,
        key: Option<&str>,
        parts: Option<&Value>,
    ) -> Result<MultipartCompleted, AppError> {
        let backend = self.backend(tenant).await?;
        let key = require_key(key)?;
        let parts = parse_completed_parts(parts)?;

        let location = backend
            .complete_multipart_upload(&tenant.storage, key, upload_id, &parts)
            .await
            .map_err(|e| upstream("completeMultipart", tenant, e))?;

        Ok(MultipartCompleted { location })
    }

    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, operation = "abortMultipart", upload_id = %upload_id))]
    pub async fn abort_multipart(
        &self,
        tenant: &Tenant,
        upload_id: &str,
        key: Option<&str>,
    ) -> Result<(), AppError> {
        let backend = self.backend(tenant).await?;
        let key = require_key(key)?;

        backend
            .abort_multipart_upload(&tenant.storage, key, upload_id)
            .await
            .map_err(|e| upstream("abortMultipart", tenant, e))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn require_key(key: Option<&str>) -> Result<&str, AppError> {
    non_empty(key).ok_or_else(|| AppError::Validation(MISSING_KEY.to_string()))
}

fn upstream(operation: &'static str, tenant: &Tenant, error: StorageError) -> AppError {
    tracing::error!(
        operation = operation,
        tenant_id = %tenant.id,
        error = %error,
        "Storage operation failed"
    );
    AppError::upstream(operation, tenant.id.clone(), error)
}

/// Normalize the `metadata` field of an upload request into a mutable bag.
///
/// Objects are used as is and JSON-encoded objects are decoded. Anything else
/// means no bag, so nothing is back-filled.
pub(crate) fn metadata_bag(metadata: Option<Value>) -> Option<Map<String, Value>> {
    match metadata? {
        Value::Object(map) => Some(map),
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use companion_core::{build_tenant, AuthUser, TenantDefaults};
    use companion_storage::{InMemoryStorage, PaginationFault, StaticStorageProvider};
    use serde_json::json;

    fn tenant() -> Tenant {
        build_tenant(
            "acme",
            Some(r#"{"s3": {"bucket": "acme-uploads", "region": "eu-west-1"}}"#),
            &TenantDefaults::default(),
        )
        .unwrap()
    }

    fn broker_with(storage: Arc<InMemoryStorage>) -> UploadBroker {
        UploadBroker::new(Arc::new(StaticStorageProvider::new(storage))).with_clock(|| {
            Utc.with_ymd_and_hms(2024, 11, 2, 13, 4, 5).unwrap()
        })
    }

    fn user() -> Identity {
        Identity::Authenticated(Some(AuthUser {
            id: "u-1".into(),
            email: None,
            name: None,
            roles: vec![],
        }))
    }

    #[tokio::test]
    async fn test_missing_bucket_is_checked_before_validation() {
        let broker = broker_with(Arc::new(InMemoryStorage::new()));
        let tenant = build_tenant("bare", None, &TenantDefaults::default()).unwrap();

        let err = broker
            .sign_single_put(&tenant, None, None, &user(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingStorageConfig(ref id) if id == "bare"));
    }

    struct NoCredentials;

    #[async_trait::async_trait]
    impl StorageProvider for NoCredentials {
        async fn storage_for(
            &self,
            tenant: &Tenant,
        ) -> Result<Arc<dyn ObjectStorage>, StorageError> {
            Err(StorageError::ConfigError(format!("no credentials for {}", tenant.id)))
        }
    }

    #[tokio::test]
    async fn test_unresolvable_credentials_are_missing_storage_config() {
        let broker = UploadBroker::new(Arc::new(NoCredentials));

        let err = broker
            .create_multipart(&tenant(), Some("a.txt"), Some("text/plain"), &user(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingStorageConfig(ref id) if id == "acme"));
    }

    #[tokio::test]
    async fn test_sign_single_put_uses_derived_key() {
        let broker = broker_with(Arc::new(InMemoryStorage::new()));
        let mut metadata = Map::new();

        let signed = broker
            .sign_single_put(&tenant(), Some("my photo.png"), Some("image/png"), &user(), Some(&mut metadata))
            .await
            .unwrap();

        assert_eq!(signed.method, "PUT");
        assert!(signed.fields.is_empty());
        assert!(signed
            .url
            .contains("acme/original/u-1/2024/11/2/130405000/myphoto.png"));
        assert!(signed.url.contains("X-Amz-Expires=300"));
        assert_eq!(metadata["brand"], "acme");
    }

    #[tokio::test]
    async fn test_sign_part_rejects_out_of_range_numbers() {
        let broker = broker_with(Arc::new(InMemoryStorage::new()));
        for bad in ["0", "10001", "1.5", "abc", ""] {
            let err = broker
                .sign_part(&tenant(), "upload-1", bad, Some("k"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "accepted {:?}", bad);
        }

        let signed = broker
            .sign_part(&tenant(), "upload-1", "10000", Some("k"))
            .await
            .unwrap();
        assert_eq!(signed.expires, 300);
        assert!(signed.url.contains("partNumber=10000"));
    }

    #[tokio::test]
    async fn test_key_is_required() {
        let broker = broker_with(Arc::new(InMemoryStorage::new()));
        let err = broker.abort_multipart(&tenant(), "u", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("object key")));
    }

    #[tokio::test]
    async fn test_list_parts_follows_pages_and_sorts() {
        let storage = Arc::new(InMemoryStorage::new().with_page_size(2));
        let broker = broker_with(storage.clone());
        let created = broker
            .create_multipart(&tenant(), Some("big.bin"), Some("application/octet-stream"), &user(), None)
            .await
            .unwrap();
        for n in [5, 1, 3, 2, 4] {
            storage.put_part(&created.upload_id, n, &format!("\"e{}\"", n), 1024);
        }

        let parts = broker
            .list_parts(&tenant(), &created.upload_id, Some(&created.key))
            .await
            .unwrap();

        assert_eq!(
            parts.iter().map(|p| p.part_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(storage.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_list_parts_guards_against_broken_pagination() {
        let storage = Arc::new(InMemoryStorage::new().with_pagination_fault(PaginationFault::Endless));
        let broker = broker_with(storage.clone());
        let err = broker
            .list_parts(&tenant(), "upload-x", Some("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { operation: "listParts", .. }));
        assert_eq!(storage.list_calls(), MAX_LIST_PARTS_PAGES);

        let storage = Arc::new(
            InMemoryStorage::new()
                .with_page_size(1)
                .with_pagination_fault(PaginationFault::MissingMarker),
        );
        let broker = broker_with(storage.clone());
        let created = broker
            .create_multipart(&tenant(), Some("a"), Some("b"), &user(), None)
            .await
            .unwrap();
        storage.put_part(&created.upload_id, 1, "e1", 1);
        storage.put_part(&created.upload_id, 2, "e2", 1);

        let err = broker
            .list_parts(&tenant(), &created.upload_id, Some(&created.key))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_upstream() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.fail_operation("create_multipart_upload");
        let err = broker_with(storage)
            .create_multipart(&tenant(), Some("a.txt"), Some("text/plain"), &user(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream { operation: "createMultipart", ref tenant_id, .. } if tenant_id == "acme"
        ));
    }

    #[test]
    fn test_metadata_bag_decodes_json_strings() {
        let bag = metadata_bag(Some(json!("{\"user\": {\"id\": 1}}"))).unwrap();
        assert!(bag.contains_key("user"));
        assert!(metadata_bag(Some(json!("not json"))).is_none());
        assert!(metadata_bag(Some(json!(3))).is_none());
        assert!(metadata_bag(None).is_none());
    }
}
