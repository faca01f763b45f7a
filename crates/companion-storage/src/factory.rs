//! Resolution of a tenant to the storage backend that serves it.

#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use companion_core::Tenant;
#[cfg(feature = "storage-s3")]
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "storage-s3")]
use tokio::sync::OnceCell;

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Backend for `tenant`, or `ConfigError` when no credentials can be resolved.
    async fn storage_for(&self, tenant: &Tenant) -> StorageResult<Arc<dyn ObjectStorage>>;
}

/// Serves every tenant from one backend.
#[derive(Clone)]
pub struct StaticStorageProvider {
    storage: Arc<dyn ObjectStorage>,
}

impl StaticStorageProvider {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StorageProvider for StaticStorageProvider {
    async fn storage_for(&self, _tenant: &Tenant) -> StorageResult<Arc<dyn ObjectStorage>> {
        Ok(Arc::clone(&self.storage))
    }
}

/// S3 clients for the registry.
///
/// Tenants with explicit credentials get their own client, built at startup.
/// All other tenants share one default-chain client, created on first use and
/// at most once even under concurrent first requests.
#[cfg(feature = "storage-s3")]
pub struct S3StorageProvider {
    explicit: HashMap<String, Arc<S3Storage>>,
    default_client: OnceCell<Option<Arc<S3Storage>>>,
    default_region: Option<String>,
}

#[cfg(feature = "storage-s3")]
impl S3StorageProvider {
    pub fn new<'a>(
        tenants: impl IntoIterator<Item = &'a Arc<Tenant>>,
        default_region: Option<String>,
    ) -> Self {
        let explicit = tenants
            .into_iter()
            .filter_map(|tenant| {
                let credentials = tenant.storage.credentials.as_ref()?;
                tracing::info!(tenant_id = %tenant.id, "Using explicit S3 credentials for tenant");
                Some((
                    tenant.id.clone(),
                    Arc::new(S3Storage::with_credentials(&tenant.storage.region, credentials)),
                ))
            })
            .collect();

        Self {
            explicit,
            default_client: OnceCell::new(),
            default_region,
        }
    }

    async fn default_client(&self) -> Option<Arc<S3Storage>> {
        self.default_client
            .get_or_init(|| async {
                S3Storage::from_default_chain(self.default_region.as_deref())
                    .await
                    .map(Arc::new)
            })
            .await
            .clone()
    }
}

#[cfg(feature = "storage-s3")]
#[async_trait]
impl StorageProvider for S3StorageProvider {
    async fn storage_for(&self, tenant: &Tenant) -> StorageResult<Arc<dyn ObjectStorage>> {
        if let Some(storage) = self.explicit.get(&tenant.id) {
            return Ok(Arc::clone(storage) as Arc<dyn ObjectStorage>);
        }

        match self.default_client().await {
            Some(storage) => Ok(storage as Arc<dyn ObjectStorage>),
            None => Err(StorageError::ConfigError(format!(
                "No S3 credentials resolvable for tenant {}",
                tenant.id
            ))),
        }
    }
}

#[cfg(all(test, feature = "storage-s3"))]
mod tests {
    use super::*;
    use companion_core::tenant::{build_tenant, TenantDefaults};

    #[tokio::test]
    async fn test_explicit_credentials_get_a_dedicated_client() {
        let blob = r#"{"s3": {"bucket": "b", "region": "eu-west-1", "accessKey": "AK", "secretKey": "SK"}}"#;
        let tenant = Arc::new(build_tenant("acme", Some(blob), &TenantDefaults::default()).unwrap());
        let provider = S3StorageProvider::new([&tenant], None);

        assert!(provider.explicit.contains_key("acme"));
        assert!(provider.storage_for(&tenant).await.is_ok());
        assert!(provider.default_client.get().is_none());
    }

    #[tokio::test]
    async fn test_no_default_credentials_is_a_config_error() {
        let tenant = Arc::new(
            build_tenant("beta", Some(r#"{"s3": {"bucket": "b"}}"#), &TenantDefaults::default())
                .unwrap(),
        );
        let provider = S3StorageProvider {
            explicit: HashMap::new(),
            default_client: OnceCell::new_with(Some(None)),
            default_region: None,
        };

        let err = provider.storage_for(&tenant).await.err().unwrap();
        assert!(matches!(err, StorageError::ConfigError(ref m) if m.contains("beta")));
    }
}
