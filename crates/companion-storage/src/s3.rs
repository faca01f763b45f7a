use crate::traits::{
    CompletedPartRef, MultipartUpload, ObjectStorage, PartsPage, StorageError, StorageResult,
    UploadedPart,
};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::{Credentials, ProvideCredentials};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use companion_core::constants::DEFAULT_S3_REGION;
use companion_core::{StorageCredentials, StorageSettings};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

/// S3 storage implementation
///
/// One client may serve many tenants: region and transfer acceleration are
/// applied per request through a config override.
#[derive(Clone, Debug)]
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Client backed by the process-wide default credential chain (env,
    /// profile, container or instance role).
    ///
    /// Returns `None` when the chain resolves no credentials.
    pub async fn from_default_chain(region: Option<&str>) -> Option<Self> {
        let region_provider = RegionProviderChain::first_try(
            region
                .filter(|r| !r.is_empty())
                .map(|r| Region::new(r.to_string())),
        )
        .or_default_provider()
        .or_else(Region::new(DEFAULT_S3_REGION));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .load()
            .await;

        Self::from_sdk_config(&config).await
    }

    /// Client for `config`, provided its credentials provider yields credentials now.
    pub async fn from_sdk_config(config: &SdkConfig) -> Option<Self> {
        let Some(provider) = config.credentials_provider() else {
            tracing::warn!("No AWS credentials provider available for the default S3 client");
            return None;
        };

        if let Err(e) = provider.provide_credentials().await {
            tracing::warn!(
                error = %DisplayErrorContext(&e),
                "Default AWS credential chain resolved no credentials"
            );
            return None;
        }

        tracing::info!("Using default AWS credential chain for S3");
        Some(Self::from_client(Client::new(config)))
    }

    /// Client pinned to one tenant's explicit access key.
    pub fn with_credentials(region: &str, credentials: &StorageCredentials) -> Self {
        let region = if region.is_empty() {
            DEFAULT_S3_REGION
        } else {
            region
        };

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "companion-tenant",
            ))
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .build();

        Self::from_client(Client::from_conf(config))
    }

    fn overrides(target: &StorageSettings) -> aws_sdk_s3::config::Builder {
        let mut builder = aws_sdk_s3::config::Builder::default();
        if !target.region.is_empty() {
            builder = builder.region(Region::new(target.region.clone()));
        }
        builder.accelerate(target.use_accelerate_endpoint)
    }

    fn presigning(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::PresignFailed(e.to_string()))
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn presign_put(
        &self,
        target: &StorageSettings,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&target.bucket)
            .key(key)
            .content_type(content_type)
            .customize()
            .config_override(Self::overrides(target))
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %target.bucket,
                    key = %key,
                    "S3 presign put failed"
                );
                StorageError::PresignFailed(e.to_string())
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn create_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        content_type: &str,
    ) -> StorageResult<MultipartUpload> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .create_multipart_upload()
            .bucket(&target.bucket)
            .key(key)
            .content_type(content_type)
            .customize()
            .config_override(Self::overrides(target))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %target.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 create multipart upload failed"
                );
                StorageError::BackendError(e.to_string())
            })?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StorageError::InvalidResponse("No upload ID returned from S3".to_string()))?
            .to_string();

        tracing::info!(
            bucket = %target.bucket,
            key = %key,
            upload_id = %upload_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload created"
        );

        Ok(MultipartUpload {
            key: output.key().unwrap_or(key).to_string(),
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
        let presigned = self
            .client
            .upload_part()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .customize()
            .config_override(Self::overrides(target))
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %target.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    part_number = part_number,
                    "S3 presign upload part failed"
                );
                StorageError::PresignFailed(e.to_string())
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn list_parts_page(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        part_number_marker: Option<&str>,
    ) -> StorageResult<PartsPage> {
        let output = self
            .client
            .list_parts()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .set_part_number_marker(part_number_marker.map(str::to_string))
            .customize()
            .config_override(Self::overrides(target))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %target.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    "S3 list parts failed"
                );
                StorageError::BackendError(e.to_string())
            })?;

        let parts = output
            .parts()
            .iter()
            .filter_map(|part| {
                Some(UploadedPart {
                    part_number: part.part_number()?,
                    e_tag: part.e_tag()?.to_string(),
                    size: part.size().unwrap_or_default(),
                    last_modified: part.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        Ok(PartsPage {
            parts,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_part_number_marker: output.next_part_number_marker().map(str::to_string),
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartRef],
    ) -> StorageResult<Option<String>> {
        let start = std::time::Instant::now();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|p| {
                        CompletedPart::builder()
                            .part_number(p.part_number)
                            .e_tag(&p.e_tag)
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .customize()
            .config_override(Self::overrides(target))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %target.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    parts = parts.len(),
                    "S3 complete multipart upload failed"
                );
                StorageError::BackendError(e.to_string())
            })?;

        tracing::info!(
            bucket = %target.bucket,
            key = %key,
            parts = parts.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload completed"
        );

        Ok(output.location().map(str::to_string))
    }

    async fn abort_multipart_upload(
        &self,
        target: &StorageSettings,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .customize()
            .config_override(Self::overrides(target))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %target.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    "S3 abort multipart upload failed"
                );
                StorageError::BackendError(e.to_string())
            })?;

        tracing::info!(bucket = %target.bucket, key = %key, upload_id = %upload_id, "S3 multipart upload aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::credential_fn::provide_credentials_fn;
    use aws_credential_types::provider::error::CredentialsError;
    use aws_sdk_s3::config::SharedCredentialsProvider;

    fn target() -> StorageSettings {
        StorageSettings {
            bucket: "acme-uploads".into(),
            region: "eu-west-1".into(),
            credentials: None,
            use_accelerate_endpoint: false,
        }
    }

    fn storage() -> S3Storage {
        S3Storage::with_credentials(
            "us-east-1",
            &StorageCredentials {
                access_key_id: "AKIDEXAMPLE".into(),
                secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_presign_put_is_offline_and_scoped_to_key() {
        let url = storage()
            .presign_put(&target(), "acme/original/u/a.png", "image/png", Duration::from_secs(300))
            .await
            .unwrap();

        assert!(url.contains("acme-uploads"));
        assert!(url.contains("acme/original/u/a.png"));
        assert!(url.contains("X-Amz-Expires=300"));
        assert!(url.contains("eu-west-1"));
    }

    #[tokio::test]
    async fn test_presign_upload_part_carries_part_number_and_upload_id() {
        let url = storage()
            .presign_upload_part(&target(), "k", "upload-123", 7, Duration::from_secs(300))
            .await
            .unwrap();

        assert!(url.contains("partNumber=7"));
        assert!(url.contains("uploadId=upload-123"));
    }

    fn sdk_config(provider: SharedCredentialsProvider) -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .credentials_provider(provider)
            .build()
    }

    #[tokio::test]
    async fn test_unresolvable_credentials_yield_no_client() {
        let failing = provide_credentials_fn(|| async {
            Err(CredentialsError::not_loaded_no_source())
        });
        assert!(S3Storage::from_sdk_config(&sdk_config(SharedCredentialsProvider::new(failing)))
            .await
            .is_none());

        let no_provider = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .build();
        assert!(S3Storage::from_sdk_config(&no_provider).await.is_none());
    }

    #[tokio::test]
    async fn test_resolvable_credentials_yield_a_client() {
        let static_creds = Credentials::new("AKIDEXAMPLE", "secret", None, None, "test");
        assert!(S3Storage::from_sdk_config(&sdk_config(SharedCredentialsProvider::new(static_creds)))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_accelerate_endpoint_override() {
        let mut settings = target();
        settings.use_accelerate_endpoint = true;
        let url = storage()
            .presign_put(&settings, "k", "text/plain", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(url.contains("s3-accelerate"));
    }
}
