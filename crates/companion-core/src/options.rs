//! Options handed to the OAuth provider proxy for each tenant.
//!
//! The proxy engine itself is an external collaborator. Its whole contract with
//! the gateway is this value: provider credentials plus the tenant's server,
//! CORS and storage settings, rendered in the camelCase shape it expects.

use crate::models::{ServerSettings, Tenant};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOptions {
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Options {
    pub bucket: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub use_accelerate_endpoint: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionOptions {
    /// Keyed by the proxy's provider name (`drive` for Google).
    pub provider_options: BTreeMap<&'static str, ProviderOptions>,
    pub server: ServerSettings,
    pub file_path: String,
    pub secret: String,
    pub upload_urls: Vec<String>,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Options>,
}

pub fn companion_options(tenant: &Tenant) -> CompanionOptions {
    let provider_options = tenant
        .providers
        .iter()
        .map(|(provider, creds)| {
            (
                provider.proxy_name(),
                ProviderOptions {
                    key: creds.key.clone(),
                    secret: creds.secret.clone(),
                },
            )
        })
        .collect();

    let storage = &tenant.storage;
    let s3 = (storage.has_bucket() && !storage.region.is_empty()).then(|| S3Options {
        bucket: storage.bucket.clone(),
        region: storage.region.clone(),
        key: storage.credentials.as_ref().map(|c| c.access_key_id.clone()),
        secret: storage
            .credentials
            .as_ref()
            .map(|c| c.secret_access_key.clone()),
        use_accelerate_endpoint: storage.use_accelerate_endpoint,
    });

    CompanionOptions {
        provider_options,
        server: tenant.server.clone(),
        file_path: tenant.file_path.clone(),
        secret: tenant.secret.clone(),
        upload_urls: tenant.upload_urls.clone(),
        cors_origins: tenant.cors_origins.iter().map(ToString::to_string).collect(),
        s3,
    }
}
