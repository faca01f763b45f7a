//! Pure construction of a [`Tenant`] from its configuration blob.

use super::slug::normalize_slug;
use crate::constants::{
    DEFAULT_AUTH_COOKIE_NAME, DEFAULT_FILE_PATH, DEFAULT_PROJECT_COOKIE_NAME, DEFAULT_UPLOAD_URL,
};
use crate::models::{
    AuthEndpoint, CorsOrigin, Protocol, Provider, ProviderCredentials, ServerSettings, StorageCredentials,
    StorageSettings, Tenant,
};
use crate::AppError;
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

/// Process-wide fallbacks applied to every tenant field its blob leaves unset.
#[derive(Debug, Clone)]
pub struct TenantDefaults {
    pub host: String,
    pub protocol: Protocol,
    pub secret: String,
    pub file_path: String,
    pub cors_origins: Vec<CorsOrigin>,
    pub upload_urls: Vec<String>,
    pub auth_endpoint: Option<Url>,
    pub storage: StorageSettings,
    pub providers: BTreeMap<Provider, ProviderCredentials>,
}

impl Default for TenantDefaults {
    fn default() -> Self {
        Self {
            host: "localhost:3020".to_string(),
            protocol: Protocol::Http,
            secret: String::new(),
            file_path: DEFAULT_FILE_PATH.to_string(),
            cors_origins: Vec::new(),
            upload_urls: vec![DEFAULT_UPLOAD_URL.to_string()],
            auth_endpoint: None,
            storage: StorageSettings::default(),
            providers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantConfigBlob {
    display_name: Option<String>,
    auth_url: Option<String>,
    auth_cookie_name: Option<String>,
    project_cookie_name: Option<String>,
    cors_origins: Option<Vec<serde_json::Value>>,
    upload_urls: Option<Vec<String>>,
    secret: Option<String>,
    host: Option<String>,
    protocol: Option<String>,
    file_path: Option<String>,
    s3: Option<S3Blob>,
    providers: Option<BTreeMap<String, ProviderBlob>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Blob {
    bucket: Option<String>,
    region: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    use_accelerate_endpoint: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderBlob {
    key: Option<String>,
    secret: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_blob(slug: &str, raw: Option<&str>) -> TenantConfigBlob {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return TenantConfigBlob::default();
    };

    match serde_json::from_str::<TenantConfigBlob>(raw) {
        Ok(blob) => blob,
        Err(e) => {
            tracing::warn!(
                tenant_id = %slug,
                error = %e,
                "Invalid tenant configuration JSON, falling back to defaults"
            );
            TenantConfigBlob::default()
        }
    }
}

fn parse_cors_entry(slug: &str, entry: &serde_json::Value) -> Option<CorsOrigin> {
    match entry {
        serde_json::Value::String(s) => Some(CorsOrigin::Exact(s.clone())),
        serde_json::Value::Object(map) => {
            let source = map.get("regex").and_then(|v| v.as_str())?;
            let flags = map.get("flags").and_then(|v| v.as_str());
            match CorsOrigin::pattern(source, flags) {
                Ok(origin) => Some(origin),
                Err(e) => {
                    tracing::warn!(tenant_id = %slug, pattern = %source, error = %e, "Dropping invalid CORS origin pattern");
                    None
                }
            }
        }
        _ => {
            tracing::warn!(tenant_id = %slug, entry = %entry, "Dropping unsupported CORS origin entry");
            None
        }
    }
}

fn build_storage(slug: &str, blob: Option<S3Blob>, defaults: &StorageSettings) -> StorageSettings {
    let blob = blob.unwrap_or_default();

    let credentials = match (non_empty(blob.access_key), non_empty(blob.secret_key)) {
        (Some(access_key_id), Some(secret_access_key)) => Some(StorageCredentials {
            access_key_id,
            secret_access_key,
        }),
        (None, None) => defaults.credentials.clone(),
        _ => {
            tracing::warn!(
                tenant_id = %slug,
                "Tenant s3 config sets only one of accessKey/secretKey, using default credentials"
            );
            defaults.credentials.clone()
        }
    };

    StorageSettings {
        bucket: non_empty(blob.bucket).unwrap_or_else(|| defaults.bucket.clone()),
        region: non_empty(blob.region).unwrap_or_else(|| defaults.region.clone()),
        credentials,
        use_accelerate_endpoint: blob
            .use_accelerate_endpoint
            .unwrap_or(defaults.use_accelerate_endpoint),
    }
}

fn build_providers(
    slug: &str,
    blob: Option<BTreeMap<String, ProviderBlob>>,
    defaults: &BTreeMap<Provider, ProviderCredentials>,
) -> BTreeMap<Provider, ProviderCredentials> {
    let mut providers = defaults.clone();

    for (name, entry) in blob.unwrap_or_default() {
        let provider = match name.parse::<Provider>() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(tenant_id = %slug, provider = %name, "Ignoring unknown provider");
                continue;
            }
        };

        match (non_empty(entry.key), non_empty(entry.secret)) {
            (Some(key), Some(secret)) => {
                providers.insert(provider, ProviderCredentials { key, secret });
            }
            _ => {
                tracing::warn!(
                    tenant_id = %slug,
                    provider = %provider,
                    "Provider entry is missing key or secret, keeping global credentials"
                );
            }
        }
    }

    providers
}

/// Build one tenant from its slug, optional raw JSON blob and the global defaults.
///
/// A malformed blob is not fatal: it is logged and the tenant is built from
/// `defaults`. A present but unparseable `authUrl` keeps the tenant behind an
/// [`AuthEndpoint::Invalid`] endpoint, so its requests fail closed.
pub fn build_tenant(
    slug: &str,
    raw_blob: Option<&str>,
    defaults: &TenantDefaults,
) -> Result<Tenant, AppError> {
    let id = normalize_slug(slug);
    if id.is_empty() {
        return Err(AppError::Configuration(format!(
            "Tenant slug '{}' is empty after normalization",
            slug
        )));
    }

    let blob = parse_blob(&id, raw_blob);

    let auth_endpoint = match non_empty(blob.auth_url) {
        Some(raw) => Some(match Url::parse(raw.trim()) {
            Ok(url) => AuthEndpoint::Url(url),
            Err(e) => {
                tracing::warn!(
                    tenant_id = %id,
                    auth_url = %raw,
                    error = %e,
                    "Invalid authUrl, every token for this tenant will be rejected"
                );
                AuthEndpoint::Invalid(raw)
            }
        }),
        None => defaults.auth_endpoint.clone().map(AuthEndpoint::Url),
    };

    let protocol = match non_empty(blob.protocol) {
        Some(raw) => raw.parse::<Protocol>().unwrap_or_else(|e| {
            tracing::warn!(tenant_id = %id, error = %e, "Invalid protocol, using default");
            defaults.protocol
        }),
        None => defaults.protocol,
    };

    let cors_origins = match blob.cors_origins {
        Some(entries) => entries
            .iter()
            .filter_map(|entry| parse_cors_entry(&id, entry))
            .collect(),
        None => defaults.cors_origins.clone(),
    };

    let upload_urls = match blob.upload_urls {
        Some(urls) => urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect(),
        None => defaults.upload_urls.clone(),
    };

    Ok(Tenant {
        display_name: non_empty(blob.display_name).unwrap_or_else(|| id.clone()),
        auth_endpoint,
        auth_cookie_name: non_empty(blob.auth_cookie_name)
            .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string()),
        project_cookie_name: non_empty(blob.project_cookie_name)
            .unwrap_or_else(|| DEFAULT_PROJECT_COOKIE_NAME.to_string()),
        storage: build_storage(&id, blob.s3, &defaults.storage),
        providers: build_providers(&id, blob.providers, &defaults.providers),
        cors_origins,
        upload_urls,
        secret: non_empty(blob.secret).unwrap_or_else(|| defaults.secret.clone()),
        server: ServerSettings {
            host: non_empty(blob.host).unwrap_or_else(|| defaults.host.clone()),
            protocol,
            path: format!("/{}", id),
        },
        file_path: non_empty(blob.file_path).unwrap_or_else(|| defaults.file_path.clone()),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> TenantDefaults {
        let mut providers = BTreeMap::new();
        providers.insert(
            Provider::Dropbox,
            ProviderCredentials {
                key: "global-dbx".into(),
                secret: "global-dbx-secret".into(),
            },
        );
        TenantDefaults {
            host: "companion.example.com".into(),
            protocol: Protocol::Https,
            secret: "global-secret-0123456789".into(),
            file_path: "/var/tmp/".into(),
            cors_origins: vec![CorsOrigin::Exact("https://app.example.com".into())],
            storage: StorageSettings {
                bucket: "global-bucket".into(),
                region: "eu-west-1".into(),
                credentials: None,
                use_accelerate_endpoint: false,
            },
            providers,
            ..TenantDefaults::default()
        }
    }

    #[test]
    fn test_build_tenant_without_blob_uses_defaults() {
        let tenant = build_tenant("Acme", None, &defaults()).unwrap();
        assert_eq!(tenant.id, "acme");
        assert_eq!(tenant.display_name, "acme");
        assert_eq!(tenant.mount_path(), "/acme");
        assert_eq!(tenant.server.host, "companion.example.com");
        assert_eq!(tenant.server.protocol, Protocol::Https);
        assert_eq!(tenant.auth_cookie_name, "session");
        assert_eq!(tenant.project_cookie_name, "frame_project_id");
        assert_eq!(tenant.upload_urls, vec!["*".to_string()]);
        assert_eq!(tenant.storage.bucket, "global-bucket");
        assert!(tenant.auth_endpoint.is_none());
        assert_eq!(tenant.providers_enabled(), vec![Provider::Dropbox]);
    }

    #[test]
    fn test_build_tenant_applies_blob_overrides() {
        let blob = r#"{
            "displayName": "Acme Inc",
            "authUrl": "https://auth.acme.com/me",
            "authCookieName": "acme_session",
            "corsOrigins": ["https://acme.com", {"regex": "^https://.*\\.acme\\.com$", "flags": "i"}],
            "uploadUrls": ["https://tus.acme.com", " "],
            "s3": {"bucket": "acme-uploads", "region": "us-west-2", "accessKey": "AK", "secretKey": "SK", "useAccelerateEndpoint": true},
            "providers": {"google": {"key": "gk", "secret": "gs"}}
        }"#;
        let tenant = build_tenant("acme", Some(blob), &defaults()).unwrap();

        assert_eq!(tenant.display_name, "Acme Inc");
        assert_eq!(
            tenant.auth_endpoint.as_ref().map(AuthEndpoint::as_str),
            Some("https://auth.acme.com/me")
        );
        assert_eq!(tenant.auth_cookie_name, "acme_session");
        assert_eq!(tenant.cors_origins.len(), 2);
        assert!(tenant.allows_origin("https://WWW.acme.com"));
        assert!(!tenant.allows_origin("https://app.example.com"));
        assert_eq!(tenant.upload_urls, vec!["https://tus.acme.com".to_string()]);
        assert_eq!(tenant.storage.bucket, "acme-uploads");
        assert_eq!(tenant.storage.region, "us-west-2");
        assert!(tenant.storage.use_accelerate_endpoint);
        assert_eq!(
            tenant.storage.credentials.as_ref().map(|c| c.access_key_id.as_str()),
            Some("AK")
        );
        assert_eq!(
            tenant.providers_enabled(),
            vec![Provider::Google, Provider::Dropbox]
        );
    }

    #[test]
    fn test_malformed_blob_falls_back_to_defaults() {
        let tenant = build_tenant("beta", Some("{not json"), &defaults()).unwrap();
        assert_eq!(tenant.id, "beta");
        assert_eq!(tenant.secret, "global-secret-0123456789");
        assert_eq!(tenant.file_path, "/var/tmp/");
        assert_eq!(tenant.server.host, "companion.example.com");
        assert_eq!(tenant.cors_origins, defaults().cors_origins);
        assert!(tenant.providers.contains_key(&Provider::Dropbox));
    }

    #[test]
    fn test_invalid_auth_url_keeps_auth_enabled() {
        let tenant = build_tenant("acme", Some(r#"{"authUrl": "not a url"}"#), &defaults()).unwrap();
        assert_eq!(
            tenant.auth_endpoint,
            Some(AuthEndpoint::Invalid("not a url".to_string()))
        );
        assert!(tenant.auth_enabled());
    }

    #[test]
    fn test_incomplete_provider_entry_is_ignored() {
        let blob = r#"{"providers": {"dropbox": {"key": "only-key"}, "myspace": {"key": "k", "secret": "s"}}}"#;
        let tenant = build_tenant("acme", Some(blob), &defaults()).unwrap();
        assert_eq!(tenant.providers[&Provider::Dropbox].key, "global-dbx");
        assert_eq!(tenant.providers.len(), 1);
    }

    #[test]
    fn test_invalid_cors_pattern_is_dropped() {
        let blob = r#"{"corsOrigins": [{"regex": "("}, "https://ok.example", 7]}"#;
        let tenant = build_tenant("acme", Some(blob), &defaults()).unwrap();
        assert_eq!(
            tenant.cors_origins,
            vec![CorsOrigin::Exact("https://ok.example".into())]
        );
    }

    #[test]
    fn test_empty_slug_is_rejected() {
        assert!(build_tenant("   ", None, &defaults()).is_err());
    }
}
