//! Configuration module
//!
//! Process-level settings read from the environment (and `.env` via `dotenvy`).
//! Per-tenant overrides live in JSON blobs handled by [`crate::tenant`]; this
//! module only supplies the global fallbacks those blobs are merged onto.

use crate::constants::{
    DEFAULT_BIND_HOST, DEFAULT_FILE_PATH, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT,
    DEFAULT_TENANT_LIST, DEFAULT_UPLOAD_URL, MIN_SECRET_LENGTH,
};
use crate::models::{
    CorsOrigin, Protocol, Provider, ProviderCredentials, StorageCredentials, StorageSettings,
};
use crate::tenant::TenantDefaults;
use std::collections::BTreeMap;
use std::env;
use url::Url;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_host: String,
    pub protocol: Protocol,
    pub public_host: String,
    pub secret: String,
    pub file_path: String,
    pub cors_origins: Vec<String>,
    pub brands: String,
    pub require_auth: bool,
    pub auth_url: Option<Url>,
    pub aws_bucket: Option<String>,
    pub aws_region: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_accelerate_endpoint: bool,
    pub provider_credentials: BTreeMap<Provider, ProviderCredentials>,
    pub environment: String,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

/// Parse a boolean flag the way operators write them (`true/1/yes/y/on`).
pub fn parse_bool(value: Option<&str>, fallback: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) if !v.is_empty() => matches!(v.as_str(), "true" | "1" | "yes" | "y" | "on"),
        _ => fallback,
    }
}

fn parse_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("COMPANION_PORT").or_else(|| get("PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("COMPANION_PORT must be a valid port number"))?,
            None => DEFAULT_PORT,
        };

        let protocol = get("COMPANION_PROTOCOL")
            .map(|raw| raw.parse::<Protocol>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("COMPANION_PROTOCOL: {}", e))?
            .unwrap_or_default();

        let auth_url = get("AUTH_URL")
            .map(|raw| Url::parse(raw.trim()))
            .transpose()
            .map_err(|e| anyhow::anyhow!("AUTH_URL must be a valid URL: {}", e))?;

        let mut provider_credentials = BTreeMap::new();
        for provider in Provider::ALL {
            let segment = provider.env_segment();
            let key = get(&format!("COMPANION_{}_KEY", segment));
            let secret = get(&format!("COMPANION_{}_SECRET", segment));
            if let (Some(key), Some(secret)) = (key, secret) {
                provider_credentials.insert(provider, ProviderCredentials { key, secret });
            }
        }

        let log_format = match get("LOG_FORMAT").map(|v| v.to_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = Config {
            port,
            bind_host: get("COMPANION_BIND_HOST")
                .or_else(|| get("HOST"))
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            protocol,
            public_host: get("COMPANION_HOST").unwrap_or_else(|| format!("localhost:{}", port)),
            secret: get("COMPANION_SECRET").unwrap_or_default(),
            file_path: get("COMPANION_FILE_PATH").unwrap_or_else(|| DEFAULT_FILE_PATH.to_string()),
            cors_origins: parse_csv(get("CORS_ALLOWED_ORIGINS")),
            brands: get("COMPANION_BRANDS").unwrap_or_else(|| DEFAULT_TENANT_LIST.to_string()),
            require_auth: parse_bool(get("COMPANION_REQUIRE_AUTH").as_deref(), false),
            auth_url,
            aws_bucket: get("AWS_BUCKET_NAME"),
            aws_region: get("AWS_REGION"),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_accelerate_endpoint: parse_bool(
                get("COMPANION_AWS_ACCELERATE_ENDPOINT").as_deref(),
                false,
            ),
            provider_credentials,
            environment: get("ENVIRONMENT")
                .or_else(|| get("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            max_body_bytes: get("MAX_BODY_BYTES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.port == 0 {
            return Err(anyhow::anyhow!("COMPANION_PORT must be greater than 0"));
        }

        if self.secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(anyhow::anyhow!(
                "COMPANION_SECRET must be at least {} characters",
                MIN_SECRET_LENGTH
            ));
        }

        if self.file_path.trim().is_empty() {
            return Err(anyhow::anyhow!("COMPANION_FILE_PATH cannot be empty"));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ALLOWED_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Global storage settings tenants inherit when their blob has no `s3` section.
    pub fn storage_defaults(&self) -> StorageSettings {
        let credentials = match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StorageCredentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            }),
            _ => None,
        };

        StorageSettings {
            bucket: self.aws_bucket.clone().unwrap_or_default(),
            region: self.aws_region.clone().unwrap_or_default(),
            credentials,
            use_accelerate_endpoint: self.aws_accelerate_endpoint,
        }
    }

    pub fn tenant_defaults(&self) -> TenantDefaults {
        TenantDefaults {
            host: self.public_host.clone(),
            protocol: self.protocol,
            secret: self.secret.clone(),
            file_path: self.file_path.clone(),
            cors_origins: self
                .cors_origins
                .iter()
                .cloned()
                .map(CorsOrigin::Exact)
                .collect(),
            upload_urls: vec![DEFAULT_UPLOAD_URL.to_string()],
            auth_endpoint: self.auth_url.clone(),
            storage: self.storage_defaults(),
            providers: self.provider_credentials.clone(),
        }
    }
}
