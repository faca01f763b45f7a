use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;
use utoipa::ToSchema;

/// Third-party file sources the provider proxy can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Dropbox,
    Facebook,
    Instagram,
    Onedrive,
    Box,
    Unsplash,
    Zoom,
}

impl Provider {
    pub const ALL: [Provider; 8] = [
        Provider::Google,
        Provider::Dropbox,
        Provider::Facebook,
        Provider::Instagram,
        Provider::Onedrive,
        Provider::Box,
        Provider::Unsplash,
        Provider::Zoom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Dropbox => "dropbox",
            Provider::Facebook => "facebook",
            Provider::Instagram => "instagram",
            Provider::Onedrive => "onedrive",
            Provider::Box => "box",
            Provider::Unsplash => "unsplash",
            Provider::Zoom => "zoom",
        }
    }

    /// Name the provider proxy engine registers this provider under.
    pub fn proxy_name(&self) -> &'static str {
        match self {
            Provider::Google => "drive",
            other => other.as_str(),
        }
    }

    /// Upper-case segment used in `COMPANION_<PROVIDER>_KEY` style variables.
    pub fn env_segment(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown provider: {}", s))
    }
}

/// OAuth client credentials for one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Object storage settings for one tenant.
///
/// `credentials: None` defers to the process-wide default AWS credential chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    pub credentials: Option<StorageCredentials>,
    pub use_accelerate_endpoint: bool,
}

impl StorageSettings {
    pub fn has_bucket(&self) -> bool {
        !self.bucket.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("Protocol must be http or https, got '{}'", other)),
        }
    }
}

/// Public address the provider proxy advertises in OAuth redirects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ServerSettings {
    pub host: String,
    pub protocol: Protocol,
    pub path: String,
}

/// Allowed browser origin: an exact string (`*` is a wildcard) or a pattern.
#[derive(Debug, Clone)]
pub enum CorsOrigin {
    Exact(String),
    Pattern(Regex),
}

impl CorsOrigin {
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            CorsOrigin::Exact(allowed) => allowed == "*" || allowed == origin,
            CorsOrigin::Pattern(re) => re.is_match(origin),
        }
    }

    /// Compile a `{regex, flags}` entry. Only the `i` flag changes matching.
    pub fn pattern(source: &str, flags: Option<&str>) -> Result<Self, regex::Error> {
        let case_insensitive = flags.map(|f| f.contains('i')).unwrap_or(false);
        let re = regex::RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(CorsOrigin::Pattern(re))
    }
}

impl PartialEq for CorsOrigin {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CorsOrigin::Exact(a), CorsOrigin::Exact(b)) => a == b,
            (CorsOrigin::Pattern(a), CorsOrigin::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for CorsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsOrigin::Exact(s) => f.write_str(s),
            CorsOrigin::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Endpoint that validates a tenant's bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEndpoint {
    Url(Url),
    /// Configured but unparseable. Every token is rejected.
    Invalid(String),
}

impl AuthEndpoint {
    pub fn as_str(&self) -> &str {
        match self {
            AuthEndpoint::Url(url) => url.as_str(),
            AuthEndpoint::Invalid(raw) => raw,
        }
    }
}

/// Identity and policy record for one brand.
///
/// Built once at boot by [`crate::tenant::build_tenant`]; never mutated afterwards.
#[derive(Clone)]
pub struct Tenant {
    pub id: String,
    pub display_name: String,
    pub auth_endpoint: Option<AuthEndpoint>,
    pub auth_cookie_name: String,
    pub project_cookie_name: String,
    pub storage: StorageSettings,
    pub providers: BTreeMap<Provider, ProviderCredentials>,
    pub cors_origins: Vec<CorsOrigin>,
    pub upload_urls: Vec<String>,
    pub secret: String,
    pub server: ServerSettings,
    pub file_path: String,
}

impl Tenant {
    /// Path every tenant-scoped route is mounted under.
    pub fn mount_path(&self) -> &str {
        &self.server.path
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_endpoint.is_some()
    }

    pub fn providers_enabled(&self) -> Vec<Provider> {
        self.providers.keys().copied().collect()
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.cors_origins.iter().any(|o| o.matches(origin))
    }
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("auth_endpoint", &self.auth_endpoint.as_ref().map(AuthEndpoint::as_str))
            .field("auth_cookie_name", &self.auth_cookie_name)
            .field("project_cookie_name", &self.project_cookie_name)
            .field("storage", &self.storage)
            .field("providers", &self.providers)
            .field("cors_origins", &self.cors_origins)
            .field("upload_urls", &self.upload_urls)
            .field("secret", &"[REDACTED]")
            .field("server", &self.server)
            .field("file_path", &self.file_path)
            .finish()
    }
}
