//! Offline check of the brand configuration the gateway would boot with.
//!
//! Tenants are built through the same [`TenantRegistry::register`] path as the
//! server, then each raw blob is inspected again for entries the builder
//! silently ignores or replaces with defaults.

use companion_core::tenant::tenant_config_key;
use companion_core::{
    AppError, AuthEndpoint, Config, Provider, Tenant, TenantConfigSource, TenantRegistry,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// Stands in for `COMPANION_SECRET` when it is unset. Nothing is signed during a check.
pub const PLACEHOLDER_SECRET: &str = "verify-brands-placeholder-secret";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandReport {
    pub id: String,
    pub display_name: String,
    /// Environment variable the brand's JSON blob is read from.
    pub config_key: String,
    pub auth_url: Option<String>,
    pub public_backend_url: String,
    pub active_providers: Vec<String>,
    pub bucket: Option<String>,
    pub issues: Vec<String>,
}

impl BrandReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Load process configuration, tolerating a missing secret.
pub fn load_config<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    Config::from_lookup(|key| {
        let value = lookup(key);
        if key == "COMPANION_SECRET" && value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Some(PLACEHOLDER_SECRET.to_string());
        }
        value
    })
}

pub fn verify_brands(
    config: &Config,
    source: &dyn TenantConfigSource,
) -> Result<Vec<BrandReport>, AppError> {
    let registry = TenantRegistry::register(&config.brands, source, &config.tenant_defaults())?;
    Ok(registry
        .all()
        .iter()
        .map(|tenant| report(tenant, source))
        .collect())
}

fn report(tenant: &Tenant, source: &dyn TenantConfigSource) -> BrandReport {
    let config_key = tenant_config_key(&tenant.id);

    let mut issues = Vec::new();
    if let Some(AuthEndpoint::Invalid(raw)) = &tenant.auth_endpoint {
        issues.push(format!(
            "authUrl {:?} is not a valid URL, every token will be rejected",
            raw
        ));
    }
    if let Some(raw) = source.tenant_blob(&config_key) {
        issues.extend(blob_issues(&config_key, &raw));
    }

    let server = &tenant.server;
    BrandReport {
        id: tenant.id.clone(),
        display_name: tenant.display_name.clone(),
        auth_url: tenant
            .auth_endpoint
            .as_ref()
            .map(|endpoint| endpoint.as_str().to_string()),
        public_backend_url: format!("{}://{}{}", server.protocol.as_str(), server.host, server.path),
        active_providers: tenant
            .providers_enabled()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        bucket: tenant
            .storage
            .has_bucket()
            .then(|| tenant.storage.bucket.clone()),
        config_key,
        issues,
    }
}

fn has_text(entry: &Value, field: &str) -> bool {
    entry
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn blob_issues(config_key: &str, raw: &str) -> Vec<String> {
    let blob = match serde_json::from_str::<Value>(raw) {
        Ok(blob @ Value::Object(_)) => blob,
        Ok(_) => return vec![format!("{} is not a JSON object", config_key)],
        Err(_) => return vec![format!("Invalid JSON in env var {}", config_key)],
    };

    let mut issues = Vec::new();

    if let Some(providers) = blob.get("providers").and_then(Value::as_object) {
        let mut invalid = Vec::new();
        for (name, entry) in providers {
            if entry.is_null() {
                continue;
            }
            if name.parse::<Provider>().is_err() {
                invalid.push(format!("{} (unknown provider)", name));
                continue;
            }
            let missing: Vec<String> = ["key", "secret"]
                .into_iter()
                .filter(|field| !has_text(entry, field))
                .map(|field| format!("missing {}", field))
                .collect();
            if !missing.is_empty() {
                invalid.push(format!("{} ({})", name, missing.join(", ")));
            }
        }
        if !invalid.is_empty() {
            issues.push(format!("Provider config issues: {}", invalid.join("; ")));
        }
    }

    if let Some(s3) = blob.get("s3").filter(|s3| s3.is_object()) {
        let missing: Vec<&str> = ["bucket", "region"]
            .into_iter()
            .filter(|field| !has_text(s3, field))
            .collect();
        if !missing.is_empty() {
            let missing: Vec<String> = missing.iter().map(|f| format!("{} missing", f)).collect();
            issues.push(format!("S3 config issues: {}", missing.join(", ")));
        }
    }

    issues
}

/// Human-readable report, one block per brand.
pub fn render_text(reports: &[BrandReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Found {} brand(s) configured:", reports.len());

    for report in reports {
        let providers = if report.active_providers.is_empty() {
            "(None)".to_string()
        } else {
            report.active_providers.join(", ")
        };

        let _ = writeln!(out);
        let _ = writeln!(out, "[Brand: {}]", report.id);
        let _ = writeln!(out, "  - Name: {}", report.display_name);
        let _ = writeln!(
            out,
            "  - Auth URL: {}",
            report.auth_url.as_deref().unwrap_or("(Not configured)")
        );
        let _ = writeln!(out, "  - Public Backend: {}", report.public_backend_url);
        let _ = writeln!(out, "  - Active Providers: {}", providers);
        let _ = writeln!(
            out,
            "  - S3 Bucket: {}",
            report.bucket.as_deref().unwrap_or("(Global Default/None)")
        );
        for issue in &report.issues {
            let _ = writeln!(out, "  ! {}", issue);
        }
    }

    out
}
