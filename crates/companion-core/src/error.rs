//! Error types module
//!
//! All gateway failures are unified under [`AppError`]. Each variant describes its
//! own HTTP presentation through [`ErrorMetadata`], so the HTTP layer renders
//! every error the same way (status, code, client message, log level).

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for caller or configuration mistakes worth noticing
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TENANT_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the caller
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Tenant could not be resolved for this request")]
    TenantUnresolved,

    #[error("Storage is not configured for tenant {0}")]
    MissingStorageConfig(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No identity could be resolved for the upload key")]
    IdentityRequired,

    #[error("Upstream {operation} failed for tenant {tenant_id}: {message}")]
    Upstream {
        operation: &'static str,
        tenant_id: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Configuration(_) => (
            500,
            "CONFIGURATION_ERROR",
            false,
            Some("Contact the gateway operator"),
            true,
            LogLevel::Error,
        ),
        AppError::TenantNotFound(_) => (
            404,
            "TENANT_NOT_FOUND",
            false,
            Some("Check the brand identifier"),
            false,
            LogLevel::Debug,
        ),
        AppError::TenantUnresolved => (
            400,
            "TENANT_UNRESOLVED",
            false,
            Some("Specify a brand in the path, the brand query parameter or the x-brand header"),
            false,
            LogLevel::Debug,
        ),
        AppError::MissingStorageConfig(_) => (
            400,
            "MISSING_STORAGE_CONFIG",
            false,
            Some("Configure a bucket and credentials for this brand"),
            false,
            LogLevel::Warn,
        ),
        AppError::Unauthenticated(_) => (
            401,
            "UNAUTHENTICATED",
            false,
            Some("Provide a valid bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::IdentityRequired => (
            400,
            "IDENTITY_REQUIRED",
            false,
            Some("Authenticate or pass metadata.user with an id"),
            false,
            LogLevel::Warn,
        ),
        AppError::Upstream { .. } => (
            500,
            "UPSTREAM_FAILURE",
            true,
            Some("Retry the request"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Convenience constructor for backend failures at the broker boundary.
    pub fn upstream(
        operation: &'static str,
        tenant_id: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        AppError::Upstream {
            operation,
            tenant_id: tenant_id.into(),
            message: message.to_string(),
        }
    }

    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Configuration(_) => "Configuration",
            AppError::TenantNotFound(_) => "TenantNotFound",
            AppError::TenantUnresolved => "TenantUnresolved",
            AppError::MissingStorageConfig(_) => "MissingStorageConfig",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Validation(_) => "Validation",
            AppError::IdentityRequired => "IdentityRequired",
            AppError::Upstream { .. } => "Upstream",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Configuration(_) => "Gateway is misconfigured".to_string(),
            AppError::TenantNotFound(ref id) => format!("Unknown brand \"{}\"", id),
            AppError::TenantUnresolved => "Brand not resolved".to_string(),
            AppError::MissingStorageConfig(_) => {
                "Storage configuration is incomplete for this brand".to_string()
            }
            AppError::Unauthenticated(ref msg) => msg.clone(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::IdentityRequired => {
                "Upload requires an authenticated user or metadata.user.id".to_string()
            }
            AppError::Upstream { operation, .. } => format!("Storage {} failed", operation),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_tenant_not_found() {
        let err = AppError::TenantNotFound("acme".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "TENANT_NOT_FOUND");
        assert_eq!(err.client_message(), "Unknown brand \"acme\"");
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_error_metadata_upstream_hides_backend_message() {
        let err = AppError::upstream("createMultipart", "acme", "AccessDenied: bucket policy");
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "UPSTREAM_FAILURE");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(!err.client_message().contains("AccessDenied"));
        assert!(err.to_string().contains("acme"));
    }

    #[test]
    fn test_status_codes_for_request_errors() {
        assert_eq!(AppError::TenantUnresolved.http_status_code(), 400);
        assert_eq!(
            AppError::MissingStorageConfig("acme".into()).http_status_code(),
            400
        );
        assert_eq!(
            AppError::Unauthenticated("No token provided".into()).http_status_code(),
            401
        );
        assert_eq!(AppError::Validation("bad".into()).http_status_code(), 400);
        assert_eq!(AppError::IdentityRequired.http_status_code(), 400);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("Caused by"));
    }
}
