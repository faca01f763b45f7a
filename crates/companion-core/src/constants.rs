//! Shared constants

/// Slug list used when `COMPANION_BRANDS` is unset.
pub const DEFAULT_TENANT_LIST: &str = "default";

/// Cookie carrying the session token when no tenant override exists.
pub const DEFAULT_AUTH_COOKIE_NAME: &str = "session";

/// Cookie carrying the active project id when no tenant override exists.
pub const DEFAULT_PROJECT_COOKIE_NAME: &str = "frame_project_id";

/// Upload URL allowlist applied when a tenant does not declare one.
pub const DEFAULT_UPLOAD_URL: &str = "*";

pub const DEFAULT_PORT: u16 = 3020;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_FILE_PATH: &str = "/tmp/";
pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const MIN_SECRET_LENGTH: usize = 16;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
