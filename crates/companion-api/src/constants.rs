//! HTTP surface constants.

use std::time::Duration;

/// Base path of the tenant-scoped API, relative to a tenant mount (`/{slug}`).
pub const API_BASE: &str = "/api";

/// Lifetime of every presigned URL the broker hands out.
pub const SIGNED_URL_EXPIRES_SECS: u64 = 300;

/// S3 accepts part numbers in `1..=10000`.
pub const MIN_PART_NUMBER: i64 = 1;
pub const MAX_PART_NUMBER: i64 = 10_000;

/// Upper bound on ListParts round trips for one listing. With 1000 parts per
/// page a complete 10000-part upload needs 10.
pub const MAX_LIST_PARTS_PAGES: usize = 100;

/// Timeout for the call to a tenant's auth endpoint.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameter carrying a bearer token when no header or cookie is present.
pub const BEARER_TOKEN_QUERY: &str = "bearerToken";

/// Query parameter and header naming the tenant on unscoped routes.
pub const BRAND_QUERY: &str = "brand";
pub const BRAND_HEADER: &str = "x-brand";
