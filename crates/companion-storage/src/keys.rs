//! Storage key generation for uploads.
//!
//! Key format: `{tenant}/original/{identity}/{year}/{month}/{day}/{HHMMSSmmm}/{filename}`.
//! Month and day are not zero-padded; the time segment is. Two uploads by the
//! same identity with the same filename in the same millisecond get the same key.

use chrono::{DateTime, Datelike, Timelike, Utc};
use companion_core::{normalize_slug, AppError, Identity};
use serde_json::{Map, Value};

const MAX_FILENAME_LEN: usize = 255;
const UNTITLED: &str = "untitled";

/// Strip everything outside `[A-Za-z0-9._-]`, truncate to 255 characters and
/// fall back to `untitled` when nothing is left.
pub fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_FILENAME_LEN)
        .collect();

    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identity id carried by `metadata.user`, either a JSON-encoded object or an object.
fn metadata_user_id(metadata: Option<&Map<String, Value>>) -> Option<String> {
    let user = metadata?.get("user")?;
    match user {
        Value::Object(obj) => obj.get("id").and_then(id_from_value),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(obj)) => obj.get("id").and_then(id_from_value),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse user from upload metadata");
                None
            }
        },
        _ => None,
    }
}

/// Derive the storage key for a new upload.
///
/// The identity id comes from the authenticated user, then from
/// `metadata.user.id`. When neither is present the upload is refused with
/// [`AppError::IdentityRequired`]. When `metadata` is given, the normalized
/// tenant slug and sanitized filename are written back into it as `brand` and
/// `name`.
pub fn build_key(
    tenant_slug: &str,
    raw_filename: &str,
    identity: &Identity,
    metadata: Option<&mut Map<String, Value>>,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let filename = sanitize_filename(raw_filename);
    let slug = normalize_slug(tenant_slug);

    let identity_id = match identity.user_id() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => metadata_user_id(metadata.as_deref()).ok_or_else(|| {
            tracing::warn!(tenant_id = %slug, "No identity available for upload key");
            AppError::IdentityRequired
        })?,
    };

    if let Some(metadata) = metadata {
        metadata.insert("brand".to_string(), Value::String(slug.clone()));
        metadata.insert("name".to_string(), Value::String(filename.clone()));
    }

    Ok(format!(
        "{}/original/{}/{}/{}/{}/{:02}{:02}{:02}{:03}/{}",
        slug,
        identity_id,
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis(),
        filename
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use companion_core::AuthUser;
    use serde_json::json;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 4).unwrap() + chrono::Duration::milliseconds(42)
    }

    fn user(id: &str) -> Identity {
        Identity::Authenticated(Some(AuthUser {
            id: id.to_string(),
            email: None,
            name: None,
            roles: vec![],
        }))
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my file!@.png"), "myfile.png");
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename("😀 "), "untitled");
        assert_eq!(sanitize_filename(&"a".repeat(300)).len(), 255);
    }

    #[test]
    fn test_build_key_layout() {
        let key = build_key("Acme", "photo 1.jpg", &user("u-1"), None, clock()).unwrap();
        assert_eq!(key, "acme/original/u-1/2024/3/7/090504042/photo1.jpg");
    }

    #[test]
    fn test_build_key_is_deterministic_and_tenant_prefixed() {
        let a = build_key("beta", "x.bin", &user("7"), None, clock()).unwrap();
        let b = build_key("beta", "x.bin", &user("7"), None, clock()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("beta/"));
    }

    #[test]
    fn test_identity_from_metadata_user() {
        let mut encoded = json!({"user": "{\"id\": 99}"}).as_object().cloned().unwrap();
        let key = build_key("acme", "a.txt", &Identity::Disabled, Some(&mut encoded), clock()).unwrap();
        assert!(key.contains("/original/99/"));

        let mut object = json!({"user": {"id": "abc"}}).as_object().cloned().unwrap();
        let key =
            build_key("acme", "a.txt", &Identity::Authenticated(None), Some(&mut object), clock())
                .unwrap();
        assert!(key.contains("/original/abc/"));
    }

    #[test]
    fn test_authenticated_user_wins_over_metadata() {
        let mut metadata = json!({"user": {"id": "other"}}).as_object().cloned().unwrap();
        let key = build_key("acme", "a.txt", &user("me"), Some(&mut metadata), clock()).unwrap();
        assert!(key.contains("/original/me/"));
    }

    #[test]
    fn test_missing_identity_is_an_error() {
        let err = build_key("acme", "a.txt", &Identity::Disabled, None, clock()).unwrap_err();
        assert!(matches!(err, AppError::IdentityRequired));

        let mut garbage = json!({"user": "not json"}).as_object().cloned().unwrap();
        let err =
            build_key("acme", "a.txt", &Identity::Disabled, Some(&mut garbage), clock()).unwrap_err();
        assert!(matches!(err, AppError::IdentityRequired));
    }

    #[test]
    fn test_metadata_is_back_filled() {
        let mut metadata = Map::new();
        build_key("My Brand", "report (final).pdf", &user("u"), Some(&mut metadata), clock())
            .unwrap();
        assert_eq!(metadata["brand"], "my-brand");
        assert_eq!(metadata["name"], "reportfinal.pdf");
    }
}
