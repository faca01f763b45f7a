use crate::constants::BEARER_TOKEN_QUERY;
use axum::http::{header::AUTHORIZATION, HeaderMap, Uri};
use axum_extra::extract::cookie::CookieJar;
use companion_core::Tenant;

const BEARER_PREFIX: &str = "Bearer ";

/// Locate the caller's bearer token. First match wins: `Authorization: Bearer`,
/// then the tenant's auth cookie, then the `bearerToken` query parameter.
/// Empty values are skipped.
pub fn extract_token(headers: &HeaderMap, uri: &Uri, tenant: &Tenant) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    if from_header.is_some() {
        return from_header;
    }

    if !tenant.auth_cookie_name.is_empty() {
        let jar = CookieJar::from_headers(headers);
        if let Some(cookie) = jar.get(&tenant.auth_cookie_name) {
            if !cookie.value().is_empty() {
                return Some(cookie.value().to_string());
            }
        }
    }

    uri.query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, value)| name == BEARER_TOKEN_QUERY && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}
