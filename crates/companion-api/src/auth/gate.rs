use axum::http::header::ACCEPT;
use companion_core::{AuthEndpoint, AuthUser, Identity, Tenant};
use std::time::Duration;

/// Validates bearer tokens against a tenant's remote auth endpoint.
///
/// Fails closed: any non-2xx answer, network error or timeout is `Rejected`.
#[derive(Debug, Clone)]
pub struct AuthGate {
    client: reqwest::Client,
}

impl AuthGate {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    #[tracing::instrument(skip(self, token, tenant), fields(tenant_id = %tenant.id))]
    pub async fn authenticate(&self, token: &str, tenant: &Tenant) -> Identity {
        let endpoint = match tenant.auth_endpoint.as_ref() {
            None => return Identity::Disabled,
            Some(AuthEndpoint::Invalid(raw)) => {
                tracing::warn!(auth_url = %raw, "Auth endpoint is not a valid URL, rejecting request");
                return Identity::Rejected;
            }
            Some(AuthEndpoint::Url(url)) => url,
        };

        let response = match self
            .client
            .get(endpoint.clone())
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    timeout = e.is_timeout(),
                    "Auth endpoint unreachable, rejecting request"
                );
                return Identity::Rejected;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Auth endpoint rejected token");
            return Identity::Rejected;
        }

        let user = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<AuthUser>(&body)
                .map_err(|e| tracing::debug!(error = %e, "Auth response is not a user record"))
                .ok(),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read auth response body");
                None
            }
        };

        Identity::Authenticated(user)
    }
}
