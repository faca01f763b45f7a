//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p companion-api`. Storage is the
//! in-memory backend; auth endpoints are `wiremock` servers.

#![allow(dead_code)]

use axum::Router;
use axum_test::TestServer;
use companion_api::auth::AuthGate;
use companion_api::setup::proxy::ProviderProxy;
use companion_api::setup::routes;
use companion_api::state::AppState;
use companion_api::UploadBroker;
use companion_core::{Config, MapTenantSource, TenantRegistry};
use companion_storage::{InMemoryStorage, StaticStorageProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SECRET: &str = "test-companion-secret-0123456789";

/// Auth timeout used by tests, short enough to exercise the timeout path quickly.
pub const TEST_AUTH_TIMEOUT: Duration = Duration::from_millis(300);

/// Blob for a tenant with a bucket and no auth endpoint.
pub fn storage_blob(bucket: &str) -> String {
    format!(
        r#"{{"s3": {{"bucket": "{}", "region": "eu-west-1"}}, "corsOrigins": ["https://{}.example.com"]}}"#,
        bucket, bucket
    )
}

/// Blob for a tenant whose tokens are checked by `auth_url`.
pub fn auth_blob(bucket: &str, auth_url: &str) -> String {
    format!(
        r#"{{"s3": {{"bucket": "{}", "region": "eu-west-1"}}, "authUrl": "{}", "authCookieName": "{}_session"}}"#,
        bucket, auth_url, bucket
    )
}

/// Test application: server plus the storage backend behind it.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<InMemoryStorage>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub struct TestAppBuilder {
    brands: String,
    source: MapTenantSource,
    env: HashMap<String, String>,
    storage: InMemoryStorage,
    proxy: Option<Arc<dyn ProviderProxy>>,
}

impl TestAppBuilder {
    pub fn new(brands: &str) -> Self {
        Self {
            brands: brands.to_string(),
            source: MapTenantSource::new(),
            env: HashMap::new(),
            storage: InMemoryStorage::new(),
            proxy: None,
        }
    }

    /// Per-tenant blob under its upper-snake key, e.g. `ACME`.
    pub fn tenant(mut self, key: &str, blob: impl Into<String>) -> Self {
        self.source = self.source.with(key, blob);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn require_auth(self) -> Self {
        self.env("COMPANION_REQUIRE_AUTH", "true")
    }

    pub fn storage(mut self, storage: InMemoryStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn proxy(mut self, proxy: Arc<dyn ProviderProxy>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn config(&self) -> Config {
        let mut env = self.env.clone();
        env.entry("COMPANION_SECRET".to_string())
            .or_insert_with(|| TEST_SECRET.to_string());
        env.insert("COMPANION_BRANDS".to_string(), self.brands.clone());
        Config::from_lookup(move |key: &str| env.get(key).cloned()).expect("test config")
    }

    pub fn build(self) -> TestApp {
        let config = self.config();
        let registry = Arc::new(
            TenantRegistry::register(&config.brands, &self.source, &config.tenant_defaults())
                .expect("test registry"),
        );
        let storage = Arc::new(self.storage);

        let state = Arc::new(AppState {
            registry,
            broker: UploadBroker::new(Arc::new(StaticStorageProvider::new(storage.clone()))),
            auth: AuthGate::new(TEST_AUTH_TIMEOUT).expect("auth client"),
            require_auth: config.require_auth,
        });

        let router: Router = routes::setup_routes(&config, state.clone(), self.proxy)
            .expect("routes");

        TestApp {
            server: TestServer::new(router).expect("test server"),
            storage,
            state,
        }
    }
}

/// Two tenants with buckets; `acme` is the default.
pub fn setup_test_app() -> TestApp {
    TestAppBuilder::new("acme,beta")
        .tenant("ACME", storage_blob("acme"))
        .tenant("BETA", storage_blob("beta"))
        .build()
}

/// `metadata` value carrying an explicit user id, for tenants without auth.
pub fn metadata_user(id: &str) -> serde_json::Value {
    serde_json::json!({ "user": { "id": id } })
}
