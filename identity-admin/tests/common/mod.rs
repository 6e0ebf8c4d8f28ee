//! Shared setup for identity-admin integration tests.
//!
//! Builds the full router over the in-memory store and a mock session
//! gateway, so tests run without PostgreSQL or the IdP runtime.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use identity_admin::{
    build_router,
    config::{
        AdminConfig, DatabaseConfig, Environment, IdentityConfig, IdpConfig, OAuthConfig,
        SecurityConfig, SwaggerConfig, SwaggerMode, DEFAULT_SESSION_COOKIE,
    },
    middleware::HOOK_API_KEY_HEADER,
    models::UserIdentity,
    services::{IdentityStore, InMemoryStore, MockSessionGateway},
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_HOOK_API_KEY: &str = "test-hook-key-0123456789";

pub fn test_config() -> AdminConfig {
    AdminConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "identity-admin-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        idp: IdpConfig {
            base_url: "http://idp.test".to_string(),
            session_path: "/api/auth/get-session".to_string(),
            timeout_seconds: 1,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            hook_api_key: TEST_HOOK_API_KEY.to_string(),
        },
        identity: IdentityConfig {
            institutional_domains: vec![
                "student.chula.ac.th".to_string(),
                "chula.ac.th".to_string(),
            ],
        },
        oauth: OAuthConfig {
            scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
                "offline_access".to_string(),
            ],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub sessions: Arc<MockSessionGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let sessions = Arc::new(MockSessionGateway::new());
        let state = AppState::new(test_config(), store.clone(), sessions.clone(), None);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            sessions,
        }
    }

    /// Store an identity with `roles` and give it a live session. Returns
    /// the identity and its session token.
    pub async fn seed_user(&self, email: &str, roles: &[&str]) -> (UserIdentity, String) {
        let local = email.split('@').next().unwrap_or(email);
        let identity = UserIdentity::new(email.to_string(), local.to_string(), email.to_string())
            .with_roles(roles.iter().copied());
        self.store
            .insert_identity(&identity)
            .await
            .expect("Failed to seed identity");

        let token = format!("session-{}", identity.id);
        self.sessions.insert(&token, &identity.id.to_string());
        (identity, token)
    }

    pub async fn admin(&self) -> (UserIdentity, String) {
        self.seed_user("root@chula.ac.th", &["admin", "user"]).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn hook(&self, path: &str, key: Option<&str>, body: Value) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(HOOK_API_KEY_HEADER, key);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Register a client as `token` and return the response body.
    pub async fn register_client(&self, token: &str, name: &str) -> Value {
        let response = self
            .post(
                "/api/auth/oauth2/register",
                token,
                serde_json::json!({
                    "client_name": name,
                    "redirect_uris": ["https://app.example.com/callback"],
                    "scope": "openid profile",
                    "metadata": { "description": "integration test client" }
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}
