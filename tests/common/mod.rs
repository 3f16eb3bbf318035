//! Common test utilities
//!
//! - Settings pointing at an in-memory database and a scratch data dir
//! - A fully composed application router
//! - Request helpers returning status, headers and JSON body
//! - Test users with ready-made auth cookies

#![allow(dead_code)]

use std::path::Path;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use coredevs::backend::auth::{create_token, hash_password};
use coredevs::backend::server::{App, AppState};
use coredevs::backend::services::{DemoService, UserService};
use coredevs::backend::store::Document;
use coredevs::shared::{Environment, RateLimitSettings, Settings, SettingsBuilder};

pub const TEST_SECRET: &str = "test-secret";

pub fn test_settings_builder(dir: &Path) -> SettingsBuilder {
    Settings::builder()
        .secret(TEST_SECRET)
        .cookie_key("test-cookie-key")
        .server_url("http://localhost:3000")
        .default_role("user")
        .environment(Environment::Test)
        .database_url("sqlite::memory:")
        .data_dir(dir)
        .client_dir(dir.join("client"))
        .rate_limit(RateLimitSettings {
            enabled: false,
            ..Default::default()
        })
}

pub fn test_settings(dir: &Path) -> Settings {
    test_settings_builder(dir).build().unwrap()
}

/// Required profile fields for a user; the user name is the email's local part
pub fn profile(email: &str, first_name: &str) -> Map<String, Value> {
    let user_name = email.split('@').next().unwrap_or(email);
    json!({
        "firstName": first_name,
        "lastName": "Tester",
        "userName": user_name,
        "workingDays": ["mo", "tu"],
        "workingHours": 1
    })
    .as_object()
    .cloned()
    .unwrap()
}

/// Body for `POST /api/auth/signup`
pub fn signup_body(email: &str, password: &str, first_name: &str) -> Value {
    let mut body = profile(email, first_name);
    body.insert("email".into(), Value::String(email.to_string()));
    body.insert("password".into(), Value::String(password.to_string()));
    Value::Object(body)
}

/// Router plus the state behind it; keeps the scratch dir alive
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        Self::with_settings(dir, settings).await
    }

    pub async fn with_settings(dir: TempDir, settings: Settings) -> Self {
        let app = App::new(settings)
            .await
            .unwrap()
            .service(UserService)
            .service(DemoService);
        let state = app.state().clone();
        let router = app.router().unwrap();
        Self { router, state, dir }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        self.request(Method::GET, uri, None, cookie).await
    }

    /// Insert a user directly and return it with its auth cookie
    pub async fn create_user(&self, email: &str, password: &str, role: &str) -> (Document, String) {
        let mut body = profile(email, "Test");
        body.insert("email".into(), Value::String(email.to_string()));
        body.insert(
            "password".into(),
            Value::String(hash_password(password, Environment::Test).unwrap()),
        );
        body.insert("role".into(), Value::String(role.to_string()));
        let user = self.state.users().unwrap().create(body, None).await.unwrap();
        let token = create_token(TEST_SECRET, &user.id, email).unwrap();
        (user, format!("coredevs={}", token))
    }
}

/// Cookie header value from a `Set-Cookie` response header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}
