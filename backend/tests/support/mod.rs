#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use homestay_backend::config::AppConfig;
use homestay_backend::db::repositories::LocalRepository;
use homestay_backend::db::repository::FullRepository;
use homestay_backend::http::{create_router, AppState};
use homestay_backend::mail::LogMailer;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Router over a fresh in-memory repository with an inspectable outbox.
pub struct TestApp {
    pub router: Router,
    pub mailer: LogMailer,
    pub repo: Arc<LocalRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        let repo = Arc::new(LocalRepository::new());
        let mailer = LogMailer::new();
        let mut config = AppConfig::default();
        config.auth.bcrypt_cost = 4;
        config.server.frontend_url = "http://app.test".to_string();
        let state = AppState::new(
            Arc::clone(&repo) as Arc<dyn FullRepository>,
            Arc::new(mailer.clone()),
            config,
        );
        Self {
            router: create_router(state),
            mailer,
            repo,
        }
    }

    /// Send a request and decode the envelope.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    /// Verification token from the last mail sent to `email`.
    pub fn verification_token(&self, email: &str) -> String {
        let mail = self.mailer.last_to(email).expect("no mail sent");
        mail.body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .expect("no token in mail")
            .to_string()
    }

    /// Register, verify and log in; returns the access token.
    pub async fn signup(&self, name: &str, email: &str, role: &str) -> String {
        let (status, _) = self
            .post(
                "/api/auth/register",
                None,
                json!({"name": name, "email": email, "password": "secret12", "role": role}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = self.verification_token(email);
        let (status, _) = self
            .get(&format!("/api/auth/verify?token={}", token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({"email": email, "password": "secret12"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    /// Create and activate a homestay with one room; returns `(homestay_id, room_id)`.
    pub async fn listed_homestay(&self, host: &str, price: f64) -> (i64, i64) {
        let (status, body) = self
            .post(
                "/api/host/homestays",
                Some(host),
                json!({
                    "name": "Sapa Cloud House",
                    "description": "Wooden house facing the rice terraces",
                    "address": "45 Fansipan Road",
                    "city": "Sapa",
                    "district": "Sapa Town",
                    "ward": "Cau May",
                    "latitude": 22.33,
                    "longitude": 103.84
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let homestay_id = body["data"]["homestay"]["id"].as_i64().unwrap();
        let (status, _) = self
            .put(
                &format!("/api/host/homestays/{}/toggle-status", homestay_id),
                Some(host),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .post(
                "/api/host/rooms",
                Some(host),
                json!({
                    "homestayId": homestay_id,
                    "name": "Terrace Double",
                    "description": "Double room with a view",
                    "type": "double",
                    "capacity": 2,
                    "price": price,
                    "priceType": "per_night"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (homestay_id, body["data"]["room"]["id"].as_i64().unwrap())
    }
}
