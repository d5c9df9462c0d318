//! Shared harness for the router-level suites: an in-memory repository, a manual clock
//! and a cheap Argon2 hasher behind the real `create_router`.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use kazenites::{
    AppConfig, AppState, InMemoryRepository, create_router,
    auth::{Argon2Hasher, HasherState, ManualClock},
    models::{NewUser, Role},
    repository::RepositoryState,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Str0ngPass";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: ManualClock,
}

pub fn test_app() -> TestApp {
    test_app_with(AppConfig::default())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let hasher = Argon2Hasher::with_params(1024, 1).expect("valid test params");
    test_app_with_hasher(config, Arc::new(hasher))
}

pub fn test_app_with_hasher(config: AppConfig, hasher: HasherState) -> TestApp {
    let clock = ManualClock::starting_now();
    let repo = Arc::new(InMemoryRepository::seeded()) as RepositoryState;
    let state = AppState::with_clock(repo, config, Arc::new(clock.clone()), hasher);
    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The machine-readable `error` code of an error body.
    pub fn code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Registers through the API and returns (token, user id).
    pub async fn register(&self, email: &str) -> (String, Uuid) {
        let response = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD, "name": "Anna" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "register failed: {}", response.body);
        (
            response.body["token"].as_str().unwrap().to_string(),
            response.body["user_id"].as_str().unwrap().parse().unwrap(),
        )
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/api/auth/login",
            None,
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Admins cannot self-register; they are created directly in the repository.
    pub async fn admin(&self, email: &str) -> (String, Uuid) {
        let user = self
            .state
            .repo
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: self.state.hasher.hash(PASSWORD).unwrap(),
                name: "Admin".to_string(),
                surname: None,
                city: None,
                role: Role::Admin,
            })
            .await
            .unwrap();
        let token = self
            .state
            .tokens
            .issue(user.id, &user.email, user.role)
            .unwrap();
        (token, user.id)
    }

    /// Creates a listing as `token`'s owner and returns its id.
    pub async fn create_listing(&self, token: &str, title: &str) -> Uuid {
        let response = self
            .post(
                "/api/listings",
                Some(token),
                serde_json::json!({
                    "title": title,
                    "price": 3.5,
                    "city": "Sigulda",
                    "category_id": 1
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "create failed: {}", response.body);
        response.body["id"].as_str().unwrap().parse().unwrap()
    }
}
