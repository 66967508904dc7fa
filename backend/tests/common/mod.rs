//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh [`MemoryStore`], so tests
//! run in parallel without a database.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use helix_backend::{
    auth::{JwtService, PasswordService},
    config::AppConfig,
    repositories::{MemoryStore, NewUser, UserStore},
    routes,
    services::PackageService,
    state::AppState,
};
use helix_shared::Role;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// A seeded account and its session token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub jwt: JwtService,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), test_config());
        let jwt = state.jwt.clone();
        let app = routes::create_router(state);

        Self { app, store, jwt }
    }

    /// Send a request and decode the JSON body (`Null` when empty)
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("PUT", path, Some(token), Some(body)).await
    }

    /// Insert an account directly; the only way to get doctors and admins
    pub async fn seed_user(&self, name: &str, role: Role) -> TestUser {
        let email = format!("{}-{}@helix.test", name.to_lowercase(), Uuid::new_v4());
        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash: PasswordService::hash("Password123").unwrap(),
                name: name.to_string(),
                role,
                avatar: None,
            })
            .await
            .unwrap()
            .unwrap();
        let token = self.jwt.generate_access_token(user.id, role).unwrap();

        TestUser { id: user.id, token }
    }

    /// Register a client through the API and subscribe them to the first
    /// catalog package
    pub async fn subscribed_client(&self, name: &str) -> TestUser {
        let client = self.register_client(name).await;
        let package_id = self.first_package_id().await;
        let (status, _) = self
            .post(
                "/api/v1/packages/subscribe",
                &client.token,
                json!({ "packageId": package_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        client
    }

    pub async fn register_client(&self, name: &str) -> TestUser {
        let body = json!({
            "name": name,
            "email": format!("{}-{}@helix.test", name.to_lowercase(), Uuid::new_v4()),
            "password": "Password123",
        });
        let (status, response) = self
            .request("POST", "/api/v1/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", response);

        TestUser {
            id: response["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: response["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn first_package_id(&self) -> String {
        PackageService::seed_defaults(self.store.as_ref()).await.unwrap();
        let (_, packages) = self.request("GET", "/api/v1/packages", None, None).await;
        packages[0]["id"].as_str().unwrap().to_string()
    }
}

pub fn intake() -> Value {
    json!({
        "goals": "Lose 5 kg before summer",
        "currentWeight": 82.5,
        "targetWeight": 77.0,
        "height": 178.0,
        "age": 34,
        "gender": "female",
        "activityLevel": "moderate",
        "allergies": "peanuts",
        "preferredMeals": "vegetarian",
    })
}

pub fn draft_for(date: chrono::NaiveDate) -> Value {
    json!([
        { "date": date, "title": "Oat breakfast", "description": "Oats with berries",
          "type": "MEAL", "time": "08:00 AM", "calories": 350 },
        { "date": date, "title": "Brisk walk", "description": "30 minutes",
          "type": "ACTIVITY", "time": "06:00 PM" },
    ])
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "memory://".to_string();
    config.jwt.secret = "test-secret-key-for-testing-only-32chars".to_string();
    config
}
