//! In-process HTTP harness over the in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use kanban_api::{
    auth::{generate_jwt_token, AuthConfig, JwtSecret},
    create_api_router, ApiConfig,
};
use kanban_core::{EntityIdType, UserId};
use kanban_ledger::{KanbanService, Limits};
use kanban_storage::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "route_tests_secret_0123456789abcdef";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: JwtSecret::new(TEST_SECRET.to_string()).expect("valid secret"),
        ..AuthConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    auth: AuthConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        let store = MemoryStore::new();
        let service = KanbanService::new(Arc::new(store.clone()), limits);
        let auth = test_auth_config();
        let router = create_api_router(service, &ApiConfig::default(), auth.clone())
            .expect("router builds in development");
        Self {
            router,
            store,
            auth,
        }
    }

    pub fn new_user(&self) -> (UserId, String) {
        let user = UserId::now_v7();
        let token = generate_jwt_token(&self.auth, user).expect("token");
        (user, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Create a board and return its id.
    pub async fn board(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/boards", token, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }

    pub async fn column(&self, token: &str, board: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/boards/{board}/columns"),
                token,
                serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }

    pub async fn task(&self, token: &str, column: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/columns/{column}/tasks"),
                token,
                serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }

    /// Ids of a list response, in the order returned.
    pub async fn ids(&self, uri: &str, token: &str) -> Vec<String> {
        let (status, body) = self.get(uri, token).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body.as_array()
            .expect("array")
            .iter()
            .map(id_of)
            .collect()
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id field").to_string()
}

pub fn positions(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("array")
        .iter()
        .map(|v| v["position"].as_i64().expect("position"))
        .collect()
}
