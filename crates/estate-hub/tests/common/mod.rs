//! Helpers for driving the assembled router the way an HTTP client would.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use estate_hub::auth::router::{create_account, RegisterRequest};
use estate_hub::auth::{Role, TokenService};
use estate_hub::media::LocalImageStore;
use estate_hub::store::new_id;
use estate_hub::{api_router, AppContext, DocumentStore};

pub const PASSWORD: &str = "correct-horse-battery";

pub fn context() -> AppContext {
    let media = LocalImageStore::new(
        std::env::temp_dir().join(format!("estate-hub-it-{}", new_id())),
        "/media".to_string(),
    );
    AppContext::new(
        DocumentStore::in_memory(),
        TokenService::new("integration-secret", 1),
        Arc::new(media),
    )
}

pub struct Client {
    router: Router,
}

impl Client {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            router: api_router(ctx),
        }
    }

    pub async fn send(
        &self,
        method: &str,
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
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    /// Registers a self-service account and returns its id and bearer token.
    pub async fn register(&self, name: &str, role: &str) -> (String, String) {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", name, body);
        (
            body["user"]["id"].as_str().expect("user id").to_string(),
            body["token"].as_str().expect("token").to_string(),
        )
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {}: {}", email, body);
        body["token"].as_str().expect("token").to_string()
    }
}

/// Admins cannot self-register, so they are created the way the CLI does it.
pub async fn admin(ctx: &AppContext, client: &Client) -> String {
    create_account(
        ctx,
        RegisterRequest {
            name: "Site Admin".to_string(),
            email: "admin@example.com".to_string(),
            password: PASSWORD.to_string(),
            role: Some(Role::Admin),
            phone: None,
        },
        true,
    )
    .await
    .expect("admin account");
    client.login("admin@example.com").await
}

pub fn listing(title: &str, price: f64) -> Value {
    json!({
        "title": title,
        "listing_type": "sale",
        "price": price,
        "city": "Austin",
        "bedrooms": 3,
        "bathrooms": 2,
        "area_sqft": 1800.0
    })
}
