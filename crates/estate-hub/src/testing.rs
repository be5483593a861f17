//! Fixtures shared by router tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::auth::{Role, TokenService, User};
use crate::http::AppContext;
use crate::media::LocalImageStore;
use crate::notify::OutboxNotifier;
use crate::store::{new_id, DocumentStore, Timestamps};

pub fn context() -> AppContext {
    context_with_outbox().0
}

pub fn context_with_outbox() -> (AppContext, OutboxNotifier) {
    let outbox = OutboxNotifier::default();
    let media = LocalImageStore::new(
        std::env::temp_dir().join(format!("estate-hub-test-{}", new_id())),
        "/media".to_string(),
    );
    let ctx = AppContext::new(
        DocumentStore::in_memory(),
        TokenService::new("router-test-secret", 1),
        Arc::new(media),
    )
    .with_notifier(Arc::new(outbox.clone()));
    (ctx, outbox)
}

/// Inserts an active account with `role` and returns it with a bearer token.
pub fn seed_user(ctx: &AppContext, role: Role) -> (User, String) {
    let user = ctx
        .store
        .insert(User {
            id: new_id(),
            name: format!("{} user", role.label()),
            email: format!("{}-{}@example.com", role.label(), new_id()),
            password_hash: "unused".into(),
            role,
            phone: None,
            active: true,
            favorites: Vec::new(),
            stamps: Timestamps::now(),
        })
        .expect("seed user");
    let token = ctx.tokens.issue(&user).expect("issue token").token;
    (user, token)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json")
}
