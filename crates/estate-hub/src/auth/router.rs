use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::password::{hash_password_blocking, verify_password_blocking};
use super::{AuthError, AuthUser, Role, User};
use crate::http::{ApiError, ApiJson, AppContext};
use crate::store::{new_id, Timestamps};
use crate::validation::{self, SHORT_TEXT};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/me", get(me_handler))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Creates an account. Shared with the CLI, which may create admins.
pub async fn create_account(
    ctx: &AppContext,
    request: RegisterRequest,
    allow_admin: bool,
) -> Result<User, ApiError> {
    let role = request.role.unwrap_or(Role::Customer);
    if !allow_admin && !role.self_registrable() {
        return Err(ApiError::forbidden("admin accounts cannot self-register"));
    }

    let name = validation::required_text("name", &request.name, SHORT_TEXT)?;
    let email = validation::email("email", &request.email)?;
    let phone = validation::optional_text("phone", request.phone.as_deref(), 40)?;
    let password_hash = hash_password_blocking(request.password).await?;
    let lookup = email.clone();

    let user = User {
        id: new_id(),
        name,
        email,
        password_hash,
        role,
        phone,
        active: true,
        favorites: Vec::new(),
        stamps: Timestamps::now(),
    };

    let stored = ctx
        .store
        .insert_unless(user, |other: &User| other.email == lookup)
        .map_err(|err| match err {
            crate::store::StoreError::Conflict(_) => {
                ApiError::Conflict("an account with this email already exists".to_string())
            }
            other => other.into(),
        })?;
    info!(user = %stored.id, role = stored.role.label(), "account created");
    Ok(stored)
}

fn request_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn session_response(
    ctx: &AppContext,
    status: StatusCode,
    user: &User,
) -> Result<Response, ApiError> {
    let issued = ctx.tokens.issue(user)?;
    let cookie = ctx.session.set_cookie(&issued.token);
    let body = json!({
        "user": user.view(),
        "token": issued.token,
        "expires_at": issued.expires_at,
    });
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

pub(crate) async fn register_handler(
    State(ctx): State<AppContext>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let user = create_account(&ctx, request, false).await?;
    session_response(&ctx, StatusCode::CREATED, &user)
}

pub(crate) async fn login_handler(
    State(ctx): State<AppContext>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = request_email(&request.email);
    let user = ctx
        .store
        .find_one(|user: &User| user.email == email)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
        warn!(user = %user.id, "login rejected: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.active {
        warn!(user = %user.id, "login rejected: account disabled");
        return Err(ApiError::Unauthorized("account is disabled"));
    }

    info!(user = %user.id, "login succeeded");
    session_response(&ctx, StatusCode::OK, &user)
}

pub(crate) async fn logout_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, ctx.session.clear_cookie())],
    )
}

pub(crate) async fn me_handler(
    State(ctx): State<AppContext>,
    user: AuthUser,
) -> Result<Json<super::UserView>, ApiError> {
    let stored = ctx.store.require::<User>(&user.id)?;
    Ok(Json(stored.view()))
}
