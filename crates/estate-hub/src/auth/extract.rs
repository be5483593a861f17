use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::warn;

use super::{AuthError, Role, User};
use crate::http::{ApiError, AppContext};

/// The authenticated caller, loaded fresh from the store on every request so role
/// changes and deactivation take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 403 unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        warn!(user = %self.id, role = self.role.label(), "role not permitted");
        Err(ApiError::forbidden(format!(
            "role '{}' is not permitted to perform this action",
            self.role.label()
        )))
    }

    /// 403 unless the caller is an admin or `owner_id` is theirs.
    pub fn require_owner_or_admin(&self, owner_id: Option<&str>) -> Result<(), ApiError> {
        if self.is_admin() || owner_id == Some(self.id.as_str()) {
            return Ok(());
        }
        warn!(user = %self.id, "ownership check failed");
        Err(ApiError::forbidden("only the owner or an admin may do this"))
    }

    fn resolve(parts: &Parts, ctx: &AppContext) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_value(&parts.headers, &ctx.session.cookie_name))
            .ok_or(AuthError::MissingCredentials)?;
        let claims = ctx.tokens.verify(&token)?;

        let user = ctx
            .store
            .get::<User>(&claims.sub)?
            .filter(|user| user.active)
            .ok_or(ApiError::Unauthorized("account is missing or disabled"))?;

        Ok(user.into())
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        Self::resolve(parts, ctx)
    }
}

/// Optional caller for public routes that personalise their output. Invalid or expired
/// credentials are treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(AuthUser::is_admin)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.id.as_str())
    }
}

#[axum::async_trait]
impl FromRequestParts<AppContext> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        match AuthUser::resolve(parts, ctx) {
            Ok(user) => Ok(Self(Some(user))),
            Err(ApiError::Unauthorized(_)) => Ok(Self(None)),
            Err(other) => Err(other),
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc.def "));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; estate_session=tok.en; lang=en"),
        );
        assert_eq!(
            cookie_value(&headers, "estate_session").as_deref(),
            Some("tok.en")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn require_reports_forbidden() {
        let user = AuthUser {
            id: "u".into(),
            name: "U".into(),
            email: "u@example.com".into(),
            role: Role::Customer,
        };
        assert!(user.require(&[Role::Customer, Role::Agent]).is_ok());
        let err = user.require(&[Role::Admin]).expect_err("forbidden");
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
        assert!(user.require_owner_or_admin(Some("u")).is_ok());
        assert!(user.require_owner_or_admin(Some("other")).is_err());
        assert!(user.require_owner_or_admin(None).is_err());
    }
}
