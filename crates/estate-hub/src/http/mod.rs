//! Shared HTTP plumbing: request context, JSON/query extractors with uniform error
//! bodies, pagination, and the assembled `/api` router.

mod error;
pub mod pagination;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::Router;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::media::{ImageStore, LocalImageStore};
use crate::notify::{LogNotifier, NotificationPublisher};
use crate::store::DocumentStore;

pub use error::ApiError;
pub use pagination::{Paginated, Pagination};

/// JSON body extractor whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections use the API error shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// How the session cookie is written.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl SessionSettings {
    pub fn set_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, token, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Everything a handler may touch, cloned per request.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<DocumentStore>,
    pub tokens: Arc<TokenService>,
    pub notifier: Arc<dyn NotificationPublisher>,
    pub media: Arc<dyn ImageStore>,
    pub session: SessionSettings,
    pub max_upload_bytes: usize,
}

impl AppContext {
    pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

    /// Context with the log-only notifier and default session settings.
    pub fn new(store: DocumentStore, tokens: TokenService, media: Arc<dyn ImageStore>) -> Self {
        let session = SessionSettings {
            cookie_name: "estate_session".to_string(),
            secure: false,
            max_age_secs: tokens.ttl().num_seconds(),
        };

        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            notifier: Arc::new(LogNotifier),
            media,
            session,
            max_upload_bytes: Self::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Wires the configured session cookie, upload limit and local-disk media.
    pub fn from_config(config: &AppConfig, store: DocumentStore) -> Self {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
        let media = LocalImageStore::new(
            config.storage.upload_dir.clone(),
            config.storage.public_media_url.clone(),
        );

        let mut ctx = Self::new(store, tokens, Arc::new(media));
        ctx.session.cookie_name = config.auth.session_cookie.clone();
        ctx.session.secure = config.auth.secure_cookie;
        ctx.max_upload_bytes = config.storage.max_upload_bytes;
        ctx
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationPublisher>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_media(mut self, media: Arc<dyn ImageStore>) -> Self {
        self.media = media;
        self
    }
}

/// Every marketplace route under `/api` plus `/media`.
pub fn api_router(ctx: AppContext) -> Router {
    Router::new()
        .merge(crate::auth::router::routes())
        .merge(crate::users::routes())
        .merge(crate::properties::routes())
        .merge(crate::catalog::routes())
        .merge(crate::engagement::routes())
        .merge(crate::content::routes())
        .merge(crate::crm::routes())
        .merge(crate::dashboard::routes())
        .merge(crate::transfer::routes())
        .merge(crate::media::routes())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_flags() {
        let settings = SessionSettings {
            cookie_name: "estate_session".into(),
            secure: true,
            max_age_secs: 3600,
        };
        let cookie = settings.set_cookie("abc");
        assert!(cookie.starts_with("estate_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));
        assert!(settings.clear_cookie().contains("Max-Age=0"));
    }
}
