use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{export_csv, import_csv, EntityKind, ImportReport};
use crate::auth::{AuthUser, Role};
use crate::http::{ApiError, ApiQuery, AppContext};

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    #[serde(default)]
    pub dry_run: bool,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/export/:entity", get(export_handler))
        .route("/api/import/:entity", post(import_handler))
}

fn entity(name: &str) -> Result<EntityKind, ApiError> {
    EntityKind::parse(name).ok_or_else(|| ApiError::not_found("transfer entity", name))
}

pub(crate) async fn export_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    caller.require(&[Role::Admin])?;
    let entity = entity(&name)?;
    let mut body = Vec::new();
    export_csv(&ctx.store, entity, &mut body)?;

    let disposition = format!("attachment; filename=\"{}.csv\"", entity.label());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub(crate) async fn import_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(name): Path<String>,
    ApiQuery(params): ApiQuery<ImportParams>,
    body: Bytes,
) -> Result<Json<ImportReport>, ApiError> {
    caller.require(&[Role::Admin])?;
    let entity = entity(&name)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("csv body is empty".to_string()));
    }
    let report = import_csv(&ctx.store, entity, body.as_ref(), &caller, params.dry_run)?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::http::api_router;
    use crate::testing::{context, empty_request, read_json, seed_user};

    fn csv_request(uri: &str, token: &str, body: &'static str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "text/csv")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn import_then_export_categories() {
        let ctx = context();
        let (_, token) = seed_user(&ctx, Role::Admin);
        let router = api_router(ctx);

        let response = router
            .clone()
            .oneshot(csv_request(
                "/api/import/categories",
                &token,
                "name,description\nVilla,Detached\n,missing name\n",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = read_json(response).await;
        assert_eq!(report["total_rows"], 2);
        assert_eq!(report["imported"], 1);
        assert_eq!(report["errors"][0]["column"], "name");

        let response = router
            .oneshot(empty_request("GET", "/api/export/categories", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("villa,Villa,Detached,true"));
    }

    #[tokio::test]
    async fn unknown_entity_and_non_admin_are_rejected() {
        let ctx = context();
        let (_, admin) = seed_user(&ctx, Role::Admin);
        let (_, agent) = seed_user(&ctx, Role::Agent);
        let router = api_router(ctx);

        let response = router
            .clone()
            .oneshot(csv_request("/api/import/users", &admin, "name\nx\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(csv_request("/api/import/categories", &agent, "name\nx\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
