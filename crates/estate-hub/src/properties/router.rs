use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use tracing::{info, warn};

use super::domain::{check_references, Property, PropertyInput, PropertyPatch};
use super::query::{PropertyQuery, DEFAULT_PER_PAGE};
use super::visible_to;
use crate::auth::{AuthUser, MaybeUser, Role};
use crate::engagement::{rating_summary, RatingSummary};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/properties", get(list_handler).post(create_handler))
        .route(
            "/api/properties/:id",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/api/properties/:id/featured", patch(featured_handler))
        .route("/api/properties/:id/reviews", get(reviews_handler))
}

/// Resolves an id or slug to a listing the caller may see.
pub(crate) fn find_visible(
    ctx: &AppContext,
    caller: &MaybeUser,
    id_or_slug: &str,
) -> Result<Property, ApiError> {
    match ctx.store.lookup::<Property>(id_or_slug)? {
        Some(property) if visible_to(&property, caller) => Ok(property),
        _ => Err(ApiError::not_found("property", id_or_slug)),
    }
}

pub(crate) async fn list_handler(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    ApiQuery(query): ApiQuery<PropertyQuery>,
) -> Result<Json<Paginated<Property>>, ApiError> {
    let properties = query.run(ctx.store.all::<Property>()?, &caller);
    let page = Pagination::from_query(query.page, query.per_page, DEFAULT_PER_PAGE).apply(properties);
    Ok(Json(page))
}

pub(crate) async fn get_handler(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Property>, ApiError> {
    find_visible(&ctx, &caller, &id).map(Json)
}

pub(crate) async fn create_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(mut input): ApiJson<PropertyInput>,
) -> Result<impl IntoResponse, ApiError> {
    if !caller.role.can_list_properties() {
        warn!(user = %caller.id, role = caller.role.label(), "listing creation refused");
        return Err(ApiError::forbidden("only agents, builders and admins may list properties"));
    }
    if !caller.is_admin() {
        input.featured = false;
    }

    let property = Property::build(input, &caller.id)?;
    check_references(&ctx.store, &property)?;
    let stored = ctx.store.insert_with_slug(property)?;
    info!(property = %stored.id, slug = %stored.slug, owner = %caller.id, "property listed");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn update_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<PropertyPatch>,
) -> Result<Json<Property>, ApiError> {
    let mut property = ctx.store.require::<Property>(&id)?;
    caller.require_owner_or_admin(Some(&property.owner_id))?;

    property.apply(patch)?;
    check_references(&ctx.store, &property)?;
    let stored = ctx.store.replace_with_slug(property)?;
    info!(property = %stored.id, user = %caller.id, "property updated");
    Ok(Json(stored))
}

pub(crate) async fn delete_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let property = ctx.store.require::<Property>(&id)?;
    caller.require_owner_or_admin(Some(&property.owner_id))?;
    ctx.store.delete::<Property>(&id)?;
    info!(property = %id, user = %caller.id, "property deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn featured_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Property>, ApiError> {
    caller.require(&[Role::Admin])?;
    let property = ctx
        .store
        .update(&id, |property: &mut Property| property.featured = !property.featured)?;
    info!(property = %property.id, featured = property.featured, admin = %caller.id, "featured flag toggled");
    Ok(Json(property))
}

pub(crate) async fn reviews_handler(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<RatingSummary>, ApiError> {
    let property = find_visible(&ctx, &caller, &id)?;
    let summary = rating_summary(&ctx.store, &property.id)?;
    Ok(Json(summary))
}
