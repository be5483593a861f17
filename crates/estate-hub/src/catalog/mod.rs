//! Reference data shared by listings (categories, amenities, facilities, states,
//! locations, developers), SEO page metadata and news items.
//!
//! These resources differ only in their fields, so they share one set of handlers driven
//! by [`CatalogResource`].

mod entities;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::auth::{AuthUser, MaybeUser, Role};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};
use crate::store::{Document, DocumentStore, StoreError};
use crate::validation::ValidationError;

pub use entities::{
    Amenity, Category, CategoryInput, CategoryPatch, Developer, DeveloperInput, DeveloperPatch,
    Facility, FeatureInput, FeaturePatch, Location, LocationInput, LocationPatch, News, NewsInput,
    NewsPatch, Region, RegionInput, RegionPatch, SeoPage, SeoPageInput, SeoPagePatch,
};

/// A document served by the generic catalog handlers.
pub trait CatalogResource: Document {
    /// Path segment under `/api`.
    const PATH: &'static str;
    /// Newest-first listing instead of alphabetical.
    const NEWEST_FIRST: bool = false;

    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;

    fn build(input: Self::Create, caller: &AuthUser) -> Result<Self, ValidationError>;
    fn apply(&mut self, patch: Self::Update) -> Result<(), ValidationError>;

    fn display_name(&self) -> &str;
    fn created_at(&self) -> chrono::DateTime<chrono::Utc>;

    fn is_active(&self) -> bool {
        true
    }

    fn slug_value(&self) -> Option<&str> {
        None
    }

    /// Roles allowed to create; updates additionally pass [`owner_id`](Self::owner_id).
    fn writers() -> &'static [Role] {
        &[Role::Admin]
    }

    fn owner_id(&self) -> Option<&str> {
        None
    }

    /// Checks against other documents, run before every create, update and import.
    fn check_references(&self, _store: &DocumentStore) -> Result<(), ApiError> {
        Ok(())
    }

    fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.insert(doc)
    }

    fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.replace(doc)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(resource_routes::<Category>())
        .merge(resource_routes::<Amenity>())
        .merge(resource_routes::<Facility>())
        .merge(resource_routes::<Region>())
        .merge(resource_routes::<Location>())
        .merge(resource_routes::<Developer>())
        .merge(resource_routes::<SeoPage>())
        .merge(resource_routes::<News>())
}

/// `GET/POST /api/<path>` and `GET/PUT/DELETE /api/<path>/:id` for one resource.
pub fn resource_routes<R: CatalogResource>() -> Router<AppContext> {
    let collection = format!("/api/{}", R::PATH);
    let item = format!("/api/{}/:id", R::PATH);
    Router::new()
        .route(&collection, get(list_handler::<R>).post(create_handler::<R>))
        .route(
            &item,
            get(get_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
}

/// Resolves `id_or_slug` against ids first, then slugs.
pub fn lookup<R: CatalogResource>(store: &DocumentStore, id_or_slug: &str) -> Result<R, ApiError> {
    if let Some(doc) = store.get::<R>(id_or_slug)? {
        return Ok(doc);
    }
    store
        .find_one(|doc: &R| doc.slug_value() == Some(id_or_slug))?
        .ok_or_else(|| {
            StoreError::NotFound {
                collection: R::COLLECTION,
                id: id_or_slug.to_string(),
            }
            .into()
        })
}

pub(crate) fn filter_and_sort<R: CatalogResource>(
    docs: Vec<R>,
    query: &CatalogQuery,
    include_inactive: bool,
) -> Vec<R> {
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut docs: Vec<R> = docs
        .into_iter()
        .filter(|doc| include_inactive || doc.is_active())
        .filter(|doc| query.active.map_or(true, |active| doc.is_active() == active))
        .filter(|doc| {
            needle
                .as_deref()
                .map_or(true, |needle| doc.display_name().to_lowercase().contains(needle))
        })
        .collect();

    if R::NEWEST_FIRST {
        docs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    } else {
        docs.sort_by(|a, b| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
        });
    }
    docs
}

pub(crate) async fn list_handler<R: CatalogResource>(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Json<Paginated<R>>, ApiError> {
    let docs = ctx.store.all::<R>()?;
    let docs = filter_and_sort(docs, &query, caller.is_admin());
    let page = Pagination::from_query(query.page, query.per_page, 50).apply(docs);
    Ok(Json(page))
}

pub(crate) async fn get_handler<R: CatalogResource>(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<R>, ApiError> {
    let doc = lookup::<R>(&ctx.store, &id)?;
    if !doc.is_active() && !caller.is_admin() {
        return Err(ApiError::not_found(R::PATH, id));
    }
    Ok(Json(doc))
}

pub(crate) async fn create_handler<R: CatalogResource>(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(input): ApiJson<R::Create>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(R::writers())?;
    let doc = R::build(input, &caller)?;
    doc.check_references(&ctx.store)?;
    let stored = R::persist_new(&ctx.store, doc)?;
    info!(resource = R::PATH, id = stored.id(), user = %caller.id, "catalog entry created");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn update_handler<R: CatalogResource>(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<R::Update>,
) -> Result<Json<R>, ApiError> {
    caller.require(R::writers())?;
    let mut doc = ctx.store.require::<R>(&id)?;
    if !caller.is_admin() {
        caller.require_owner_or_admin(doc.owner_id())?;
    }
    doc.apply(patch)?;
    doc.check_references(&ctx.store)?;
    let stored = R::persist_update(&ctx.store, doc)?;
    info!(resource = R::PATH, id = %id, user = %caller.id, "catalog entry updated");
    Ok(Json(stored))
}

pub(crate) async fn delete_handler<R: CatalogResource>(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require(R::writers())?;
    let doc = ctx.store.require::<R>(&id)?;
    if !caller.is_admin() {
        caller.require_owner_or_admin(doc.owner_id())?;
    }
    ctx.store.delete::<R>(&id)?;
    info!(resource = R::PATH, id = %id, user = %caller.id, "catalog entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
