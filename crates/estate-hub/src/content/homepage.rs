use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthUser, Role};
use crate::http::{ApiError, ApiJson, AppContext};
use crate::properties::Property;
use crate::store::{new_id, Document, DocumentStore, StoreError, Timestamps};
use crate::validation::{self, SHORT_TEXT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Carousel,
    #[default]
    Grid,
    Spotlight,
}

/// A curated block of listings on the landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomepageSection {
    pub id: String,
    pub title: String,
    pub kind: SectionKind,
    pub position: i32,
    pub active: bool,
    #[serde(default)]
    pub property_ids: Vec<String>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for HomepageSection {
    const COLLECTION: &'static str = "homepage_sections";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps(&self) -> &Timestamps {
        &self.stamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.stamps
    }
}

#[derive(Debug, Deserialize)]
pub struct SectionInput {
    pub title: String,
    #[serde(default)]
    pub kind: SectionKind,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub kind: Option<SectionKind>,
    pub position: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SectionProperty {
    pub property_id: String,
}

/// Public rendering of a section with its listings resolved.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub kind: SectionKind,
    pub position: i32,
    pub properties: Vec<Property>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/homepage", get(homepage_handler))
        .route(
            "/api/homepage/sections",
            get(list_sections_handler).post(create_section_handler),
        )
        .route(
            "/api/homepage/sections/:id",
            put(update_section_handler).delete(delete_section_handler),
        )
        .route("/api/homepage/sections/:id/properties", post(add_property_handler))
        .route(
            "/api/homepage/sections/:id/properties/:property_id",
            delete(remove_property_handler),
        )
}

fn by_position(sections: &mut [HomepageSection]) {
    sections.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.stamps.created_at.cmp(&b.stamps.created_at))
    });
}

/// Active sections in display order; deleted or unpublished listings are dropped.
pub fn render(store: &DocumentStore) -> Result<Vec<SectionView>, StoreError> {
    let mut sections = store.find(|section: &HomepageSection| section.active)?;
    by_position(&mut sections);

    let mut views = Vec::with_capacity(sections.len());
    for section in sections {
        let mut properties = Vec::with_capacity(section.property_ids.len());
        for id in &section.property_ids {
            match store.get::<Property>(id)? {
                Some(property) if property.is_published() => properties.push(property),
                _ => {}
            }
        }
        views.push(SectionView {
            id: section.id,
            title: section.title,
            kind: section.kind,
            position: section.position,
            properties,
        });
    }
    Ok(views)
}

pub(crate) async fn homepage_handler(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<SectionView>>, ApiError> {
    Ok(Json(render(&ctx.store)?))
}

pub(crate) async fn list_sections_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
) -> Result<Json<Vec<HomepageSection>>, ApiError> {
    caller.require(&[Role::Admin])?;
    let mut sections = ctx.store.all::<HomepageSection>()?;
    by_position(&mut sections);
    Ok(Json(sections))
}

pub(crate) async fn create_section_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(input): ApiJson<SectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(&[Role::Admin])?;
    let section = HomepageSection {
        id: new_id(),
        title: validation::required_text("title", &input.title, SHORT_TEXT)?,
        kind: input.kind,
        position: input.position,
        active: input.active,
        property_ids: Vec::new(),
        stamps: Timestamps::now(),
    };
    let stored = ctx.store.insert(section)?;
    info!(section = %stored.id, admin = %caller.id, "homepage section created");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn update_section_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SectionPatch>,
) -> Result<Json<HomepageSection>, ApiError> {
    caller.require(&[Role::Admin])?;
    let title = patch
        .title
        .map(|title| validation::required_text("title", &title, SHORT_TEXT))
        .transpose()?;
    let stored = ctx.store.update(&id, |section: &mut HomepageSection| {
        if let Some(title) = title {
            section.title = title;
        }
        if let Some(kind) = patch.kind {
            section.kind = kind;
        }
        if let Some(position) = patch.position {
            section.position = position;
        }
        if let Some(active) = patch.active {
            section.active = active;
        }
    })?;
    info!(section = %stored.id, admin = %caller.id, "homepage section updated");
    Ok(Json(stored))
}

pub(crate) async fn delete_section_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require(&[Role::Admin])?;
    ctx.store.delete::<HomepageSection>(&id)?;
    info!(section = %id, admin = %caller.id, "homepage section deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn add_property_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SectionProperty>,
) -> Result<Json<HomepageSection>, ApiError> {
    caller.require(&[Role::Admin])?;
    let property_id = body.property_id.trim().to_string();
    ctx.store.require::<Property>(&property_id)?;
    let section = ctx.store.update(&id, |section: &mut HomepageSection| {
        if !section.property_ids.contains(&property_id) {
            section.property_ids.push(property_id.clone());
        }
    })?;
    info!(section = %section.id, property = %property_id, admin = %caller.id, "property pinned to homepage");
    Ok(Json(section))
}

pub(crate) async fn remove_property_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path((id, property_id)): Path<(String, String)>,
) -> Result<Json<HomepageSection>, ApiError> {
    caller.require(&[Role::Admin])?;
    let section = ctx.store.update(&id, |section: &mut HomepageSection| {
        section.property_ids.retain(|pinned| pinned != &property_id);
    })?;
    info!(section = %section.id, property = %property_id, admin = %caller.id, "property unpinned from homepage");
    Ok(Json(section))
}
