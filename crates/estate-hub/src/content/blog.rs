use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthUser, MaybeUser, Role};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};
use crate::store::{new_id, Document, Sluggable, Timestamps};
use crate::validation::{self, ValidationError, LONG_TEXT, SHORT_TEXT};

const WRITERS: &[Role] = &[Role::Admin, Role::Agent];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub body: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for BlogPost {
    const COLLECTION: &'static str = "blog_posts";

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

impl Sluggable for BlogPost {
    const SLUG_STEM: &'static str = "post";

    fn slug_source(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = slug;
    }
}

impl BlogPost {
    /// `published_at` records the first publication and is never moved afterwards.
    fn set_published(&mut self, published: bool) {
        self.published = published;
        if published && self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
    }

    fn readable_by(&self, caller: &MaybeUser) -> bool {
        self.published || caller.is_admin() || caller.id() == Some(self.author_id.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct BlogPostInput {
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub body: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogPostPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogQuery {
    #[serde(default)]
    pub include_drafts: bool,
    pub tag: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn build_post(input: BlogPostInput, author: &AuthUser) -> Result<BlogPost, ValidationError> {
    let mut post = BlogPost {
        id: new_id(),
        title: validation::required_text("title", &input.title, SHORT_TEXT)?,
        slug: String::new(),
        excerpt: validation::optional_text("excerpt", input.excerpt.as_deref(), 1_000)?,
        body: validation::required_text("body", &input.body, LONG_TEXT * 5)?,
        cover_image: validation::optional_text("cover_image", input.cover_image.as_deref(), 500)?,
        tags: validation::clean_list(input.tags),
        author_id: author.id.clone(),
        author_name: author.name.clone(),
        published: false,
        published_at: None,
        stamps: Timestamps::now(),
    };
    post.set_published(input.published);
    Ok(post)
}

fn apply_patch(post: &mut BlogPost, patch: BlogPostPatch) -> Result<(), ValidationError> {
    if let Some(title) = patch.title {
        post.title = validation::required_text("title", &title, SHORT_TEXT)?;
    }
    if let Some(excerpt) = patch.excerpt {
        post.excerpt = validation::optional_text("excerpt", Some(&excerpt), 1_000)?;
    }
    if let Some(body) = patch.body {
        post.body = validation::required_text("body", &body, LONG_TEXT * 5)?;
    }
    if let Some(cover_image) = patch.cover_image {
        post.cover_image = validation::optional_text("cover_image", Some(&cover_image), 500)?;
    }
    if let Some(tags) = patch.tags {
        post.tags = validation::clean_list(tags);
    }
    if let Some(published) = patch.published {
        post.set_published(published);
    }
    Ok(())
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/blog", get(list_handler).post(create_handler))
        .route(
            "/api/blog/:slug",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
}

/// Agents may only touch their own posts.
fn editable(ctx: &AppContext, caller: &AuthUser, id: &str) -> Result<BlogPost, ApiError> {
    caller.require(WRITERS)?;
    let post = ctx
        .store
        .lookup::<BlogPost>(id)?
        .ok_or_else(|| ApiError::not_found("blog post", id))?;
    caller.require_owner_or_admin(Some(&post.author_id))?;
    Ok(post)
}

pub(crate) async fn list_handler(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    ApiQuery(query): ApiQuery<BlogQuery>,
) -> Result<Json<Paginated<BlogPost>>, ApiError> {
    let drafts_allowed = query.include_drafts
        && caller
            .0
            .as_ref()
            .is_some_and(|user| WRITERS.contains(&user.role));
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut posts = ctx.store.find(|post: &BlogPost| {
        let visible = post.published || (drafts_allowed && post.readable_by(&caller));
        visible
            && query
                .tag
                .as_deref()
                .map_or(true, |tag| post.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            && needle
                .as_deref()
                .map_or(true, |needle| post.title.to_lowercase().contains(needle))
    })?;
    posts.sort_by(|a, b| {
        let a_key = a.published_at.unwrap_or(a.stamps.created_at);
        let b_key = b.published_at.unwrap_or(b.stamps.created_at);
        b_key.cmp(&a_key)
    });
    let page = Pagination::from_query(query.page, query.per_page, 10).apply(posts);
    Ok(Json(page))
}

pub(crate) async fn get_handler(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    match ctx.store.lookup::<BlogPost>(&slug)? {
        Some(post) if post.readable_by(&caller) => Ok(Json(post)),
        _ => Err(ApiError::not_found("blog post", slug)),
    }
}

pub(crate) async fn create_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(input): ApiJson<BlogPostInput>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(WRITERS)?;
    let post = build_post(input, &caller)?;
    let stored = ctx.store.insert_with_slug(post)?;
    info!(post = %stored.id, slug = %stored.slug, author = %caller.id, published = stored.published, "blog post created");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn update_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BlogPostPatch>,
) -> Result<Json<BlogPost>, ApiError> {
    let mut post = editable(&ctx, &caller, &id)?;
    apply_patch(&mut post, patch)?;
    let stored = ctx.store.replace_with_slug(post)?;
    info!(post = %stored.id, user = %caller.id, "blog post updated");
    Ok(Json(stored))
}

pub(crate) async fn delete_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let post = editable(&ctx, &caller, &id)?;
    ctx.store.delete::<BlogPost>(&post.id)?;
    info!(post = %post.id, user = %caller.id, "blog post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::http::api_router;
    use crate::testing::{context, empty_request, json_request, read_json, seed_user};

    fn author() -> AuthUser {
        AuthUser {
            id: "agent-1".into(),
            name: "Agent".into(),
            email: "agent@example.com".into(),
            role: Role::Agent,
        }
    }

    fn draft() -> BlogPostInput {
        BlogPostInput {
            title: "Buying your first home".into(),
            excerpt: None,
            body: "Start with a budget.".into(),
            cover_image: None,
            tags: vec!["guides".into()],
            published: false,
        }
    }

    #[test]
    fn publishing_stamps_once() {
        let mut post = build_post(draft(), &author()).unwrap();
        assert!(post.published_at.is_none());

        apply_patch(&mut post, BlogPostPatch { published: Some(true), ..Default::default() }).unwrap();
        let first = post.published_at.expect("stamped");
        apply_patch(&mut post, BlogPostPatch { published: Some(false), ..Default::default() }).unwrap();
        apply_patch(&mut post, BlogPostPatch { published: Some(true), ..Default::default() }).unwrap();
        assert_eq!(post.published_at, Some(first));
    }

    #[tokio::test]
    async fn drafts_need_a_writer_and_the_flag() {
        let ctx = context();
        let (_, agent_token) = seed_user(&ctx, Role::Agent);
        let (_, customer_token) = seed_user(&ctx, Role::Customer);
        let router = api_router(ctx);

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/blog",
                Some(&agent_token),
                json!({"title": "Draft post", "body": "wip"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let public = router
            .clone()
            .oneshot(empty_request("GET", "/api/blog?include_drafts=true", Some(&customer_token)))
            .await
            .unwrap();
        assert_eq!(read_json(public).await["total"], 0);

        let writer = router
            .clone()
            .oneshot(empty_request("GET", "/api/blog?include_drafts=true", Some(&agent_token)))
            .await
            .unwrap();
        assert_eq!(read_json(writer).await["total"], 1);

        let by_slug = router
            .oneshot(empty_request("GET", "/api/blog/draft-post", None))
            .await
            .unwrap();
        assert_eq!(by_slug.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn agents_cannot_edit_each_others_posts() {
        let ctx = context();
        let (_, first) = seed_user(&ctx, Role::Agent);
        let (_, second) = seed_user(&ctx, Role::Agent);
        let router = api_router(ctx);

        let created = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/blog",
                Some(&first),
                json!({"title": "Market update", "body": "Prices rose.", "published": true}),
            ))
            .await
            .unwrap();
        let id = read_json(created).await["id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(json_request(
                "PUT",
                &format!("/api/blog/{}", id),
                Some(&second),
                json!({"title": "Hijacked"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
