//! Account administration and the signed-in user's own profile and favorites.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::{AuthUser, MaybeUser, Role, User, UserView};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};
use crate::properties::{find_visible, visible_to, Property};
use crate::validation::{self, SHORT_TEXT};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users", get(list_handler))
        .route(
            "/api/users/:id",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/api/me", put(profile_handler))
        .route("/api/me/favorites", get(favorites_handler))
        .route(
            "/api/me/favorites/:property_id",
            post(add_favorite_handler).delete(remove_favorite_handler),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Admin edit of another account.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Self-service profile edit. Changing the password requires the current one.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FavoriteIds {
    pub favorites: Vec<String>,
}

pub(crate) async fn list_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Paginated<UserView>>, ApiError> {
    caller.require(&[Role::Admin])?;
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut users = ctx.store.find(|user: &User| {
        query.role.map_or(true, |role| user.role == role)
            && needle.as_deref().map_or(true, |needle| {
                user.name.to_lowercase().contains(needle) || user.email.contains(needle)
            })
    })?;
    users.sort_by(|a, b| b.stamps.created_at.cmp(&a.stamps.created_at));
    let page = Pagination::from_query(query.page, query.per_page, 20)
        .apply(users)
        .map(|user| user.view());
    Ok(Json(page))
}

pub(crate) async fn get_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    caller.require(&[Role::Admin])?;
    Ok(Json(ctx.store.require::<User>(&id)?.view()))
}

pub(crate) async fn update_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<UserView>, ApiError> {
    caller.require(&[Role::Admin])?;
    if id == caller.id {
        if update.role.is_some_and(|role| role != Role::Admin) {
            return Err(ApiError::BadRequest("admins cannot demote themselves".to_string()));
        }
        if update.active == Some(false) {
            return Err(ApiError::BadRequest("admins cannot deactivate themselves".to_string()));
        }
    }

    let name = update
        .name
        .map(|name| validation::required_text("name", &name, SHORT_TEXT))
        .transpose()?;
    let phone = update
        .phone
        .map(|phone| validation::optional_text("phone", Some(&phone), 40))
        .transpose()?;

    let stored = ctx.store.update(&id, |user: &mut User| {
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(phone) = phone {
            user.phone = phone;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(active) = update.active {
            user.active = active;
        }
    })?;
    info!(user = %stored.id, role = stored.role.label(), active = stored.active, admin = %caller.id, "account updated");
    Ok(Json(stored.view()))
}

pub(crate) async fn delete_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require(&[Role::Admin])?;
    if id == caller.id {
        return Err(ApiError::BadRequest("admins cannot delete themselves".to_string()));
    }
    ctx.store.delete::<User>(&id)?;
    info!(user = %id, admin = %caller.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn profile_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<UserView>, ApiError> {
    let name = update
        .name
        .map(|name| validation::required_text("name", &name, SHORT_TEXT))
        .transpose()?;
    let phone = update
        .phone
        .map(|phone| validation::optional_text("phone", Some(&phone), 40))
        .transpose()?;

    // (hash checked against, replacement hash)
    let password = match update.new_password {
        Some(new_password) => {
            let current_hash = ctx.store.require::<User>(&caller.id)?.password_hash;
            let current = update.current_password.unwrap_or_default();
            if !verify_password_blocking(current, current_hash.clone()).await? {
                warn!(user = %caller.id, "password change rejected: wrong current password");
                return Err(ApiError::BadRequest("current password is incorrect".to_string()));
            }
            Some((current_hash, hash_password_blocking(new_password).await?))
        }
        None => None,
    };

    let stored = ctx.store.update_with(&caller.id, |user: &mut User| {
        if let Some((checked, replacement)) = password {
            if user.password_hash != checked {
                return Err(ApiError::Conflict(
                    "password was changed by another request".to_string(),
                ));
            }
            user.password_hash = replacement;
        }
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(phone) = phone {
            user.phone = phone;
        }
        Ok(())
    })?;
    info!(user = %stored.id, "profile updated");
    Ok(Json(stored.view()))
}

/// Saved listings the caller can still see; deleted or hidden ones are skipped.
pub(crate) async fn favorites_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    let user = ctx.store.require::<User>(&caller.id)?;
    let viewer = MaybeUser(Some(caller));
    let mut favorites = Vec::with_capacity(user.favorites.len());
    for id in &user.favorites {
        if let Some(property) = ctx.store.get::<Property>(id)? {
            if visible_to(&property, &viewer) {
                favorites.push(property);
            }
        }
    }
    Ok(Json(favorites))
}

pub(crate) async fn add_favorite_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(property_id): Path<String>,
) -> Result<Json<FavoriteIds>, ApiError> {
    let property = find_visible(&ctx, &MaybeUser(Some(caller.clone())), &property_id)?;
    let user = ctx.store.update(&caller.id, |user: &mut User| {
        if !user.favorites.contains(&property.id) {
            user.favorites.push(property.id.clone());
        }
    })?;
    info!(user = %user.id, property = %property_id, "favorite saved");
    Ok(Json(FavoriteIds {
        favorites: user.favorites,
    }))
}

pub(crate) async fn remove_favorite_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(property_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.store.update(&caller.id, |user: &mut User| {
        user.favorites.retain(|id| id != &property_id);
    })?;
    info!(user = %caller.id, property = %property_id, "favorite removed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::http::api_router;
    use crate::properties::{ListingType, PropertyStatus};
    use crate::store::{new_id, Timestamps};
    use crate::testing::{context, empty_request, json_request, read_json, seed_user};

    fn listing(ctx: &AppContext, owner: &str, status: PropertyStatus) -> Property {
        ctx.store
            .insert_with_slug(Property {
                id: new_id(),
                title: "Garden Flat".into(),
                slug: String::new(),
                description: None,
                listing_type: ListingType::Sale,
                property_type: "apartment".into(),
                status,
                price: 100.0,
                area_sqft: None,
                bedrooms: 1,
                bathrooms: 1,
                address: None,
                city: "Pune".into(),
                state: None,
                location_id: None,
                category_id: None,
                developer_id: None,
                amenity_ids: Vec::new(),
                facility_ids: Vec::new(),
                images: Vec::new(),
                featured: false,
                owner_id: owner.into(),
                stamps: Timestamps::now(),
            })
            .unwrap()
    }

    #[tokio::test]
    async fn admin_cannot_demote_or_delete_self() {
        let ctx = context();
        let (admin, token) = seed_user(&ctx, Role::Admin);
        let router = api_router(ctx);
        let uri = format!("/api/users/{}", admin.id);

        let response = router
            .clone()
            .oneshot(json_request("PUT", &uri, Some(&token), json!({"role": "agent"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(empty_request("DELETE", &uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deactivated_accounts_lose_access() {
        let ctx = context();
        let (_, admin_token) = seed_user(&ctx, Role::Admin);
        let (agent, agent_token) = seed_user(&ctx, Role::Agent);
        let router = api_router(ctx);

        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/users/{}", agent.id),
                Some(&admin_token),
                json!({"active": false}),
            ))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["active"], false);

        let response = router
            .oneshot(empty_request("GET", "/api/auth/me", Some(&agent_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_list_is_admin_only() {
        let ctx = context();
        let (_, token) = seed_user(&ctx, Role::Agent);
        let response = api_router(ctx)
            .oneshot(empty_request("GET", "/api/users", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn favorites_are_idempotent_and_skip_orphans() {
        let ctx = context();
        let (customer, token) = seed_user(&ctx, Role::Customer);
        let kept = listing(&ctx, "agent-1", PropertyStatus::Published);
        let doomed = listing(&ctx, "agent-1", PropertyStatus::Published);
        let store = ctx.store.clone();
        let router = api_router(ctx);

        for id in [&kept.id, &kept.id, &doomed.id] {
            let response = router
                .clone()
                .oneshot(empty_request("POST", &format!("/api/me/favorites/{}", id), Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(store.require::<User>(&customer.id).unwrap().favorites.len(), 2);

        store.delete::<Property>(&doomed.id).unwrap();
        let response = router
            .oneshot(empty_request("GET", "/api/me/favorites", Some(&token)))
            .await
            .unwrap();
        let favorites = read_json(response).await;
        assert_eq!(favorites.as_array().map(Vec::len), Some(1));
        assert_eq!(favorites[0]["id"], kept.id.as_str());
    }

    #[tokio::test]
    async fn drafts_can_only_be_saved_by_those_who_see_them() {
        let ctx = context();
        let (owner, owner_token) = seed_user(&ctx, Role::Agent);
        let (customer, token) = seed_user(&ctx, Role::Customer);
        let draft = listing(&ctx, &owner.id, PropertyStatus::Draft);
        let store = ctx.store.clone();
        let router = api_router(ctx);
        let uri = format!("/api/me/favorites/{}", draft.id);

        let response = router
            .clone()
            .oneshot(empty_request("POST", &uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(store.require::<User>(&customer.id).unwrap().favorites.is_empty());

        let response = router
            .oneshot(empty_request("POST", &uri, Some(&owner_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["favorites"][0], draft.id.as_str());
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let ctx = context();
        let (mut user, token) = seed_user(&ctx, Role::Customer);
        user.password_hash = crate::auth::password::hash_password("original-pass").unwrap();
        ctx.store.replace(user).unwrap();
        let router = api_router(ctx);

        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/me",
                Some(&token),
                json!({"current_password": "wrong-pass", "new_password": "brand-new-pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(json_request(
                "PUT",
                "/api/me",
                Some(&token),
                json!({"current_password": "original-pass", "new_password": "brand-new-pass", "name": "Renamed"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["name"], "Renamed");
    }
}
