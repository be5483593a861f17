use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthUser, Role};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};
use crate::notify::{dispatch, Notification};
use crate::properties::Property;
use crate::store::{new_id, Document, DocumentStore, StoreError, Timestamps};
use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Approved, Self::Rejected]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub property_id: String,
    pub user_id: String,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    pub status: ReviewStatus,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";

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
pub struct ReviewInput {
    pub property_id: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub status: Option<ReviewStatus>,
    pub property_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub status: ReviewStatus,
}

/// Approved reviews and their average, as shown on a listing page.
#[derive(Debug, Clone, Serialize)]
pub struct RatingSummary {
    pub property_id: String,
    pub average_rating: Option<f64>,
    pub count: usize,
    pub reviews: Vec<Review>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/reviews", get(list_handler).post(create_handler))
        .route("/api/reviews/:id", axum::routing::delete(delete_handler))
        .route("/api/reviews/:id/status", patch(moderate_handler))
}

/// Mean rating rounded to one decimal; `None` when there is nothing to average.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
    let mean = f64::from(total) / reviews.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

pub fn approved_for(store: &DocumentStore, property_id: &str) -> Result<Vec<Review>, StoreError> {
    let mut reviews = store.find(|review: &Review| {
        review.property_id == property_id && review.status == ReviewStatus::Approved
    })?;
    reviews.sort_by(|a, b| b.stamps.created_at.cmp(&a.stamps.created_at));
    Ok(reviews)
}

pub fn rating_summary(store: &DocumentStore, property_id: &str) -> Result<RatingSummary, StoreError> {
    let reviews = approved_for(store, property_id)?;
    Ok(RatingSummary {
        property_id: property_id.to_string(),
        average_rating: average_rating(&reviews),
        count: reviews.len(),
        reviews,
    })
}

pub(crate) async fn create_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<impl IntoResponse, ApiError> {
    let property = ctx.store.require::<Property>(input.property_id.trim())?;
    validation::in_range("rating", f64::from(input.rating), 1.0, 5.0)?;
    let comment = validation::required_text("comment", &input.comment, 2_000)?;

    let review = Review {
        id: new_id(),
        property_id: property.id.clone(),
        user_id: caller.id.clone(),
        author_name: caller.name.clone(),
        rating: input.rating,
        comment,
        status: ReviewStatus::Pending,
        stamps: Timestamps::now(),
    };

    let user_id = caller.id.clone();
    let stored = ctx
        .store
        .insert_unless(review, |other: &Review| {
            other.user_id == user_id && other.property_id == property.id
        })
        .map_err(|err| match err {
            StoreError::Conflict(_) => {
                ApiError::Conflict("you have already reviewed this property".to_string())
            }
            other => other.into(),
        })?;

    info!(review = %stored.id, property = %stored.property_id, user = %caller.id, "review submitted");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn list_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<ReviewQuery>,
) -> Result<Json<Paginated<Review>>, ApiError> {
    caller.require(&[Role::Admin])?;
    let mut reviews = ctx.store.find(|review: &Review| {
        query.status.map_or(true, |status| review.status == status)
            && query
                .property_id
                .as_deref()
                .map_or(true, |id| review.property_id == id)
    })?;
    reviews.sort_by(|a, b| b.stamps.created_at.cmp(&a.stamps.created_at));
    let page = Pagination::from_query(query.page, query.per_page, 20).apply(reviews);
    Ok(Json(page))
}

pub(crate) async fn moderate_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ModerationRequest>,
) -> Result<Json<Review>, ApiError> {
    caller.require(&[Role::Admin])?;
    if request.status == ReviewStatus::Pending {
        return Err(ValidationError::InvalidVariant {
            field: "status",
            value: ReviewStatus::Pending.label().to_string(),
        }
        .into());
    }

    let review = ctx
        .store
        .update(&id, |review: &mut Review| review.status = request.status)?;
    info!(review = %review.id, status = review.status.label(), admin = %caller.id, "review moderated");

    dispatch(
        ctx.notifier.as_ref(),
        Notification::new("review_moderated", Some(review.user_id.clone()), &review.id)
            .with_detail("status", review.status.label()),
    );
    Ok(Json(review))
}

pub(crate) async fn delete_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let review = ctx.store.require::<Review>(&id)?;
    caller.require_owner_or_admin(Some(&review.user_id))?;
    ctx.store.delete::<Review>(&id)?;
    info!(review = %id, user = %caller.id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8, status: ReviewStatus) -> Review {
        Review {
            id: new_id(),
            property_id: "p-1".into(),
            user_id: new_id(),
            author_name: "Ravi".into(),
            rating,
            comment: "Nice".into(),
            status,
            stamps: Timestamps::now(),
        }
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let reviews = vec![
            review(5, ReviewStatus::Approved),
            review(4, ReviewStatus::Approved),
            review(4, ReviewStatus::Approved),
        ];
        assert_eq!(average_rating(&reviews), Some(4.3));
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn summary_only_counts_approved() {
        let store = DocumentStore::in_memory();
        store.insert(review(5, ReviewStatus::Approved)).unwrap();
        store.insert(review(1, ReviewStatus::Pending)).unwrap();
        store.insert(review(2, ReviewStatus::Rejected)).unwrap();

        let summary = rating_summary(&store, "p-1").unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average_rating, Some(5.0));
    }
}
