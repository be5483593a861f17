use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthUser, Role};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};
use crate::notify::{dispatch, Notification};
use crate::store::{new_id, Document, Timestamps};
use crate::validation::{self, SHORT_TEXT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Open, Self::InProgress, Self::Resolved, Self::Closed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReply {
    pub author_id: String,
    pub author_name: String,
    pub staff: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Support request raised by any signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    #[serde(default)]
    pub replies: Vec<TicketReply>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for Ticket {
    const COLLECTION: &'static str = "tickets";

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

impl Ticket {
    /// Appends a reply. Staff replies pick up an open ticket.
    fn add_reply(&mut self, reply: TicketReply) -> Result<(), ApiError> {
        if self.status == TicketStatus::Closed {
            return Err(ApiError::BadRequest(
                "cannot reply to a closed ticket".to_string(),
            ));
        }
        if reply.staff && self.status == TicketStatus::Open {
            self.status = TicketStatus::InProgress;
        }
        self.replies.push(reply);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct TicketInput {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub priority: TicketPriority,
}

#[derive(Debug, Deserialize)]
pub struct ReplyInput {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/tickets", get(list_handler).post(create_handler))
        .route("/api/tickets/:id", get(get_handler).delete(delete_handler))
        .route("/api/tickets/:id/replies", post(reply_handler))
        .route("/api/tickets/:id/status", patch(status_handler))
}

/// Loads a ticket the caller may see. Someone else's ticket reads as missing.
fn visible_ticket(ctx: &AppContext, caller: &AuthUser, id: &str) -> Result<Ticket, ApiError> {
    match ctx.store.get::<Ticket>(id)? {
        Some(ticket) if caller.is_admin() || ticket.user_id == caller.id => Ok(ticket),
        _ => Err(ApiError::not_found("ticket", id)),
    }
}

pub(crate) async fn create_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiJson(input): ApiJson<TicketInput>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = Ticket {
        id: new_id(),
        user_id: caller.id.clone(),
        subject: validation::required_text("subject", &input.subject, SHORT_TEXT)?,
        message: validation::required_text("message", &input.message, 5_000)?,
        priority: input.priority,
        status: TicketStatus::Open,
        replies: Vec::new(),
        stamps: Timestamps::now(),
    };
    let stored = ctx.store.insert(ticket)?;
    info!(ticket = %stored.id, user = %caller.id, "ticket opened");
    dispatch(
        ctx.notifier.as_ref(),
        Notification::new("ticket_opened", None, &stored.id).with_detail("subject", &stored.subject),
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn list_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<TicketQuery>,
) -> Result<Json<Paginated<Ticket>>, ApiError> {
    let mut tickets = ctx.store.find(|ticket: &Ticket| {
        (caller.is_admin() || ticket.user_id == caller.id)
            && query.status.map_or(true, |status| ticket.status == status)
    })?;
    tickets.sort_by(|a, b| b.stamps.updated_at.cmp(&a.stamps.updated_at));
    let page = Pagination::from_query(query.page, query.per_page, 20).apply(tickets);
    Ok(Json(page))
}

pub(crate) async fn get_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    visible_ticket(&ctx, &caller, &id).map(Json)
}

pub(crate) async fn reply_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ReplyInput>,
) -> Result<impl IntoResponse, ApiError> {
    visible_ticket(&ctx, &caller, &id)?;
    let reply = TicketReply {
        author_id: caller.id.clone(),
        author_name: caller.name.clone(),
        staff: caller.is_admin(),
        message: validation::required_text("message", &input.message, 5_000)?,
        created_at: Utc::now(),
    };
    let stored = ctx
        .store
        .update_with(&id, |ticket: &mut Ticket| ticket.add_reply(reply))?;
    info!(ticket = %stored.id, user = %caller.id, status = stored.status.label(), "ticket reply added");

    if caller.is_admin() {
        dispatch(
            ctx.notifier.as_ref(),
            Notification::new("ticket_reply", Some(stored.user_id.clone()), &stored.id),
        );
    }
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn status_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<Ticket>, ApiError> {
    caller.require(&[Role::Admin])?;
    let ticket = ctx
        .store
        .update(&id, |ticket: &mut Ticket| ticket.status = request.status)?;
    info!(ticket = %ticket.id, status = ticket.status.label(), admin = %caller.id, "ticket status changed");
    Ok(Json(ticket))
}

pub(crate) async fn delete_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require(&[Role::Admin])?;
    ctx.store.delete::<Ticket>(&id)?;
    info!(ticket = %id, admin = %caller.id, "ticket deleted");
    Ok(StatusCode::NO_CONTENT)
}
