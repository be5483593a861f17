//! Lead intake and CRM tracking: assignment to agents, status pipeline and the log of
//! calls, emails and meetings held with each prospect.

mod domain;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::{AuthUser, MaybeUser, Role, User};
use crate::http::{ApiError, ApiJson, ApiQuery, AppContext, Paginated, Pagination};
use crate::notify::{dispatch, Notification};
use crate::properties::Property;
use crate::store::{new_id, Timestamps};
use crate::validation::{self, ValidationError, SHORT_TEXT};

pub use domain::{
    Channel, Communication, CommunicationInput, Lead, LeadInput, LeadQuery, LeadStatus,
    LeadUpdate,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/leads", get(list_handler).post(create_handler))
        .route(
            "/api/leads/:id",
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
        .route("/api/leads/:id/communications", post(communication_handler))
}

/// Loads a lead the caller works on. Agents only see leads assigned to them; anything
/// else reads as missing.
fn workable_lead(ctx: &AppContext, caller: &AuthUser, id: &str) -> Result<Lead, ApiError> {
    caller.require(&[Role::Admin, Role::Agent])?;
    match ctx.store.get::<Lead>(id)? {
        Some(lead)
            if caller.is_admin() || lead.assigned_agent_id.as_deref() == Some(caller.id.as_str()) =>
        {
            Ok(lead)
        }
        _ => Err(ApiError::not_found("lead", id)),
    }
}

/// The property owner, when that owner is an active agent.
fn owning_agent(ctx: &AppContext, property: &Property) -> Result<Option<String>, ApiError> {
    let owner = ctx.store.get::<User>(&property.owner_id)?;
    Ok(owner
        .filter(|user| user.active && user.role == Role::Agent)
        .map(|user| user.id))
}

pub(crate) async fn create_handler(
    State(ctx): State<AppContext>,
    caller: MaybeUser,
    ApiJson(input): ApiJson<LeadInput>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validation::required_text("name", &input.name, SHORT_TEXT)?;
    let email = validation::email("email", &input.email)?;
    let phone = validation::optional_text("phone", input.phone.as_deref(), 40)?;
    let message = validation::optional_text("message", input.message.as_deref(), 5_000)?;
    let source = validation::optional_text("source", input.source.as_deref(), 60)?
        .unwrap_or_else(|| "website".to_string());

    let property_id = input
        .property_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let assigned_agent_id = match &property_id {
        Some(id) => {
            let property = ctx.store.get::<Property>(id)?.ok_or_else(|| {
                ValidationError::MissingReference {
                    field: "property_id",
                    id: id.clone(),
                }
            })?;
            owning_agent(&ctx, &property)?
        }
        None => None,
    };

    let lead = Lead {
        id: new_id(),
        name,
        email,
        phone,
        message,
        property_id,
        source,
        status: LeadStatus::New,
        assigned_agent_id,
        customer_id: caller.id().map(str::to_string),
        communications: Vec::new(),
        stamps: Timestamps::now(),
    };
    let stored = ctx.store.insert(lead)?;
    info!(
        lead = %stored.id,
        property = stored.property_id.as_deref().unwrap_or("-"),
        agent = stored.assigned_agent_id.as_deref().unwrap_or("-"),
        "lead captured"
    );

    let mut notification =
        Notification::new("lead_created", stored.assigned_agent_id.clone(), &stored.id)
            .with_detail("name", &stored.name)
            .with_detail("email", &stored.email);
    if let Some(property_id) = &stored.property_id {
        notification = notification.with_detail("property_id", property_id);
    }
    dispatch(ctx.notifier.as_ref(), notification);

    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn list_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<LeadQuery>,
) -> Result<Json<Paginated<Lead>>, ApiError> {
    caller.require(&[Role::Admin, Role::Agent])?;
    let mut leads = ctx.store.find(|lead: &Lead| {
        (caller.is_admin() || lead.assigned_agent_id.as_deref() == Some(caller.id.as_str()))
            && query.status.map_or(true, |status| lead.status == status)
            && query
                .property_id
                .as_deref()
                .map_or(true, |id| lead.property_id.as_deref() == Some(id))
    })?;
    leads.sort_by(|a, b| b.stamps.created_at.cmp(&a.stamps.created_at));
    let page = Pagination::from_query(query.page, query.per_page, 20).apply(leads);
    Ok(Json(page))
}

pub(crate) async fn get_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    workable_lead(&ctx, &caller, &id).map(Json)
}

pub(crate) async fn update_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<LeadUpdate>,
) -> Result<Json<Lead>, ApiError> {
    workable_lead(&ctx, &caller, &id)?;

    // `Some(None)` clears the assignment.
    let assignment = match update.assigned_agent_id {
        None => None,
        Some(_) if !caller.is_admin() => {
            warn!(user = %caller.id, lead = %id, "lead reassignment refused");
            return Err(ApiError::forbidden("only admins may reassign leads"));
        }
        Some(assignee) if assignee.trim().is_empty() => Some(None),
        Some(assignee) => {
            let agent = ctx
                .store
                .get::<User>(assignee.trim())?
                .filter(|user| user.active && user.role == Role::Agent)
                .ok_or(ValidationError::InvalidFormat {
                    field: "assigned_agent_id",
                    reason: "must reference an active agent",
                })?;
            Some(Some(agent.id))
        }
    };

    let mut newly_assigned = None;
    let stored = ctx.store.update(&id, |lead: &mut Lead| {
        if let Some(assignee) = assignment {
            if assignee.is_some() && lead.assigned_agent_id != assignee {
                newly_assigned = assignee.clone();
            }
            lead.assigned_agent_id = assignee;
        }
        if let Some(status) = update.status {
            lead.status = status;
        }
    })?;
    info!(
        lead = %stored.id,
        status = stored.status.label(),
        agent = stored.assigned_agent_id.as_deref().unwrap_or("-"),
        user = %caller.id,
        "lead updated"
    );

    if let Some(agent_id) = newly_assigned {
        dispatch(
            ctx.notifier.as_ref(),
            Notification::new("lead_assigned", Some(agent_id), &stored.id)
                .with_detail("name", &stored.name),
        );
    }
    Ok(Json(stored))
}

pub(crate) async fn communication_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CommunicationInput>,
) -> Result<impl IntoResponse, ApiError> {
    workable_lead(&ctx, &caller, &id)?;
    let entry = Communication {
        id: new_id(),
        channel: input.channel,
        summary: validation::required_text("summary", &input.summary, 5_000)?,
        author_id: caller.id.clone(),
        author_name: caller.name.clone(),
        created_at: Utc::now(),
    };
    let stored = ctx.store.update(&id, |lead: &mut Lead| lead.record(entry))?;
    info!(lead = %stored.id, channel = input.channel.label(), user = %caller.id, "lead communication logged");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn delete_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require(&[Role::Admin])?;
    ctx.store.delete::<Lead>(&id)?;
    info!(lead = %id, admin = %caller.id, "lead deleted");
    Ok(StatusCode::NO_CONTENT)
}
