//! Role-shaped summary numbers for the dashboard landing pages.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::{AuthUser, Role, User};
use crate::catalog::{Amenity, Category, Developer, Facility, Location, News, Region};
use crate::content::BlogPost;
use crate::crm::{Lead, LeadStatus};
use crate::engagement::{average_rating, Review, ReviewStatus, Ticket, TicketStatus};
use crate::http::{ApiError, AppContext};
use crate::properties::{Property, PropertyStatus};
use crate::store::{Document, DocumentStore, StoreError};

/// Count per status label; every label is present, zero included.
pub type StatusCounts = BTreeMap<&'static str, usize>;

fn tally<T, S: Copy + PartialEq>(
    labels: impl IntoIterator<Item = S>,
    label: fn(S) -> &'static str,
    items: &[T],
    status: impl Fn(&T) -> S,
) -> StatusCounts {
    labels
        .into_iter()
        .map(|s| (label(s), items.iter().filter(|item| status(item) == s).count()))
        .collect()
}

fn property_counts(properties: &[Property]) -> StatusCounts {
    tally(PropertyStatus::ordered(), PropertyStatus::label, properties, |p| p.status)
}

fn lead_counts(leads: &[Lead]) -> StatusCounts {
    tally(LeadStatus::ordered(), LeadStatus::label, leads, |l| l.status)
}

fn ticket_counts(tickets: &[Ticket]) -> StatusCounts {
    tally(TicketStatus::ordered(), TicketStatus::label, tickets, |t| t.status)
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub totals: BTreeMap<&'static str, usize>,
    pub users_by_role: BTreeMap<&'static str, usize>,
    pub properties_by_status: StatusCounts,
    pub leads_by_status: StatusCounts,
    pub open_tickets: usize,
    pub pending_reviews: usize,
}

#[derive(Debug, Serialize)]
pub struct AgentDashboard {
    pub properties_by_status: StatusCounts,
    pub leads_by_status: StatusCounts,
    pub average_rating: Option<f64>,
    pub review_count: usize,
}

#[derive(Debug, Serialize)]
pub struct BuilderDashboard {
    pub developers: usize,
    pub properties_by_status: StatusCounts,
}

#[derive(Debug, Serialize)]
pub struct CustomerDashboard {
    pub favorites: usize,
    pub reviews: usize,
    pub tickets_by_status: StatusCounts,
    pub leads: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Admin(AdminDashboard),
    Agent(AgentDashboard),
    Builder(BuilderDashboard),
    Customer(CustomerDashboard),
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/dashboard", get(dashboard_handler))
}

fn total<D: Document>(store: &DocumentStore) -> Result<(&'static str, usize), StoreError> {
    Ok((D::COLLECTION, store.count(|_: &D| true)?))
}

pub fn admin(store: &DocumentStore) -> Result<AdminDashboard, StoreError> {
    let totals = [
        total::<User>(store)?,
        total::<Property>(store)?,
        total::<Category>(store)?,
        total::<Amenity>(store)?,
        total::<Facility>(store)?,
        total::<Region>(store)?,
        total::<Location>(store)?,
        total::<Developer>(store)?,
        total::<Review>(store)?,
        total::<Ticket>(store)?,
        total::<BlogPost>(store)?,
        total::<News>(store)?,
        total::<Lead>(store)?,
    ]
    .into_iter()
    .collect();

    let users = store.all::<User>()?;
    let users_by_role = tally(Role::ordered(), Role::label, &users, |u| u.role);

    Ok(AdminDashboard {
        totals,
        users_by_role,
        properties_by_status: property_counts(&store.all::<Property>()?),
        leads_by_status: lead_counts(&store.all::<Lead>()?),
        open_tickets: store.count(|t: &Ticket| {
            matches!(t.status, TicketStatus::Open | TicketStatus::InProgress)
        })?,
        pending_reviews: store.count(|r: &Review| r.status == ReviewStatus::Pending)?,
    })
}

pub fn agent(store: &DocumentStore, agent_id: &str) -> Result<AgentDashboard, StoreError> {
    let properties = store.find(|p: &Property| p.owner_id == agent_id)?;
    let leads = store.find(|l: &Lead| l.assigned_agent_id.as_deref() == Some(agent_id))?;
    let reviews = store.find(|r: &Review| {
        r.status == ReviewStatus::Approved && properties.iter().any(|p| p.id == r.property_id)
    })?;

    Ok(AgentDashboard {
        properties_by_status: property_counts(&properties),
        leads_by_status: lead_counts(&leads),
        average_rating: average_rating(&reviews),
        review_count: reviews.len(),
    })
}

pub fn builder(store: &DocumentStore, builder_id: &str) -> Result<BuilderDashboard, StoreError> {
    let developers = store.find(|d: &Developer| d.owner_id.as_deref() == Some(builder_id))?;
    let properties = store.find(|p: &Property| {
        p.developer_id
            .as_deref()
            .is_some_and(|id| developers.iter().any(|d| d.id == id))
    })?;

    Ok(BuilderDashboard {
        developers: developers.len(),
        properties_by_status: property_counts(&properties),
    })
}

pub fn customer(store: &DocumentStore, user_id: &str) -> Result<CustomerDashboard, StoreError> {
    let mut favorites = 0;
    if let Some(user) = store.get::<User>(user_id)? {
        for id in &user.favorites {
            if store.exists::<Property>(id)? {
                favorites += 1;
            }
        }
    }
    let tickets = store.find(|t: &Ticket| t.user_id == user_id)?;

    Ok(CustomerDashboard {
        favorites,
        reviews: store.count(|r: &Review| r.user_id == user_id)?,
        tickets_by_status: ticket_counts(&tickets),
        leads: store.count(|l: &Lead| l.customer_id.as_deref() == Some(user_id))?,
    })
}

pub(crate) async fn dashboard_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = match caller.role {
        Role::Admin => Dashboard::Admin(admin(&ctx.store)?),
        Role::Agent => Dashboard::Agent(agent(&ctx.store, &caller.id)?),
        Role::Builder => Dashboard::Builder(builder(&ctx.store, &caller.id)?),
        Role::Customer => Dashboard::Customer(customer(&ctx.store, &caller.id)?),
    };
    Ok(Json(dashboard))
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::http::api_router;
    use crate::store::{new_id, Timestamps};
    use crate::testing::{context, empty_request, read_json, seed_user};

    fn lead(agent: Option<&str>, status: LeadStatus) -> Lead {
        Lead {
            id: new_id(),
            name: "Lead".into(),
            email: "lead@example.com".into(),
            phone: None,
            message: None,
            property_id: None,
            source: "website".into(),
            status,
            assigned_agent_id: agent.map(str::to_string),
            customer_id: None,
            communications: Vec::new(),
            stamps: Timestamps::now(),
        }
    }

    #[test]
    fn tally_reports_every_status() {
        let leads = vec![lead(None, LeadStatus::New), lead(None, LeadStatus::New)];
        let counts = lead_counts(&leads);
        assert_eq!(counts.len(), LeadStatus::ordered().len());
        assert_eq!(counts["new"], 2);
        assert_eq!(counts["lost"], 0);
    }

    #[test]
    fn agent_stats_only_cover_assigned_leads() {
        let store = DocumentStore::in_memory();
        store.insert(lead(Some("agent-1"), LeadStatus::Qualified)).unwrap();
        store.insert(lead(Some("agent-2"), LeadStatus::New)).unwrap();

        let stats = agent(&store, "agent-1").unwrap();
        assert_eq!(stats.leads_by_status["qualified"], 1);
        assert_eq!(stats.leads_by_status["new"], 0);
        assert_eq!(stats.average_rating, None);
    }

    #[test]
    fn customer_favorites_skip_deleted_listings() {
        let ctx = context();
        let (buyer, _) = seed_user(&ctx, Role::Customer);
        let property = ctx
            .store
            .insert_with_slug(Property {
                id: new_id(),
                title: "Corner Shop".into(),
                slug: String::new(),
                description: None,
                listing_type: crate::properties::ListingType::Rent,
                property_type: "commercial".into(),
                status: PropertyStatus::Published,
                price: 900.0,
                area_sqft: None,
                bedrooms: 0,
                bathrooms: 1,
                address: None,
                city: "Leeds".into(),
                state: None,
                location_id: None,
                category_id: None,
                developer_id: None,
                amenity_ids: Vec::new(),
                facility_ids: Vec::new(),
                images: Vec::new(),
                featured: false,
                owner_id: "agent-1".into(),
                stamps: Timestamps::now(),
            })
            .unwrap();
        ctx.store
            .update(&buyer.id, |user: &mut User| {
                user.favorites = vec![property.id.clone(), "deleted-listing".into()];
            })
            .unwrap();

        let stats = customer(&ctx.store, &buyer.id).unwrap();
        assert_eq!(stats.favorites, 1);
    }

    #[tokio::test]
    async fn dashboard_is_tagged_by_role() {
        let ctx = context();
        let (_, admin_token) = seed_user(&ctx, Role::Admin);
        let (_, customer_token) = seed_user(&ctx, Role::Customer);
        let router = api_router(ctx);

        let response = router
            .clone()
            .oneshot(empty_request("GET", "/api/dashboard", Some(&admin_token)))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["role"], "admin");
        assert_eq!(body["totals"]["users"], 2);

        let response = router
            .oneshot(empty_request("GET", "/api/dashboard", Some(&customer_token)))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["role"], "customer");
        assert_eq!(body["tickets_by_status"]["open"], 0);
    }
}
