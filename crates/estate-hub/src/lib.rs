//! Real-estate marketplace backend: property listings, catalog taxonomies, reviews,
//! support tickets, editorial content, role dashboards, CRM leads and CSV transfer,
//! served as a JSON API over axum.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod content;
pub mod crm;
pub mod dashboard;
pub mod engagement;
pub mod error;
pub mod http;
pub mod media;
pub mod notify;
pub mod properties;
pub mod store;
pub mod telemetry;
pub mod transfer;
pub mod users;
pub mod validation;

#[cfg(test)]
mod testing;

pub use http::{api_router, ApiError, AppContext};
pub use store::DocumentStore;
