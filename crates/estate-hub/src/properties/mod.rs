//! Property listings: the domain model, search filters and the `/api/properties` routes.

mod domain;
mod query;
mod router;

pub use domain::{
    check_references, ListingType, Property, PropertyInput, PropertyPatch, PropertyStatus,
    MAX_ROOMS,
};
pub use query::{visible_to, PropertyQuery, SortOrder};
pub use router::routes;

pub(crate) use router::find_visible;
