use std::cmp::Ordering;

use serde::Deserialize;

use super::domain::{ListingType, Property, PropertyStatus};
use crate::auth::MaybeUser;

pub const DEFAULT_PER_PAGE: u32 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// `GET /api/properties` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyQuery {
    pub q: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub listing_type: Option<ListingType>,
    pub property_type: Option<String>,
    pub status: Option<PropertyStatus>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub developer: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub featured: Option<bool>,
    pub owner: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn same_text(filter: &Option<String>, value: &str) -> bool {
    filter
        .as_deref()
        .map(str::trim)
        .filter(|filter| !filter.is_empty())
        .map_or(true, |filter| filter.eq_ignore_ascii_case(value.trim()))
}

fn same_ref(filter: &Option<String>, value: Option<&str>) -> bool {
    match filter.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        None => true,
        Some(filter) => value == Some(filter),
    }
}

/// Non-published listings are visible to their owner and to admins only.
pub fn visible_to(property: &Property, caller: &MaybeUser) -> bool {
    property.is_published() || caller.is_admin() || caller.id() == Some(property.owner_id.as_str())
}

impl PropertyQuery {
    pub fn matches(&self, property: &Property) -> bool {
        let needle = self
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        if let Some(needle) = needle {
            let hit = property.title.to_lowercase().contains(&needle)
                || property.city.to_lowercase().contains(&needle)
                || property
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        same_text(&self.city, &property.city)
            && same_text(&self.state, property.state.as_deref().unwrap_or_default())
            && same_text(&self.property_type, &property.property_type)
            && self.listing_type.map_or(true, |kind| kind == property.listing_type)
            && self.status.map_or(true, |status| status == property.status)
            && same_ref(&self.category, property.category_id.as_deref())
            && same_ref(&self.location, property.location_id.as_deref())
            && same_ref(&self.developer, property.developer_id.as_deref())
            && same_ref(&self.owner, Some(property.owner_id.as_str()))
            && self.min_price.map_or(true, |min| property.price >= min)
            && self.max_price.map_or(true, |max| property.price <= max)
            && self.min_bedrooms.map_or(true, |min| property.bedrooms >= min)
            && self.featured.map_or(true, |featured| featured == property.featured)
    }

    /// Filters to what `caller` may see, then orders by the requested sort.
    pub fn run(&self, properties: Vec<Property>, caller: &MaybeUser) -> Vec<Property> {
        let mut hits: Vec<Property> = properties
            .into_iter()
            .filter(|property| visible_to(property, caller))
            .filter(|property| self.matches(property))
            .collect();

        match self.sort {
            SortOrder::Newest => hits.sort_by(|a, b| b.stamps.created_at.cmp(&a.stamps.created_at)),
            SortOrder::PriceAsc => hits.sort_by(|a, b| by_price(a, b)),
            SortOrder::PriceDesc => hits.sort_by(|a, b| by_price(b, a)),
        }
        hits
    }
}

fn by_price(a: &Property, b: &Property) -> Ordering {
    a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::super::domain::fixtures::input;
    use super::*;
    use crate::auth::{AuthUser, Role};

    fn listing(title: &str, price: f64, owner: &str) -> Property {
        Property::build(input(title, price), owner).unwrap()
    }

    fn anonymous() -> MaybeUser {
        MaybeUser(None)
    }

    #[test]
    fn public_callers_only_see_published() {
        let mut draft = listing("Draft", 10.0, "agent-1");
        draft.status = PropertyStatus::Draft;
        let live = listing("Live", 20.0, "agent-1");

        let hits = PropertyQuery::default().run(vec![draft.clone(), live], &anonymous());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Live");

        let owner = MaybeUser(Some(AuthUser {
            id: "agent-1".into(),
            name: "Agent".into(),
            email: "agent@example.com".into(),
            role: Role::Agent,
        }));
        assert!(visible_to(&draft, &owner));
    }

    #[test]
    fn price_window_and_sort() {
        let props = vec![
            listing("A", 300.0, "o"),
            listing("B", 100.0, "o"),
            listing("C", 200.0, "o"),
            listing("D", 900.0, "o"),
        ];
        let query = PropertyQuery {
            min_price: Some(150.0),
            max_price: Some(400.0),
            sort: SortOrder::PriceAsc,
            ..PropertyQuery::default()
        };
        let titles: Vec<_> = query
            .run(props, &anonymous())
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["C", "A"]);
    }

    #[test]
    fn text_search_covers_title_city_and_description() {
        let mut villa = listing("Villa", 1.0, "o");
        villa.description = Some("Private pool and garden".into());
        let flat = listing("Flat", 1.0, "o");

        let query = PropertyQuery {
            q: Some("POOL".into()),
            ..PropertyQuery::default()
        };
        assert!(query.matches(&villa));
        assert!(!query.matches(&flat));

        let by_city = PropertyQuery {
            city: Some("pune".into()),
            ..PropertyQuery::default()
        };
        assert!(by_city.matches(&flat));
    }
}
