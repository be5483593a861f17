use serde::{Deserialize, Serialize};

use crate::catalog::{Amenity, Category, Developer, Facility, Location};
use crate::http::ApiError;
use crate::store::{new_id, Document, DocumentStore, Sluggable, Timestamps};
use crate::validation::{self, ValidationError, LONG_TEXT, SHORT_TEXT};

pub const MAX_ROOMS: u32 = 100;
const MAX_IMAGES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Rent,
}

impl ListingType {
    pub const fn ordered() -> [Self; 2] {
        [Self::Sale, Self::Rent]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Draft,
    Published,
    Sold,
    Rented,
}

impl PropertyStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Draft, Self::Published, Self::Sold, Self::Rented]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Sold => "sold",
            Self::Rented => "rented",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value))
    }
}

/// A real-estate listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub listing_type: ListingType,
    pub property_type: String,
    pub status: PropertyStatus,
    pub price: f64,
    #[serde(default)]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub address: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub developer_id: Option<String>,
    #[serde(default)]
    pub amenity_ids: Vec<String>,
    #[serde(default)]
    pub facility_ids: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub owner_id: String,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for Property {
    const COLLECTION: &'static str = "properties";

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

impl Sluggable for Property {
    const SLUG_STEM: &'static str = "property";

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

fn default_property_type() -> String {
    "apartment".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub listing_type: ListingType,
    #[serde(default = "default_property_type")]
    pub property_type: String,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    pub price: f64,
    #[serde(default)]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub address: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub developer_id: Option<String>,
    #[serde(default)]
    pub amenity_ids: Vec<String>,
    #[serde(default)]
    pub facility_ids: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub listing_type: Option<ListingType>,
    pub property_type: Option<String>,
    pub status: Option<PropertyStatus>,
    pub price: Option<f64>,
    pub area_sqft: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub developer_id: Option<String>,
    pub amenity_ids: Option<Vec<String>>,
    pub facility_ids: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Property {
    /// Builds a new listing owned by `owner_id`. New listings are published unless the
    /// input says otherwise.
    pub fn build(input: PropertyInput, owner_id: &str) -> Result<Self, ValidationError> {
        let mut property = Self {
            id: new_id(),
            title: input.title,
            slug: String::new(),
            description: input.description,
            listing_type: input.listing_type,
            property_type: input.property_type,
            status: input.status.unwrap_or(PropertyStatus::Published),
            price: input.price,
            area_sqft: input.area_sqft,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            address: input.address,
            city: input.city,
            state: input.state,
            location_id: input.location_id,
            category_id: input.category_id,
            developer_id: input.developer_id,
            amenity_ids: input.amenity_ids,
            facility_ids: input.facility_ids,
            images: input.images,
            featured: input.featured,
            owner_id: owner_id.to_string(),
            stamps: Timestamps::now(),
        };
        property.normalize()?;
        Ok(property)
    }

    pub fn apply(&mut self, patch: PropertyPatch) -> Result<(), ValidationError> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(listing_type) = patch.listing_type {
            self.listing_type = listing_type;
        }
        if let Some(property_type) = patch.property_type {
            self.property_type = property_type;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(area) = patch.area_sqft {
            self.area_sqft = Some(area);
        }
        if let Some(bedrooms) = patch.bedrooms {
            self.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = patch.bathrooms {
            self.bathrooms = bathrooms;
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(state) = patch.state {
            self.state = Some(state);
        }
        if let Some(location_id) = patch.location_id {
            self.location_id = Some(location_id);
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = Some(category_id);
        }
        if let Some(developer_id) = patch.developer_id {
            self.developer_id = Some(developer_id);
        }
        if let Some(amenity_ids) = patch.amenity_ids {
            self.amenity_ids = amenity_ids;
        }
        if let Some(facility_ids) = patch.facility_ids {
            self.facility_ids = facility_ids;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        self.normalize()
    }

    pub fn is_published(&self) -> bool {
        self.status == PropertyStatus::Published
    }

    /// Trims text fields, drops blank references and enforces field ranges.
    fn normalize(&mut self) -> Result<(), ValidationError> {
        self.title = validation::required_text("title", &self.title, SHORT_TEXT)?;
        self.description =
            validation::optional_text("description", self.description.as_deref(), LONG_TEXT)?;
        self.property_type =
            validation::required_text("property_type", &self.property_type, 60)?.to_lowercase();
        self.city = validation::required_text("city", &self.city, SHORT_TEXT)?;
        self.address = validation::optional_text("address", self.address.as_deref(), 500)?;
        self.state = validation::optional_text("state", self.state.as_deref(), SHORT_TEXT)?;

        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ValidationError::InvalidFormat {
                field: "price",
                reason: "must be greater than zero",
            });
        }
        if let Some(area) = self.area_sqft {
            if !area.is_finite() || area <= 0.0 {
                return Err(ValidationError::InvalidFormat {
                    field: "area_sqft",
                    reason: "must be greater than zero",
                });
            }
        }
        validation::in_range("bedrooms", f64::from(self.bedrooms), 0.0, f64::from(MAX_ROOMS))?;
        validation::in_range("bathrooms", f64::from(self.bathrooms), 0.0, f64::from(MAX_ROOMS))?;

        self.location_id = blank_to_none(self.location_id.take());
        self.category_id = blank_to_none(self.category_id.take());
        self.developer_id = blank_to_none(self.developer_id.take());
        self.amenity_ids = validation::clean_list(std::mem::take(&mut self.amenity_ids));
        self.facility_ids = validation::clean_list(std::mem::take(&mut self.facility_ids));
        self.images = validation::clean_list(std::mem::take(&mut self.images));
        if self.images.len() > MAX_IMAGES {
            return Err(ValidationError::TooLong {
                field: "images",
                max: MAX_IMAGES,
            });
        }
        Ok(())
    }
}

/// Rejects listings that point at categories, locations, developers, amenities or
/// facilities that do not exist.
pub fn check_references(store: &DocumentStore, property: &Property) -> Result<(), ApiError> {
    fn ensure<D: Document>(
        store: &DocumentStore,
        field: &'static str,
        id: Option<&str>,
    ) -> Result<(), ApiError> {
        match id {
            Some(id) if !store.exists::<D>(id)? => Err(ValidationError::MissingReference {
                field,
                id: id.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    ensure::<Category>(store, "category_id", property.category_id.as_deref())?;
    ensure::<Location>(store, "location_id", property.location_id.as_deref())?;
    ensure::<Developer>(store, "developer_id", property.developer_id.as_deref())?;
    for id in &property.amenity_ids {
        ensure::<Amenity>(store, "amenity_ids", Some(id))?;
    }
    for id in &property.facility_ids {
        ensure::<Facility>(store, "facility_ids", Some(id))?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::input;
    use super::*;

    #[test]
    fn new_listings_default_to_published() {
        let property = Property::build(input("  Sea View Flat ", 9_500_000.0), "agent-1").unwrap();
        assert_eq!(property.title, "Sea View Flat");
        assert_eq!(property.status, PropertyStatus::Published);
        assert_eq!(property.owner_id, "agent-1");
    }

    #[test]
    fn price_must_be_positive() {
        let err = Property::build(input("Flat", 0.0), "agent-1").expect_err("invalid");
        assert!(matches!(err, ValidationError::InvalidFormat { field: "price", .. }));
    }

    #[test]
    fn room_counts_are_bounded() {
        let mut raw = input("Mansion", 1.0);
        raw.bedrooms = 101;
        assert!(matches!(
            Property::build(raw, "a"),
            Err(ValidationError::OutOfRange { field: "bedrooms", .. })
        ));
    }

    #[test]
    fn patch_revalidates() {
        let mut property = Property::build(input("Loft", 100.0), "a").unwrap();
        let err = property
            .apply(PropertyPatch {
                title: Some("   ".into()),
                ..PropertyPatch::default()
            })
            .expect_err("blank title");
        assert_eq!(err, ValidationError::Empty { field: "title" });

        property
            .apply(PropertyPatch {
                category_id: Some("  ".into()),
                price: Some(250.0),
                ..PropertyPatch::default()
            })
            .unwrap();
        assert_eq!(property.category_id, None);
        assert_eq!(property.price, 250.0);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let store = DocumentStore::in_memory();
        let mut raw = input("Loft", 100.0);
        raw.category_id = Some("missing".into());
        let property = Property::build(raw, "a").unwrap();
        let err = check_references(&store, &property).expect_err("missing");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn enum_labels_parse_back() {
        assert_eq!(ListingType::parse("RENT"), Some(ListingType::Rent));
        assert_eq!(PropertyStatus::parse("sold"), Some(PropertyStatus::Sold));
        assert_eq!(PropertyStatus::parse("archived"), None);
    }
}
