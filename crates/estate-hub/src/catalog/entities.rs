use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CatalogResource;
use crate::auth::{AuthUser, Role, User};
use crate::http::ApiError;
use crate::store::{new_id, Document, DocumentStore, Sluggable, StoreError, Timestamps};
use crate::validation::{self, ValidationError, LONG_TEXT, SHORT_TEXT};

macro_rules! document {
    ($ty:ty, $collection:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;

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
    };
}

macro_rules! sluggable {
    ($ty:ty, $stem:literal) => {
        impl Sluggable for $ty {
            const SLUG_STEM: &'static str = $stem;

            fn slug_source(&self) -> &str {
                &self.name
            }

            fn slug(&self) -> &str {
                &self.slug
            }

            fn set_slug(&mut self, slug: String) {
                self.slug = slug;
            }
        }
    };
}

fn default_true() -> bool {
    true
}

fn optional_url(field: &'static str, value: Option<&str>) -> Result<Option<String>, ValidationError> {
    let url = validation::optional_text(field, value, 500)?;
    if let Some(url) = &url {
        if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/')) {
            return Err(ValidationError::InvalidFormat {
                field,
                reason: "must be an absolute http(s) URL or a site path",
            });
        }
    }
    Ok(url)
}

/// Listing category such as "Apartment" or "Commercial".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

document!(Category, "categories");
sluggable!(Category, "category");

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl CatalogResource for Category {
    const PATH: &'static str = "categories";
    type Create = CategoryInput;
    type Update = CategoryPatch;

    fn build(input: CategoryInput, _caller: &AuthUser) -> Result<Self, ValidationError> {
        Ok(Self {
            id: new_id(),
            name: validation::required_text("name", &input.name, SHORT_TEXT)?,
            slug: String::new(),
            description: validation::optional_text("description", input.description.as_deref(), LONG_TEXT)?,
            active: input.active,
            stamps: Timestamps::now(),
        })
    }

    fn apply(&mut self, patch: CategoryPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = validation::required_text("name", &name, SHORT_TEXT)?;
        }
        if let Some(description) = patch.description {
            self.description =
                validation::optional_text("description", Some(&description), LONG_TEXT)?;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.stamps.created_at
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn slug_value(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.insert_with_slug(doc)
    }

    fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.replace_with_slug(doc)
    }
}

/// Named feature with an optional icon; shared shape of amenities and facilities.
#[derive(Debug, Deserialize)]
pub struct FeatureInput {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturePatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub active: Option<bool>,
}

macro_rules! feature_resource {
    ($ty:ident, $collection:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $ty {
            pub id: String,
            pub name: String,
            #[serde(default)]
            pub icon: Option<String>,
            pub active: bool,
            #[serde(flatten)]
            pub stamps: Timestamps,
        }

        document!($ty, $collection);

        impl CatalogResource for $ty {
            const PATH: &'static str = $collection;
            type Create = FeatureInput;
            type Update = FeaturePatch;

            fn build(input: FeatureInput, _caller: &AuthUser) -> Result<Self, ValidationError> {
                Ok(Self {
                    id: new_id(),
                    name: validation::required_text("name", &input.name, SHORT_TEXT)?,
                    icon: validation::optional_text("icon", input.icon.as_deref(), SHORT_TEXT)?,
                    active: input.active,
                    stamps: Timestamps::now(),
                })
            }

            fn apply(&mut self, patch: FeaturePatch) -> Result<(), ValidationError> {
                if let Some(name) = patch.name {
                    self.name = validation::required_text("name", &name, SHORT_TEXT)?;
                }
                if let Some(icon) = patch.icon {
                    self.icon = validation::optional_text("icon", Some(&icon), SHORT_TEXT)?;
                }
                if let Some(active) = patch.active {
                    self.active = active;
                }
                Ok(())
            }

            fn display_name(&self) -> &str {
                &self.name
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.stamps.created_at
            }

            fn is_active(&self) -> bool {
                self.active
            }

            fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
                let name = doc.name.to_lowercase();
                store.insert_unless(doc, |other: &Self| other.name.to_lowercase() == name)
            }

            fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
                let name = doc.name.to_lowercase();
                store.replace_unless(doc, |other: &Self| other.name.to_lowercase() == name)
            }
        }
    };
}

feature_resource!(Amenity, "amenities", "In-unit or building amenity (pool, gym, ...).");
feature_resource!(Facility, "facilities", "Nearby facility (school, hospital, metro, ...).");

/// State or province used to group locations and listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub code: String,
    pub active: bool,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

document!(Region, "states");

#[derive(Debug, Deserialize)]
pub struct RegionInput {
    pub name: String,
    pub code: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegionPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub active: Option<bool>,
}

fn region_code(code: &str) -> Result<String, ValidationError> {
    let code = validation::required_text("code", code, 5)?.to_ascii_uppercase();
    if code.len() < 2 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "code",
            reason: "must be 2-5 ASCII letters or digits",
        });
    }
    Ok(code)
}

impl CatalogResource for Region {
    const PATH: &'static str = "states";
    type Create = RegionInput;
    type Update = RegionPatch;

    fn build(input: RegionInput, _caller: &AuthUser) -> Result<Self, ValidationError> {
        Ok(Self {
            id: new_id(),
            name: validation::required_text("name", &input.name, SHORT_TEXT)?,
            code: region_code(&input.code)?,
            active: input.active,
            stamps: Timestamps::now(),
        })
    }

    fn apply(&mut self, patch: RegionPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = validation::required_text("name", &name, SHORT_TEXT)?;
        }
        if let Some(code) = patch.code {
            self.code = region_code(&code)?;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.stamps.created_at
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn slug_value(&self) -> Option<&str> {
        Some(&self.code)
    }

    fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        let code = doc.code.clone();
        store.insert_unless(doc, |other: &Self| other.code == code)
    }

    fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        let code = doc.code.clone();
        store.replace_unless(doc, |other: &Self| other.code == code)
    }
}

/// Neighbourhood or locality a listing belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub active: bool,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

document!(Location, "locations");
sluggable!(Location, "location");

#[derive(Debug, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub active: Option<bool>,
}

impl CatalogResource for Location {
    const PATH: &'static str = "locations";
    type Create = LocationInput;
    type Update = LocationPatch;

    fn build(input: LocationInput, _caller: &AuthUser) -> Result<Self, ValidationError> {
        Ok(Self {
            id: new_id(),
            name: validation::required_text("name", &input.name, SHORT_TEXT)?,
            slug: String::new(),
            city: validation::required_text("city", &input.city, SHORT_TEXT)?,
            state: validation::optional_text("state", input.state.as_deref(), SHORT_TEXT)?,
            active: input.active,
            stamps: Timestamps::now(),
        })
    }

    fn apply(&mut self, patch: LocationPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = validation::required_text("name", &name, SHORT_TEXT)?;
        }
        if let Some(city) = patch.city {
            self.city = validation::required_text("city", &city, SHORT_TEXT)?;
        }
        if let Some(state) = patch.state {
            self.state = validation::optional_text("state", Some(&state), SHORT_TEXT)?;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.stamps.created_at
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn slug_value(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.insert_with_slug(doc)
    }

    fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.replace_with_slug(doc)
    }
}

/// Builder or development company; builders manage the developers they own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub active: bool,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

document!(Developer, "developers");
sluggable!(Developer, "developer");

#[derive(Debug, Deserialize)]
pub struct DeveloperInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    /// Only honoured for admins; builders always own what they create.
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeveloperPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub active: Option<bool>,
}

impl CatalogResource for Developer {
    const PATH: &'static str = "developers";
    type Create = DeveloperInput;
    type Update = DeveloperPatch;

    fn build(input: DeveloperInput, caller: &AuthUser) -> Result<Self, ValidationError> {
        let owner_id = match caller.role {
            Role::Builder => Some(caller.id.clone()),
            _ => input.owner_id.filter(|id| !id.trim().is_empty()),
        };
        Ok(Self {
            id: new_id(),
            name: validation::required_text("name", &input.name, SHORT_TEXT)?,
            slug: String::new(),
            description: validation::optional_text("description", input.description.as_deref(), LONG_TEXT)?,
            website: optional_url("website", input.website.as_deref())?,
            logo: optional_url("logo", input.logo.as_deref())?,
            owner_id,
            active: input.active,
            stamps: Timestamps::now(),
        })
    }

    fn apply(&mut self, patch: DeveloperPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = validation::required_text("name", &name, SHORT_TEXT)?;
        }
        if let Some(description) = patch.description {
            self.description =
                validation::optional_text("description", Some(&description), LONG_TEXT)?;
        }
        if let Some(website) = patch.website {
            self.website = optional_url("website", Some(&website))?;
        }
        if let Some(logo) = patch.logo {
            self.logo = optional_url("logo", Some(&logo))?;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.stamps.created_at
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn slug_value(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn writers() -> &'static [Role] {
        &[Role::Admin, Role::Builder]
    }

    fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// An owner set by an admin must be an active builder account.
    fn check_references(&self, store: &DocumentStore) -> Result<(), ApiError> {
        let Some(owner_id) = self.owner_id.as_deref() else {
            return Ok(());
        };
        store
            .get::<User>(owner_id)?
            .filter(|user| user.active && user.role == Role::Builder)
            .ok_or(ValidationError::InvalidFormat {
                field: "owner_id",
                reason: "must reference an active builder",
            })?;
        Ok(())
    }

    fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.insert_with_slug(doc)
    }

    fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        store.replace_with_slug(doc)
    }
}

/// Search-engine metadata for one site path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoPage {
    pub id: String,
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

document!(SeoPage, "seo_pages");

#[derive(Debug, Deserialize)]
pub struct SeoPageInput {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeoPagePatch {
    pub path: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
}

fn site_path(path: &str) -> Result<String, ValidationError> {
    let path = validation::required_text("path", path, 500)?;
    if !path.starts_with('/') || path.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "path",
            reason: "must start with '/' and contain no whitespace",
        });
    }
    Ok(path)
}

impl CatalogResource for SeoPage {
    const PATH: &'static str = "seo-pages";
    type Create = SeoPageInput;
    type Update = SeoPagePatch;

    fn build(input: SeoPageInput, _caller: &AuthUser) -> Result<Self, ValidationError> {
        Ok(Self {
            id: new_id(),
            path: site_path(&input.path)?,
            title: validation::required_text("title", &input.title, SHORT_TEXT)?,
            description: validation::optional_text("description", input.description.as_deref(), 1000)?,
            keywords: validation::clean_list(input.keywords),
            stamps: Timestamps::now(),
        })
    }

    fn apply(&mut self, patch: SeoPagePatch) -> Result<(), ValidationError> {
        if let Some(path) = patch.path {
            self.path = site_path(&path)?;
        }
        if let Some(title) = patch.title {
            self.title = validation::required_text("title", &title, SHORT_TEXT)?;
        }
        if let Some(description) = patch.description {
            self.description = validation::optional_text("description", Some(&description), 1000)?;
        }
        if let Some(keywords) = patch.keywords {
            self.keywords = validation::clean_list(keywords);
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        &self.path
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.stamps.created_at
    }

    fn persist_new(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        let path = doc.path.clone();
        store.insert_unless(doc, |other: &Self| other.path == path)
    }

    fn persist_update(store: &DocumentStore, doc: Self) -> Result<Self, StoreError> {
        let path = doc.path.clone();
        store.replace_unless(doc, |other: &Self| other.path == path)
    }
}

/// Short market news item; only published items are public.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct News {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub body: String,
    #[serde(default)]
    pub source_url: Option<String>,
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

document!(News, "news");

#[derive(Debug, Deserialize)]
pub struct NewsInput {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub body: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub source_url: Option<String>,
    pub published: Option<bool>,
}

impl News {
    fn set_published(&mut self, published: bool) {
        self.published = published;
        if published && self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
    }
}

impl CatalogResource for News {
    const PATH: &'static str = "news";
    const NEWEST_FIRST: bool = true;
    type Create = NewsInput;
    type Update = NewsPatch;

    fn build(input: NewsInput, _caller: &AuthUser) -> Result<Self, ValidationError> {
        let mut news = Self {
            id: new_id(),
            title: validation::required_text("title", &input.title, SHORT_TEXT)?,
            summary: validation::optional_text("summary", input.summary.as_deref(), 1000)?,
            body: validation::required_text("body", &input.body, LONG_TEXT)?,
            source_url: optional_url("source_url", input.source_url.as_deref())?,
            published: false,
            published_at: None,
            stamps: Timestamps::now(),
        };
        news.set_published(input.published);
        Ok(news)
    }

    fn apply(&mut self, patch: NewsPatch) -> Result<(), ValidationError> {
        if let Some(title) = patch.title {
            self.title = validation::required_text("title", &title, SHORT_TEXT)?;
        }
        if let Some(summary) = patch.summary {
            self.summary = validation::optional_text("summary", Some(&summary), 1000)?;
        }
        if let Some(body) = patch.body {
            self.body = validation::required_text("body", &body, LONG_TEXT)?;
        }
        if let Some(source_url) = patch.source_url {
            self.source_url = optional_url("source_url", Some(&source_url))?;
        }
        if let Some(published) = patch.published {
            self.set_published(published);
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.stamps.created_at
    }

    fn is_active(&self) -> bool {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AuthUser {
        AuthUser {
            id: "admin-1".into(),
            name: "Admin".into(),
            email: "admin@example.com".into(),
            role: Role::Admin,
        }
    }

    fn builder() -> AuthUser {
        AuthUser {
            id: "builder-1".into(),
            name: "Builder".into(),
            email: "builder@example.com".into(),
            role: Role::Builder,
        }
    }

    #[test]
    fn builders_own_the_developers_they_create() {
        let input = DeveloperInput {
            name: "Skyline Homes".into(),
            description: None,
            website: Some("https://skyline.example".into()),
            logo: None,
            owner_id: Some("someone-else".into()),
            active: true,
        };
        let developer = Developer::build(input, &builder()).expect("valid");
        assert_eq!(developer.owner_id.as_deref(), Some("builder-1"));
    }

    #[test]
    fn developer_rejects_relative_website() {
        let input = DeveloperInput {
            name: "Skyline".into(),
            description: None,
            website: Some("skyline.example".into()),
            logo: None,
            owner_id: None,
            active: true,
        };
        assert!(matches!(
            Developer::build(input, &admin()),
            Err(ValidationError::InvalidFormat { field: "website", .. })
        ));
    }

    #[test]
    fn region_codes_are_upper_cased() {
        let region = Region::build(
            RegionInput {
                name: "Maharashtra".into(),
                code: "mh".into(),
                active: true,
            },
            &admin(),
        )
        .expect("valid");
        assert_eq!(region.code, "MH");
        assert!(region_code("m").is_err());
    }

    #[test]
    fn publishing_news_stamps_once() {
        let mut news = News::build(
            NewsInput {
                title: "Rates cut".into(),
                summary: None,
                body: "The central bank cut rates.".into(),
                source_url: None,
                published: true,
            },
            &admin(),
        )
        .expect("valid");
        let first = news.published_at.expect("stamped");
        news.apply(NewsPatch {
            published: Some(false),
            ..NewsPatch::default()
        })
        .unwrap();
        news.apply(NewsPatch {
            published: Some(true),
            ..NewsPatch::default()
        })
        .unwrap();
        assert_eq!(news.published_at, Some(first));
    }

    #[test]
    fn duplicate_amenity_names_conflict() {
        let store = DocumentStore::in_memory();
        let pool = || FeatureInput {
            name: "Pool".into(),
            icon: None,
            active: true,
        };
        Amenity::persist_new(&store, Amenity::build(pool(), &admin()).unwrap()).unwrap();
        let err = Amenity::persist_new(&store, Amenity::build(pool(), &admin()).unwrap())
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn renaming_onto_an_existing_amenity_conflicts() {
        let store = DocumentStore::in_memory();
        let feature = |name: &str| FeatureInput {
            name: name.into(),
            icon: None,
            active: true,
        };
        Amenity::persist_new(&store, Amenity::build(feature("Pool"), &admin()).unwrap()).unwrap();
        let mut gym =
            Amenity::persist_new(&store, Amenity::build(feature("Gym"), &admin()).unwrap()).unwrap();

        gym.apply(FeaturePatch {
            icon: Some("dumbbell".into()),
            ..FeaturePatch::default()
        })
        .unwrap();
        let gym = Amenity::persist_update(&store, gym).expect("own name is not a conflict");

        let mut renamed = gym;
        renamed
            .apply(FeaturePatch {
                name: Some("POOL".into()),
                ..FeaturePatch::default()
            })
            .unwrap();
        let err = Amenity::persist_update(&store, renamed).expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    fn account(store: &DocumentStore, role: Role, active: bool) -> User {
        store
            .insert(User {
                id: new_id(),
                name: "Account".into(),
                email: format!("{}@example.com", new_id()),
                password_hash: "unused".into(),
                role,
                phone: None,
                active,
                favorites: Vec::new(),
                stamps: Timestamps::now(),
            })
            .unwrap()
    }

    #[test]
    fn developer_owner_must_be_an_active_builder() {
        let store = DocumentStore::in_memory();
        let builder_account = account(&store, Role::Builder, true);
        let agent_account = account(&store, Role::Agent, true);
        let retired_builder = account(&store, Role::Builder, false);
        let owned_by = |owner: &str| {
            Developer::build(
                DeveloperInput {
                    name: "Skyline".into(),
                    description: None,
                    website: None,
                    logo: None,
                    owner_id: Some(owner.into()),
                    active: true,
                },
                &admin(),
            )
            .unwrap()
        };

        assert!(owned_by(&builder_account.id).check_references(&store).is_ok());
        for owner in [agent_account.id.as_str(), retired_builder.id.as_str(), "missing"] {
            let err = owned_by(owner).check_references(&store).expect_err("bad owner");
            assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn seo_paths_must_be_site_paths() {
        assert!(site_path("/properties/villas").is_ok());
        assert!(site_path("properties").is_err());
        assert!(site_path("/has space").is_err());
    }
}
