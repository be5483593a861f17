//! Single-process document database.
//!
//! Every collection is a map of id -> JSON document behind one lock. Typed access goes
//! through [`Document`]; slug assignment and uniqueness checks run under the same write
//! lock as the insert, so concurrent writers cannot both claim a slug.

pub mod slug;
mod snapshot;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use snapshot::Snapshot;

pub(crate) type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// Creation and modification times carried by every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::now()
    }
}

/// Generates a fresh document identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A typed view over one collection.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn timestamps(&self) -> &Timestamps;
    fn timestamps_mut(&mut self) -> &mut Timestamps;
}

/// Documents addressed by a unique, name-derived slug.
pub trait Sluggable: Document {
    /// Used when the source text has no ASCII alphanumerics at all.
    const SLUG_STEM: &'static str;

    fn slug_source(&self) -> &str;
    fn slug(&self) -> &str;
    fn set_slug(&mut self, slug: String);
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} '{id}' not found")]
    NotFound { collection: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{collection} '{id}' was modified by another request")]
    Stale { collection: &'static str, id: String },
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub struct DocumentStore {
    collections: RwLock<Collections>,
    snapshot: Option<Snapshot>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(Collections::new()),
            snapshot: None,
        }
    }

    /// Opens (or creates on first write) a snapshot-backed store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let snapshot = Snapshot::new(path.as_ref());
        let collections = snapshot.load()?;
        let documents: usize = collections.values().map(BTreeMap::len).sum();
        info!(path = %snapshot.path().display(), documents, "document store loaded");
        Ok(Self {
            collections: RwLock::new(collections),
            snapshot: Some(snapshot),
        })
    }

    pub fn insert<D: Document>(&self, doc: D) -> Result<D, StoreError> {
        self.insert_unless(doc, |_| false)
    }

    /// Inserts `doc` unless an existing document in the collection matches `conflicts`.
    pub fn insert_unless<D, F>(&self, mut doc: D, conflicts: F) -> Result<D, StoreError>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        let mut guard = self.write()?;
        let docs = guard.entry(D::COLLECTION.to_string()).or_default();
        if docs.contains_key(doc.id()) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                D::COLLECTION,
                doc.id()
            )));
        }
        for value in docs.values() {
            let existing: D = serde_json::from_value(value.clone())?;
            if conflicts(&existing) {
                return Err(StoreError::Conflict(format!(
                    "{} conflicts with '{}'",
                    D::COLLECTION,
                    existing.id()
                )));
            }
        }

        *doc.timestamps_mut() = Timestamps::now();
        self.commit(&mut guard, &doc, None)?;
        debug!(collection = D::COLLECTION, id = doc.id(), "document inserted");
        Ok(doc)
    }

    /// Inserts `doc` with a slug derived from its source text, suffixed until unique.
    pub fn insert_with_slug<D: Sluggable>(&self, mut doc: D) -> Result<D, StoreError> {
        let mut guard = self.write()?;
        let existing = typed_docs::<D>(&guard)?;
        if existing.iter().any(|other| other.id() == doc.id()) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                D::COLLECTION,
                doc.id()
            )));
        }

        let slug = assign_slug(&doc, &existing, None);
        doc.set_slug(slug);
        *doc.timestamps_mut() = Timestamps::now();
        self.commit(&mut guard, &doc, None)?;
        debug!(collection = D::COLLECTION, id = doc.id(), slug = doc.slug(), "document inserted");
        Ok(doc)
    }

    pub fn get<D: Document>(&self, id: &str) -> Result<Option<D>, StoreError> {
        let guard = self.read()?;
        match guard.get(D::COLLECTION).and_then(|docs| docs.get(id)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get) but a missing document is an error.
    pub fn require<D: Document>(&self, id: &str) -> Result<D, StoreError> {
        self.get(id)?.ok_or_else(|| StoreError::NotFound {
            collection: D::COLLECTION,
            id: id.to_string(),
        })
    }

    pub fn exists<D: Document>(&self, id: &str) -> Result<bool, StoreError> {
        let guard = self.read()?;
        Ok(guard
            .get(D::COLLECTION)
            .is_some_and(|docs| docs.contains_key(id)))
    }

    pub fn all<D: Document>(&self) -> Result<Vec<D>, StoreError> {
        let guard = self.read()?;
        typed_docs(&guard)
    }

    pub fn find<D, F>(&self, predicate: F) -> Result<Vec<D>, StoreError>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        Ok(self.all::<D>()?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub fn find_one<D, F>(&self, predicate: F) -> Result<Option<D>, StoreError>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        Ok(self.all::<D>()?.into_iter().find(|doc| predicate(doc)))
    }

    pub fn find_by_slug<D: Sluggable>(&self, slug: &str) -> Result<Option<D>, StoreError> {
        self.find_one(|doc: &D| doc.slug() == slug)
    }

    /// Resolves an id first, then a slug.
    pub fn lookup<D: Sluggable>(&self, id_or_slug: &str) -> Result<Option<D>, StoreError> {
        match self.get::<D>(id_or_slug)? {
            Some(doc) => Ok(Some(doc)),
            None => self.find_by_slug(id_or_slug),
        }
    }

    pub fn count<D, F>(&self, predicate: F) -> Result<usize, StoreError>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        Ok(self.find(predicate)?.len())
    }

    /// Overwrites an existing document, refreshing `updated_at`.
    pub fn replace<D: Document>(&self, doc: D) -> Result<D, StoreError> {
        self.replace_unless(doc, |_| false)
    }

    /// Overwrites an existing document unless another document matches `conflicts`.
    pub fn replace_unless<D, F>(&self, mut doc: D, conflicts: F) -> Result<D, StoreError>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        let mut guard = self.write()?;
        let existing = typed_docs::<D>(&guard)?;
        let mut found = false;
        for other in &existing {
            if other.id() == doc.id() {
                ensure_fresh(other, &doc)?;
                found = true;
            } else if conflicts(other) {
                return Err(StoreError::Conflict(format!(
                    "{} conflicts with '{}'",
                    D::COLLECTION,
                    other.id()
                )));
            }
        }
        if !found {
            return Err(StoreError::NotFound {
                collection: D::COLLECTION,
                id: doc.id().to_string(),
            });
        }

        let previous = previous_value::<D>(&guard, doc.id());
        doc.timestamps_mut().touch();
        self.commit(&mut guard, &doc, previous)?;
        Ok(doc)
    }

    /// Overwrites an existing sluggable document. The slug is regenerated only when the
    /// slug source changed; the document's own slug never counts as a collision.
    pub fn replace_with_slug<D: Sluggable>(&self, mut doc: D) -> Result<D, StoreError> {
        let mut guard = self.write()?;
        let existing = typed_docs::<D>(&guard)?;
        let current = existing
            .iter()
            .find(|other| other.id() == doc.id())
            .ok_or_else(|| StoreError::NotFound {
                collection: D::COLLECTION,
                id: doc.id().to_string(),
            })?;
        ensure_fresh(current, &doc)?;

        if current.slug_source() == doc.slug_source() && !current.slug().is_empty() {
            doc.set_slug(current.slug().to_string());
        } else {
            let slug = assign_slug(&doc, &existing, Some(doc.id()));
            doc.set_slug(slug);
        }

        let previous = previous_value::<D>(&guard, doc.id());
        doc.timestamps_mut().touch();
        self.commit(&mut guard, &doc, previous)?;
        Ok(doc)
    }

    /// Applies `mutate` to the stored document under the write lock.
    pub fn update<D, F>(&self, id: &str, mutate: F) -> Result<D, StoreError>
    where
        D: Document,
        F: FnOnce(&mut D),
    {
        self.update_with(id, |doc: &mut D| {
            mutate(doc);
            Ok::<(), StoreError>(())
        })
    }

    /// Like [`update`](Self::update), but `mutate` may refuse the change; nothing is
    /// written when it returns an error. `mutate` runs under the write lock and must not
    /// call back into the store.
    pub fn update_with<D, E, F>(&self, id: &str, mutate: F) -> Result<D, E>
    where
        D: Document,
        E: From<StoreError>,
        F: FnOnce(&mut D) -> Result<(), E>,
    {
        let mut guard = self.write()?;
        let previous = previous_value::<D>(&guard, id).ok_or_else(|| StoreError::NotFound {
            collection: D::COLLECTION,
            id: id.to_string(),
        })?;
        let mut doc: D = serde_json::from_value(previous.clone()).map_err(StoreError::from)?;
        mutate(&mut doc)?;
        doc.timestamps_mut().touch();
        self.commit(&mut guard, &doc, Some(previous))?;
        Ok(doc)
    }

    pub fn delete<D: Document>(&self, id: &str) -> Result<D, StoreError> {
        let mut guard = self.write()?;
        let removed = guard
            .get_mut(D::COLLECTION)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: D::COLLECTION,
                id: id.to_string(),
            })?;

        if let Some(snapshot) = &self.snapshot {
            if let Err(err) = snapshot.write(&guard) {
                guard
                    .entry(D::COLLECTION.to_string())
                    .or_default()
                    .insert(id.to_string(), removed);
                return Err(err);
            }
        }

        debug!(collection = D::COLLECTION, id, "document deleted");
        Ok(serde_json::from_value(removed)?)
    }

    /// Stores `doc` and persists the snapshot, restoring `previous` if the write fails.
    fn commit<D: Document>(
        &self,
        guard: &mut RwLockWriteGuard<'_, Collections>,
        doc: &D,
        previous: Option<Value>,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        guard
            .entry(D::COLLECTION.to_string())
            .or_default()
            .insert(doc.id().to_string(), value);

        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        if let Err(err) = snapshot.write(&**guard) {
            let docs = guard.entry(D::COLLECTION.to_string()).or_default();
            match previous {
                Some(value) => {
                    docs.insert(doc.id().to_string(), value);
                }
                None => {
                    docs.remove(doc.id());
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

fn typed_docs<D: Document>(collections: &Collections) -> Result<Vec<D>, StoreError> {
    collections
        .get(D::COLLECTION)
        .map(|docs| {
            docs.values()
                .map(|value| serde_json::from_value(value.clone()).map_err(StoreError::from))
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

/// Whole-document writes must start from the stored version; a newer stored
/// `updated_at` means another write landed in between.
fn ensure_fresh<D: Document>(stored: &D, incoming: &D) -> Result<(), StoreError> {
    if stored.timestamps().updated_at != incoming.timestamps().updated_at {
        return Err(StoreError::Stale {
            collection: D::COLLECTION,
            id: incoming.id().to_string(),
        });
    }
    Ok(())
}

fn previous_value<D: Document>(collections: &Collections, id: &str) -> Option<Value> {
    collections
        .get(D::COLLECTION)
        .and_then(|docs| docs.get(id))
        .cloned()
}

fn assign_slug<D: Sluggable>(doc: &D, existing: &[D], skip_id: Option<&str>) -> String {
    let mut base = slug::slugify(doc.slug_source());
    if base.is_empty() {
        base = D::SLUG_STEM.to_string();
    }
    slug::unique_slug(&base, |candidate| {
        existing
            .iter()
            .any(|other| Some(other.id()) != skip_id && other.slug() == candidate)
    })
}
