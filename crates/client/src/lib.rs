//! In-memory datastore client over the docmap codec
//!
//! A thin facade that stores projected entity documents in a concurrent
//! map keyed by [`Key`], exercising the codec engine end to end: insert
//! projects through the entity mapper, lookup populates a fresh default
//! object, and queries evaluate [`Filter`] predicates against stored
//! fields.
//!
//! ## What this is not
//!
//! No network transport, no wire protocol, no transactions, no
//! validation, no bulk batching. Those belong to a real storage backend;
//! this client exists so the mapping layer can be driven and tested
//! without one.
//!
//! ## Thread safety
//!
//! `Datastore` is `Send + Sync`; all state lives in a `DashMap` plus an
//! atomic id allocator, so operations from multiple threads interleave
//! safely.

#![warn(missing_docs)]
#![warn(clippy::all)]

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tracing::debug;

use docmap_core::{mapper, EntityModel, Fields, Filter, Fk, Key};

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error types for the client facade
#[derive(Debug, Error)]
pub enum ClientError {
    /// Insert hit a key that is already stored
    #[error("entity already exists for {0}")]
    AlreadyExists(Key),

    /// Update or foreign-key resolution hit a key with nothing stored
    #[error("no entity found for {0}")]
    NotFound(Key),

    /// The entity type declares no key property, so it cannot be stored
    /// as a root entity
    #[error("type {0} declares no key property")]
    MissingKeyProperty(&'static str),

    /// A conversion failed while projecting or populating
    #[error(transparent)]
    Codec(#[from] docmap_core::Error),
}

/// Thin in-memory datastore client
///
/// Stores one document per [`Key`]; keys are built from each entity
/// type's kind and numeric key property, with ids allocated on first
/// insert and written back into the object.
pub struct Datastore {
    entities: DashMap<Key, Fields>,
    next_id: AtomicI64,
}

impl Datastore {
    /// Create an empty store
    pub fn new() -> Self {
        Datastore {
            entities: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored entities across all kinds
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn complete_key<T: EntityModel>(&self, obj: &mut T) -> Result<Key> {
        let m = mapper::<T>();
        let key = m
            .key_of(obj)
            .ok_or_else(|| ClientError::MissingKeyProperty(std::any::type_name::<T>()))?;
        if key.is_complete() {
            return Ok(key);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // generated ids are written back into the object
        m.assign_key(obj, id);
        Ok(Key::with_id(T::KIND, id))
    }

    /// Store a new entity, allocating an id if its key property is unset
    ///
    /// The allocated id is written back into `obj`. Fails if an entity is
    /// already stored under the resulting key.
    pub fn insert<T: EntityModel>(&self, obj: &mut T) -> Result<Key> {
        let key = self.complete_key(obj)?;
        let fields = mapper::<T>().project(Fields::new(), Some(obj))?;
        match self.entities.entry(key.clone()) {
            Entry::Occupied(_) => Err(ClientError::AlreadyExists(key)),
            Entry::Vacant(slot) => {
                slot.insert(fields);
                debug!(target: "docmap::client", key = %key, "inserted entity");
                Ok(key)
            }
        }
    }

    /// Store an entity, replacing any previous document under its key
    pub fn upsert<T: EntityModel>(&self, obj: &mut T) -> Result<Key> {
        let key = self.complete_key(obj)?;
        let fields = mapper::<T>().project(Fields::new(), Some(obj))?;
        self.entities.insert(key.clone(), fields);
        debug!(target: "docmap::client", key = %key, "upserted entity");
        Ok(key)
    }

    /// Replace the document of an already-stored entity
    ///
    /// Fails if the key property is unset or nothing is stored under it.
    pub fn update<T: EntityModel>(&self, obj: &T) -> Result<()> {
        let m = mapper::<T>();
        let key = m
            .key_of(obj)
            .ok_or_else(|| ClientError::MissingKeyProperty(std::any::type_name::<T>()))?;
        if !key.is_complete() {
            return Err(ClientError::NotFound(key));
        }
        let fields = m.project(Fields::new(), Some(obj))?;
        match self.entities.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(fields);
                debug!(target: "docmap::client", key = %key, "updated entity");
                Ok(())
            }
            Entry::Vacant(_) => Err(ClientError::NotFound(key)),
        }
    }

    /// Load the entity stored under `key` into a fresh default object
    ///
    /// `None` means nothing is stored under the key.
    pub fn lookup<T: EntityModel>(&self, key: &Key) -> Result<Option<T>> {
        match self.entities.get(key) {
            Some(entry) => {
                let obj = mapper::<T>().populate(T::default(), Some(entry.value()))?;
                Ok(Some(obj))
            }
            None => Ok(None),
        }
    }

    /// Delete the entity addressed by `obj`'s key property
    pub fn delete<T: EntityModel>(&self, obj: &T) -> Result<()> {
        let key = mapper::<T>()
            .key_of(obj)
            .ok_or_else(|| ClientError::MissingKeyProperty(std::any::type_name::<T>()))?;
        self.delete_key(&key)
    }

    /// Delete whatever is stored under `key`; deleting an absent key is
    /// not an error
    pub fn delete_key(&self, key: &Key) -> Result<()> {
        self.entities.remove(key);
        debug!(target: "docmap::client", key = %key, "deleted entity");
        Ok(())
    }

    /// Scan entities of kind `T::KIND`, returning those matching `filter`
    pub fn query<T: EntityModel>(&self, filter: &Filter) -> Result<Vec<T>> {
        let m = mapper::<T>();
        let mut results = Vec::new();
        for entry in self.entities.iter() {
            if entry.key().kind() != T::KIND {
                continue;
            }
            if filter.matches(entry.value()) {
                results.push(m.populate(T::default(), Some(entry.value()))?);
            }
        }
        debug!(
            target: "docmap::client",
            kind = T::KIND,
            matched = results.len(),
            "ran query"
        );
        Ok(results)
    }

    /// Load the entity a foreign key points at
    ///
    /// Falls back to the reference's cached value when the key was never
    /// allocated; `None` means the reference is empty or its target was
    /// deleted.
    pub fn resolve_fk<T: EntityModel + Clone>(&self, fk: &Fk<T>) -> Result<Option<T>> {
        match fk.key() {
            Some(key) if key.is_complete() => self.lookup(key),
            _ => Ok(fk.value().cloned()),
        }
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}
