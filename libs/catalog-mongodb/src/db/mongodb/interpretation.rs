//! Minimal interpretation adaptor
//!
//! Clinical analyses embed interpretation references; before an update
//! accepts one, the referenced record must exist. The [`UidExists`] seam
//! keeps the update builder testable without a live sibling collection.

use async_trait::async_trait;
use bson::doc;

use crate::db::mongodb::collection::CatalogCollection;
use crate::db::mongodb::query_utils::PRIVATE_UID;
use crate::error::Result;

/// Existence check for referenced sub-entities.
#[async_trait]
pub trait UidExists: Send + Sync {
    async fn exists(&self, uid: i64) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct InterpretationAdaptor {
    collection: CatalogCollection,
}

impl InterpretationAdaptor {
    pub fn new(collection: CatalogCollection) -> Self {
        InterpretationAdaptor { collection }
    }

    /// Insert a raw interpretation document (administrative seeding).
    pub async fn native_insert(&self, interpretation: bson::Document) -> Result<()> {
        self.collection.insert_one(interpretation).await
    }
}

#[async_trait]
impl UidExists for InterpretationAdaptor {
    async fn exists(&self, uid: i64) -> Result<bool> {
        Ok(self.collection.count(doc! { PRIVATE_UID: uid }).await? > 0)
    }
}
