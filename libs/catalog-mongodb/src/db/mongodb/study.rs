//! Minimal study adaptor
//!
//! The engine needs three things from studies: the raw study document (the
//! authorization filter is derived from its current groups and grants), an
//! existence check before inserting child entities, and a way to seed
//! study documents. The full study domain model lives elsewhere.

use bson::{doc, Document};

use crate::db::mongodb::collection::CatalogCollection;
use crate::db::mongodb::query_utils::PRIVATE_UID;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct StudyAdaptor {
    collection: CatalogCollection,
}

impl StudyAdaptor {
    pub fn new(collection: CatalogCollection) -> Self {
        StudyAdaptor { collection }
    }

    /// Fetch the raw study document. This is the per-call permission
    /// snapshot authorization works from; it is intentionally re-read on
    /// every call that needs it.
    pub async fn native_get(&self, study_uid: i64) -> Result<Document> {
        self.collection
            .find_one(doc! { PRIVATE_UID: study_uid }, None)
            .await?
            .ok_or_else(|| Error::not_found("Study", study_uid))
    }

    pub async fn exists(&self, study_uid: i64) -> Result<bool> {
        Ok(self.collection.count(doc! { PRIVATE_UID: study_uid }).await? > 0)
    }

    /// Fail unless the study exists.
    pub async fn check_uid(&self, study_uid: i64) -> Result<()> {
        if study_uid <= 0 {
            return Err(Error::Validation(format!(
                "study uid '{study_uid}' is not valid"
            )));
        }
        if !self.exists(study_uid).await? {
            return Err(Error::not_found("Study", study_uid));
        }
        Ok(())
    }

    /// Insert a raw study document (administrative seeding).
    pub async fn native_insert(&self, study: Document) -> Result<()> {
        self.collection.insert_one(study).await
    }
}
