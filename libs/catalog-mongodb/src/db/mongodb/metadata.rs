//! Catalog-wide id generation
//!
//! Internal uids are assigned from a single counter document in the
//! metadata collection. The `$inc` + return-after round trip is atomic on
//! the server, so concurrent inserts never observe the same value, and the
//! sequence is monotonically increasing across every entity type.

use bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

use crate::db::mongodb::collection::CatalogCollection;
use crate::error::{Error, Result};

const METADATA_ID: &str = "METADATA";
const UID_COUNTER: &str = "uidCounter";

#[derive(Debug, Clone)]
pub struct UidGenerator {
    collection: CatalogCollection,
}

impl UidGenerator {
    pub fn new(collection: CatalogCollection) -> Self {
        UidGenerator { collection }
    }

    /// Reserve and return the next uid. The counter document is created on
    /// first use.
    pub async fn next_uid(&self) -> Result<i64> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": METADATA_ID },
                doc! { "$inc": { UID_COUNTER: 1_i64 } },
                options,
            )
            .await?
            .ok_or_else(|| Error::Internal("uid counter upsert returned no document".into()))?;
        updated
            .get_i64(UID_COUNTER)
            .map_err(|_| Error::Internal("uid counter holds a non-integer value".into()))
    }
}
