//! Typed collection wrapper
//!
//! A thin layer over the driver's collection handle: every call logs the
//! filter it is about to run and maps driver errors into the engine's
//! error type. Adaptors talk to this wrapper, never to the driver
//! directly, so the error-mapping and logging rules hold everywhere.

use bson::Document;
use mongodb::options::{FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions};
use mongodb::{Collection, Cursor, IndexModel};

use crate::error::Result;
use crate::query::QueryOptions;
use crate::result::WriteResult;

#[derive(Debug, Clone)]
pub struct CatalogCollection {
    inner: Collection<Document>,
}

impl CatalogCollection {
    pub fn new(inner: Collection<Document>) -> Self {
        CatalogCollection { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        tracing::debug!(collection = self.name(), filter = %filter, "count");
        Ok(self.inner.count_documents(filter, None).await?)
    }

    pub async fn find(&self, filter: Document, options: FindOptions) -> Result<Cursor<Document>> {
        tracing::debug!(collection = self.name(), filter = %filter, "find");
        Ok(self.inner.find(filter, options).await?)
    }

    pub async fn find_one(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<Document>> {
        tracing::debug!(collection = self.name(), filter = %filter, "find_one");
        Ok(self.inner.find_one(filter, options).await?)
    }

    pub async fn insert_one(&self, document: Document) -> Result<()> {
        self.inner.insert_one(document, None).await?;
        Ok(())
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<WriteResult> {
        tracing::debug!(
            collection = self.name(),
            filter = %filter,
            update = %update,
            "update_one"
        );
        let result = self.inner.update_one(filter, update, None).await?;
        Ok(WriteResult {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<Document>> {
        Ok(self
            .inner
            .find_one_and_update(filter, update, options)
            .await?)
    }

    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Cursor<Document>> {
        tracing::debug!(collection = self.name(), stages = pipeline.len(), "aggregate");
        Ok(self.inner.aggregate(pipeline, None).await?)
    }

    pub async fn create_unique_index(&self, keys: Document) -> Result<()> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.inner.create_index(index, None).await?;
        Ok(())
    }
}

/// Map engine query options onto driver find options.
pub(crate) fn find_options(options: &QueryOptions) -> FindOptions {
    let mut projection = Document::new();
    for field in &options.include {
        projection.insert(field, 1);
    }
    if projection.is_empty() {
        for field in &options.exclude {
            projection.insert(field, 0);
        }
    }

    let mut sort = Document::new();
    for param in &options.sort {
        sort.insert(&param.field, if param.ascending { 1 } else { -1 });
    }

    FindOptions::builder()
        .projection((!projection.is_empty()).then_some(projection))
        .sort((!sort.is_empty()).then_some(sort))
        .limit(options.limit)
        .skip(options.skip)
        .build()
}
