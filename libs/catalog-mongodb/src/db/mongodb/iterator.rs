//! Lazy entity iteration over native cursors
//!
//! [`CatalogCursor`] wraps a store cursor and converts raw documents into
//! typed entities one at a time, so large result sets never materialize in
//! memory unless the caller collects them. The cursor is forward-only,
//! owned by exactly one consumer, and the underlying native cursor is
//! released when the wrapper drops — on normal exhaustion, early break or
//! error alike.

use bson::Document;
use futures::TryStreamExt;
use mongodb::Cursor;

use crate::error::Result;
use crate::query::QueryOptions;

/// Conversion seam between stored documents and typed entities.
pub trait DocumentConverter: Send + Sync {
    type Entity;

    fn from_document(&self, document: Document) -> Result<Self::Entity>;
}

/// Pass-through converter for callers that want the raw documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConverter;

impl DocumentConverter for NativeConverter {
    type Entity = Document;

    fn from_document(&self, document: Document) -> Result<Document> {
        Ok(document)
    }
}

/// Forward-only typed cursor.
pub struct CatalogCursor<C: DocumentConverter> {
    cursor: Cursor<Document>,
    converter: C,
}

impl<C: DocumentConverter> CatalogCursor<C> {
    pub(crate) fn new(cursor: Cursor<Document>, converter: C) -> Self {
        CatalogCursor { cursor, converter }
    }

    /// Next entity, or `None` when exhausted. Store and conversion errors
    /// both surface here; neither is folded into end-of-stream.
    pub async fn try_next(&mut self) -> Result<Option<C::Entity>> {
        match self.cursor.try_next().await? {
            Some(document) => Ok(Some(self.converter.from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Drain the cursor into a vector.
    pub async fn collect_results(mut self) -> Result<Vec<C::Entity>> {
        let mut results = Vec::new();
        while let Some(entity) = self.try_next().await? {
            results.push(entity);
        }
        Ok(results)
    }
}

/// Rewrite projections that reach inside a nested sub-entity collection.
///
/// Including `interpretations.id` naively would strip the uid the cursor
/// needs to resolve the reference, and excluding inner fields would hand
/// back corrupted nested documents. Instead, inner includes widen to the
/// whole nested field and inner excludes are dropped; the caller trims
/// after conversion if it must.
pub fn remove_inner_projections(options: &QueryOptions, field: &str) -> QueryOptions {
    let prefix = format!("{field}.");
    let mut options = options.clone();

    if !options.include.is_empty() {
        let had_inner = options.include.iter().any(|p| p.starts_with(&prefix));
        options.include.retain(|p| !p.starts_with(&prefix));
        if had_inner && !options.include.iter().any(|p| p == field) {
            options.include.push(field.to_string());
        }
    }
    options.exclude.retain(|p| !p.starts_with(&prefix));
    options
}
