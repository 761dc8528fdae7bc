//! Authorization-aware catalog query and update engine
//!
//! The storage core of the clinical catalog: it translates typed queries
//! into native MongoDB filters, enforces per-study/per-entity/per-user
//! visibility as part of every read, performs field-level partial updates
//! with set/add/remove semantics, and streams results through lazy typed
//! cursors.
//!
//! The public surface is the per-entity adaptor
//! ([`ClinicalAnalysisAdaptor`](db::mongodb::ClinicalAnalysisAdaptor)),
//! obtained from a [`CatalogMongoStore`]. Each operation comes in an
//! authorization-checked variant (takes the requesting principal, narrows
//! results to what they may see) and an unchecked variant for internal
//! callers.
//!
//! Invariants the engine keeps:
//! - unknown query keys fail translation; they are never dropped
//! - an authorization fragment, once computed, is always ANDed into the
//!   filter; count and get share the same fragment
//! - soft-deleted records are excluded unless the caller filters on the
//!   status name explicitly
//! - validation failures happen before any write; no partial updates

pub mod db;
pub mod error;
pub mod params;
pub mod query;
pub mod result;

pub use db::mongodb::{
    CatalogMongoStore, ClinicalAnalysisAdaptor, ClinicalAnalysisUpdateParams,
};
pub use error::{Error, Result};
pub use params::ParamType;
pub use query::{Query, QueryOptions, SortParam, UpdateAction};
pub use result::{CatalogResult, WriteResult};
